//! Telegram update handlers.
//!
//! Channel posts feed the relay engine; direct messages carry the
//! command/menu surface; callbacks serve the inline keyboard buttons.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use crate::router::AppState;

mod callback;
mod commands;
mod relay;

pub async fn handle_channel_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    relay::handle_channel_post(msg, state).await
}

pub async fn handle_edited_channel_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    relay::handle_edited_channel_post(msg, state).await
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg, state).await;
        }
    }
    Ok(())
}
