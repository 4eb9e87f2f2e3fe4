use std::sync::Arc;

use chrono::Utc;
use teloxide::{prelude::*, types::ParseMode};

use crate::router::AppState;

use super::commands::{stats_text, status_text};

/// Inline keyboard buttons from the /start menu.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };

    let snap = state.engine.snapshot().await;
    let text = match data {
        "stats" => stats_text(&snap, Utc::now()),
        "status" => status_text(&state.cfg, &snap, Utc::now()),
        _ => return Ok(()),
    };

    bot.send_message(message.chat.id, text)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}
