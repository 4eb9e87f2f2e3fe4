//! Telegram adapter (teloxide).
//!
//! This crate implements the `crb-core` ChannelPort over the Telegram Bot
//! API and hosts the dispatcher plus the command/menu surface.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use crb_core::{
    domain::{ChatId, MediaRef, MessageId, MessageRef},
    errors::Error,
    ports::ChannelPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl ChannelPort for TelegramChannel {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat), text.to_string()))
            .await?;
        Ok(MessageId(msg.id.0))
    }

    async fn send_media(
        &self,
        chat: ChatId,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<MessageId> {
        let tg_chat = Self::tg_chat(chat);
        let msg = match media {
            MediaRef::Photo(file_id) => {
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_photo(tg_chat, InputFile::file_id(file_id.clone()));
                    if let Some(c) = caption {
                        req = req.caption(c.to_string());
                    }
                    req
                })
                .await?
            }
            MediaRef::Video(file_id) => {
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_video(tg_chat, InputFile::file_id(file_id.clone()));
                    if let Some(c) = caption {
                        req = req.caption(c.to_string());
                    }
                    req
                })
                .await?
            }
            MediaRef::Document(file_id) => {
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_document(tg_chat, InputFile::file_id(file_id.clone()));
                    if let Some(c) = caption {
                        req = req.caption(c.to_string());
                    }
                    req
                })
                .await?
            }
            MediaRef::Other => {
                return Err(Error::Transport(
                    "content kind has no direct send, use copy_message".to_string(),
                ))
            }
        };
        Ok(MessageId(msg.id.0))
    }

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot.edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                text.to_string(),
            )
        })
        .await?;
        Ok(())
    }

    async fn edit_caption(&self, msg: MessageRef, caption: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self
                .bot
                .edit_message_caption(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id));
            if let Some(c) = caption {
                req = req.caption(c.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn copy_message(
        &self,
        from: MessageRef,
        to: ChatId,
        caption: Option<&str>,
    ) -> Result<MessageId> {
        let id = self
            .with_retry(|| {
                let mut req = self.bot.copy_message(
                    Self::tg_chat(to),
                    Self::tg_chat(from.chat_id),
                    Self::tg_msg_id(from.message_id),
                );
                if let Some(c) = caption {
                    req = req.caption(c.to_string());
                }
                req
            })
            .await?;
        Ok(MessageId(id.0))
    }
}
