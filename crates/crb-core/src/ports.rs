use async_trait::async_trait;

use crate::{
    domain::{ChatId, MediaRef, MessageId, MessageRef},
    Result,
};

/// Messaging-platform port.
///
/// Telegram is the first implementation; the shape is kept narrow enough
/// that another channel-capable messenger could fit behind it.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId>;

    async fn send_media(
        &self,
        chat: ChatId,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<MessageId>;

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()>;

    async fn edit_caption(&self, msg: MessageRef, caption: Option<&str>) -> Result<()>;

    /// Verbatim copy of a message into another chat, with an optional
    /// caption override for captionable content kinds.
    async fn copy_message(
        &self,
        from: MessageRef,
        to: ChatId,
        caption: Option<&str>,
    ) -> Result<MessageId>;
}

/// Translation backend port. A black-box `text -> text` function.
#[async_trait]
pub trait TranslatorPort: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}
