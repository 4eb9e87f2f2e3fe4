use std::sync::Arc;

use tracing::error;

use crate::{
    domain::{ChatId, MessageId},
    ports::ChannelPort,
};

/// Administrative notifications, sent as direct messages to the admin
/// chat. All sends are best-effort: a failed notification is logged and
/// never affects relay state or counters.
pub struct Notifier {
    channel: Arc<dyn ChannelPort>,
    admin: ChatId,
}

impl Notifier {
    pub fn new(channel: Arc<dyn ChannelPort>, admin: ChatId) -> Self {
        Self { channel, admin }
    }

    /// One-time "the pipeline works end to end" message. The caller owns
    /// the one-shot guarantee; this just renders and sends.
    pub async fn first_success(&self, source: MessageId, target: MessageId) {
        let text = format!(
            "🎉 First relay succeeded!\n\n\
             Source: {}\n\
             Target: {}\n\n\
             The bot is fully operational ✅",
            source.0, target.0
        );
        if let Err(e) = self.channel.send_text(self.admin, &text).await {
            error!("first-success notification failed: {e}");
        }
    }

    pub async fn startup(&self, username: &str, source: ChatId, target: ChatId) {
        let text = format!(
            "🚀 Bot started!\n\n\
             @{username} is online\n\
             Source: {}\n\
             Target: {}\n\n\
             Send /start for the command menu",
            source.0, target.0
        );
        if let Err(e) = self.channel.send_text(self.admin, &text).await {
            error!("startup notification failed: {e}");
        }
    }
}
