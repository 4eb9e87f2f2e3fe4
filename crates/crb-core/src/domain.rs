/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, unique per chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Media payload carried by a source post.
///
/// Photo/Video/Document hold the Telegram file id so the relay can re-send
/// without downloading. `Other` covers everything the relay cannot re-send
/// directly (stickers, audio, polls, ...) and is relayed via message copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaRef {
    Photo(String),
    Video(String),
    Document(String),
    Other,
}

/// A post observed in the source channel.
///
/// Arrives once as "new" and zero or more times as "edited" under the same
/// id. Telegram-specific extraction lives in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct SourcePost {
    pub id: MessageId,
    pub chat: ChatId,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub media: Option<MediaRef>,
}

impl SourcePost {
    /// The translatable body: text for plain messages, caption for media.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// Posts with no text, no caption, and no media (service messages)
    /// are not relayed at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.caption.is_none() && self.media.is_none()
    }

    pub fn source_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat,
            message_id: self.id,
        }
    }
}
