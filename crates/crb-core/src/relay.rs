//! The relay engine: receives new/edited channel posts, orchestrates the
//! formatter, signature engine, and identity map, and issues create/update
//! operations against the target channel.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use crate::{
    config::Config,
    domain::{ChatId, MediaRef, MessageId, MessageRef, SourcePost},
    format::Formatter,
    notify::Notifier,
    ports::{ChannelPort, TranslatorPort},
    signature::ContentSignature,
    state::{RelayState, StatsSnapshot},
};

/// Placeholder body for the degenerate case of a text post whose
/// translated payload came out absent.
const EMPTY_BODY: &str = "...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A new message was created in the target channel.
    Created(MessageId),
    /// The existing target message was updated in place.
    Updated(MessageId),
    /// The event carried content identical to what was last relayed.
    Unchanged,
    /// The post had nothing to relay (service message).
    Ignored,
    /// The create/update call failed; counted, never retried here.
    Failed,
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub target_channel: ChatId,
    pub admin_chat: ChatId,
    pub target_language: String,
    pub reset_rearms_notify: bool,
}

impl From<&Config> for RelayConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            target_channel: cfg.target_channel,
            admin_chat: cfg.admin_chat,
            target_language: cfg.target_language.clone(),
            reset_rearms_notify: cfg.reset_rearms_notify,
        }
    }
}

/// Per-source-id locks: new/edited events for the same id are serialized
/// so they cannot both observe "not yet relayed" and create two copies.
#[derive(Default)]
struct IdLocks {
    inner: Mutex<HashMap<i32, Arc<Mutex<()>>>>,
}

impl IdLocks {
    async fn lock_id(&self, id: MessageId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(id.0)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct RelayEngine {
    cfg: RelayConfig,
    channel: Arc<dyn ChannelPort>,
    formatter: Formatter,
    notifier: Notifier,
    state: Mutex<RelayState>,
    locks: IdLocks,
}

impl RelayEngine {
    pub fn new(
        cfg: RelayConfig,
        channel: Arc<dyn ChannelPort>,
        translator: Arc<dyn TranslatorPort>,
    ) -> Self {
        let formatter = Formatter::new(translator, cfg.target_language.clone());
        let notifier = Notifier::new(channel.clone(), cfg.admin_chat);
        Self {
            cfg,
            channel,
            formatter,
            notifier,
            state: Mutex::new(RelayState::new()),
            locks: IdLocks::default(),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Transition for a "new post" event.
    pub async fn handle_new_post(&self, post: &SourcePost) -> RelayOutcome {
        if post.is_empty() {
            debug!(source = post.id.0, "ignoring post with no content");
            return RelayOutcome::Ignored;
        }
        let _guard = self.locks.lock_id(post.id).await;

        // The edit path is the authority for ids already relayed: a
        // redelivered "new" event must not create a second target message.
        let existing = { self.state.lock().await.lookup(post.id) };
        match existing {
            Some(target) => self.apply_edit(post, target).await,
            None => self.relay_new(post).await,
        }
    }

    /// Transition for an "edited post" event. Unknown ids degrade to the
    /// new-post transition: there is no target counterpart to update.
    pub async fn handle_edited_post(&self, post: &SourcePost) -> RelayOutcome {
        if post.is_empty() {
            debug!(source = post.id.0, "ignoring edit with no content");
            return RelayOutcome::Ignored;
        }
        let _guard = self.locks.lock_id(post.id).await;

        let existing = { self.state.lock().await.lookup(post.id) };
        match existing {
            Some(target) => self.apply_edit(post, target).await,
            None => {
                info!(source = post.id.0, "edit for unknown message, relaying as new");
                self.relay_new(post).await
            }
        }
    }

    async fn relay_new(&self, post: &SourcePost) -> RelayOutcome {
        let translated = self.translate_body(post).await;

        let sent = match &post.media {
            None => {
                let body = translated.as_deref().unwrap_or(EMPTY_BODY);
                self.channel.send_text(self.cfg.target_channel, body).await
            }
            Some(MediaRef::Other) => {
                // Copy carries the translated caption, so no patch step.
                self.channel
                    .copy_message(post.source_ref(), self.cfg.target_channel, translated.as_deref())
                    .await
            }
            Some(media) => {
                self.channel
                    .send_media(self.cfg.target_channel, media, translated.as_deref())
                    .await
            }
        };

        match sent {
            Ok(target) => {
                let sig = ContentSignature::of(post.text.as_deref(), post.caption.as_deref());
                let notify = {
                    let mut st = self.state.lock().await;
                    st.record_created(post.id, target, sig)
                };
                info!(source = post.id.0, target = target.0, "relayed new post");
                if notify {
                    self.notifier.first_success(post.id, target).await;
                }
                RelayOutcome::Created(target)
            }
            Err(e) => {
                error!(source = post.id.0, "relay failed: {e}");
                self.state.lock().await.record_failure(post.id, None);
                RelayOutcome::Failed
            }
        }
    }

    async fn apply_edit(&self, post: &SourcePost, target: MessageId) -> RelayOutcome {
        let sig = ContentSignature::of(post.text.as_deref(), post.caption.as_deref());
        let unchanged = { self.state.lock().await.signature(post.id) == Some(sig) };
        if unchanged {
            debug!(source = post.id.0, "edit carries unchanged content, skipping");
            return RelayOutcome::Unchanged;
        }

        let translated = self.translate_body(post).await;
        let target_ref = MessageRef {
            chat_id: self.cfg.target_channel,
            message_id: target,
        };
        let result = if post.text.is_some() {
            let body = translated.as_deref().unwrap_or(EMPTY_BODY);
            self.channel.edit_text(target_ref, body).await
        } else {
            self.channel.edit_caption(target_ref, translated.as_deref()).await
        };

        match result {
            Ok(()) => {
                self.state.lock().await.record_edited(post.id, target, sig);
                info!(source = post.id.0, target = target.0, "updated relayed post");
                RelayOutcome::Updated(target)
            }
            Err(e) => {
                // Stored signature stays as-is so an identical retry of
                // this edit is not silently dropped.
                error!(source = post.id.0, target = target.0, "edit failed: {e}");
                self.state.lock().await.record_failure(post.id, Some(target));
                RelayOutcome::Failed
            }
        }
    }

    async fn translate_body(&self, post: &SourcePost) -> Option<String> {
        match post.body() {
            Some(body) => Some(self.formatter.format(body).await),
            None => None,
        }
    }

    /// Clears the identity map, signature map, and stats as one atomic
    /// unit of work; notification flags per configuration.
    pub async fn reset(&self) {
        self.state.lock().await.reset(self.cfg.reset_rearms_notify);
        info!("relay state reset");
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        self.state.lock().await.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicI32, Ordering},
        Mutex as StdMutex,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Result};

    const SOURCE: ChatId = ChatId(-100_111);
    const TARGET: ChatId = ChatId(-100_222);
    const ADMIN: ChatId = ChatId(99);

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Op {
        SendText { chat: i64, text: String },
        SendMedia { chat: i64, caption: Option<String> },
        EditText { chat: i64, target: i32, text: String },
        EditCaption { chat: i64, target: i32, caption: Option<String> },
        Copy { to: i64, caption: Option<String> },
    }

    struct FakeChannel {
        next_id: AtomicI32,
        ops: StdMutex<Vec<Op>>,
        fail_sends: AtomicBool,
        fail_edits: AtomicBool,
    }

    impl FakeChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicI32::new(1000),
                ops: StdMutex::new(Vec::new()),
                fail_sends: AtomicBool::new(false),
                fail_edits: AtomicBool::new(false),
            })
        }

        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }

        fn sends_to(&self, chat: ChatId) -> usize {
            self.ops()
                .iter()
                .filter(|op| matches!(op, Op::SendText { chat: c, .. } if *c == chat.0))
                .count()
        }

        fn push(&self, op: Op) {
            self.ops.lock().unwrap().push(op);
        }

        fn alloc(&self) -> MessageId {
            MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[async_trait]
    impl ChannelPort for FakeChannel {
        async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(Error::Transport("send refused".to_string()));
            }
            self.push(Op::SendText {
                chat: chat.0,
                text: text.to_string(),
            });
            Ok(self.alloc())
        }

        async fn send_media(
            &self,
            chat: ChatId,
            _media: &MediaRef,
            caption: Option<&str>,
        ) -> Result<MessageId> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(Error::Transport("send refused".to_string()));
            }
            self.push(Op::SendMedia {
                chat: chat.0,
                caption: caption.map(str::to_string),
            });
            Ok(self.alloc())
        }

        async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
            if self.fail_edits.load(Ordering::SeqCst) {
                return Err(Error::Transport("edit refused".to_string()));
            }
            self.push(Op::EditText {
                chat: msg.chat_id.0,
                target: msg.message_id.0,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn edit_caption(&self, msg: MessageRef, caption: Option<&str>) -> Result<()> {
            if self.fail_edits.load(Ordering::SeqCst) {
                return Err(Error::Transport("edit refused".to_string()));
            }
            self.push(Op::EditCaption {
                chat: msg.chat_id.0,
                target: msg.message_id.0,
                caption: caption.map(str::to_string),
            });
            Ok(())
        }

        async fn copy_message(
            &self,
            _from: MessageRef,
            to: ChatId,
            caption: Option<&str>,
        ) -> Result<MessageId> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(Error::Transport("copy refused".to_string()));
            }
            self.push(Op::Copy {
                to: to.0,
                caption: caption.map(str::to_string),
            });
            Ok(self.alloc())
        }
    }

    /// Translates by wrapping in brackets so tests can tell translated
    /// payloads from raw ones.
    struct BracketTranslator;

    #[async_trait]
    impl TranslatorPort for BracketTranslator {
        async fn translate(&self, text: &str, _target_lang: &str) -> Result<String> {
            Ok(format!("[{text}]"))
        }
    }

    fn engine(chan: Arc<FakeChannel>, rearm: bool) -> RelayEngine {
        RelayEngine::new(
            RelayConfig {
                target_channel: TARGET,
                admin_chat: ADMIN,
                target_language: "fr".to_string(),
                reset_rearms_notify: rearm,
            },
            chan,
            Arc::new(BracketTranslator),
        )
    }

    fn text_post(id: i32, text: &str) -> SourcePost {
        SourcePost {
            id: MessageId(id),
            chat: SOURCE,
            text: Some(text.to_string()),
            caption: None,
            media: None,
        }
    }

    fn media_post(id: i32, caption: Option<&str>, media: MediaRef) -> SourcePost {
        SourcePost {
            id: MessageId(id),
            chat: SOURCE,
            text: None,
            caption: caption.map(str::to_string),
            media: Some(media),
        }
    }

    #[tokio::test]
    async fn new_text_post_is_relayed_and_mapped() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let out = eng.handle_new_post(&text_post(42, "hello")).await;
        assert_eq!(out, RelayOutcome::Created(MessageId(1000)));

        let snap = eng.snapshot().await;
        assert_eq!(snap.translated, 1);
        assert_eq!(snap.relayed, 1);
        assert!(snap.last_activity.is_some());
        assert_eq!(
            chan.ops()[0],
            Op::SendText {
                chat: TARGET.0,
                text: "[hello]".to_string()
            }
        );
    }

    #[tokio::test]
    async fn redelivered_new_post_does_not_duplicate() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let post = text_post(42, "hello");
        assert_eq!(
            eng.handle_new_post(&post).await,
            RelayOutcome::Created(MessageId(1000))
        );
        assert_eq!(eng.handle_new_post(&post).await, RelayOutcome::Unchanged);

        // One relay send; everything else was the admin notification.
        assert_eq!(chan.sends_to(TARGET), 1);
        assert_eq!(eng.snapshot().await.translated, 1);
    }

    #[tokio::test]
    async fn noop_edit_makes_no_calls_and_changes_no_counters() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let post = text_post(42, "hello");
        eng.handle_new_post(&post).await;
        let before = chan.ops().len();

        assert_eq!(eng.handle_edited_post(&post).await, RelayOutcome::Unchanged);
        assert_eq!(chan.ops().len(), before);

        let snap = eng.snapshot().await;
        assert_eq!((snap.translated, snap.edited, snap.errors), (1, 0, 0));
    }

    #[tokio::test]
    async fn real_edit_updates_existing_target_in_place() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        eng.handle_new_post(&text_post(42, "hello")).await;
        let out = eng.handle_edited_post(&text_post(42, "changed")).await;
        assert_eq!(out, RelayOutcome::Updated(MessageId(1000)));

        assert!(chan.ops().contains(&Op::EditText {
            chat: TARGET.0,
            target: 1000,
            text: "[changed]".to_string()
        }));

        let snap = eng.snapshot().await;
        assert_eq!(snap.edited, 1);
        assert_eq!(snap.relayed, 1);

        // The same edit redelivered is now a no-op.
        assert_eq!(
            eng.handle_edited_post(&text_post(42, "changed")).await,
            RelayOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn edit_for_unknown_id_relays_as_new() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let out = eng.handle_edited_post(&text_post(7, "fresh")).await;
        assert_eq!(out, RelayOutcome::Created(MessageId(1000)));
        assert_eq!(eng.snapshot().await.relayed, 1);
    }

    #[tokio::test]
    async fn failed_create_leaves_id_retryable() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        chan.fail_sends.store(true, Ordering::SeqCst);
        assert_eq!(
            eng.handle_new_post(&text_post(42, "hello")).await,
            RelayOutcome::Failed
        );
        let snap = eng.snapshot().await;
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.relayed, 0);

        // Redelivery after the outage succeeds as a first-time relay.
        chan.fail_sends.store(false, Ordering::SeqCst);
        assert!(matches!(
            eng.handle_new_post(&text_post(42, "hello")).await,
            RelayOutcome::Created(_)
        ));
    }

    #[tokio::test]
    async fn failed_edit_keeps_old_signature_for_retry() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        eng.handle_new_post(&text_post(42, "hello")).await;

        chan.fail_edits.store(true, Ordering::SeqCst);
        assert_eq!(
            eng.handle_edited_post(&text_post(42, "changed")).await,
            RelayOutcome::Failed
        );
        assert_eq!(eng.snapshot().await.errors, 1);

        // The retry of the identical edit is not treated as a no-op.
        chan.fail_edits.store(false, Ordering::SeqCst);
        assert_eq!(
            eng.handle_edited_post(&text_post(42, "changed")).await,
            RelayOutcome::Updated(MessageId(1000))
        );
    }

    #[tokio::test]
    async fn media_relays_caption_through_formatter() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let post = media_post(5, Some("cap"), MediaRef::Photo("file-1".to_string()));
        eng.handle_new_post(&post).await;
        assert_eq!(
            chan.ops()[0],
            Op::SendMedia {
                chat: TARGET.0,
                caption: Some("[cap]".to_string())
            }
        );

        // Caption edits go through the caption path, same target id.
        let edited = media_post(5, Some("cap2"), MediaRef::Photo("file-1".to_string()));
        assert_eq!(
            eng.handle_edited_post(&edited).await,
            RelayOutcome::Updated(MessageId(1000))
        );
        assert!(chan.ops().contains(&Op::EditCaption {
            chat: TARGET.0,
            target: 1000,
            caption: Some("[cap2]".to_string())
        }));
    }

    #[tokio::test]
    async fn media_without_caption_still_relays() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let post = media_post(5, None, MediaRef::Video("file-2".to_string()));
        assert!(matches!(
            eng.handle_new_post(&post).await,
            RelayOutcome::Created(_)
        ));
        assert_eq!(
            chan.ops()[0],
            Op::SendMedia {
                chat: TARGET.0,
                caption: None
            }
        );
    }

    #[tokio::test]
    async fn unsupported_kind_is_copied_with_translated_caption() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let post = media_post(6, Some("cap"), MediaRef::Other);
        eng.handle_new_post(&post).await;
        assert_eq!(
            chan.ops()[0],
            Op::Copy {
                to: TARGET.0,
                caption: Some("[cap]".to_string())
            }
        );
    }

    #[tokio::test]
    async fn post_with_no_content_is_ignored() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        let post = SourcePost {
            id: MessageId(9),
            chat: SOURCE,
            text: None,
            caption: None,
            media: None,
        };
        assert_eq!(eng.handle_new_post(&post).await, RelayOutcome::Ignored);
        assert_eq!(eng.handle_edited_post(&post).await, RelayOutcome::Ignored);
        assert!(chan.ops().is_empty());

        let snap = eng.snapshot().await;
        assert_eq!((snap.translated, snap.edited, snap.errors), (0, 0, 0));
    }

    #[tokio::test]
    async fn first_success_notification_fires_exactly_once() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        eng.handle_new_post(&text_post(1, "a")).await;
        eng.handle_new_post(&text_post(2, "b")).await;
        eng.handle_edited_post(&text_post(1, "a2")).await;

        assert_eq!(chan.sends_to(ADMIN), 1);
    }

    #[tokio::test]
    async fn reset_rearms_notification_when_configured() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        eng.handle_new_post(&text_post(1, "a")).await;
        eng.reset().await;
        eng.handle_new_post(&text_post(2, "b")).await;

        assert_eq!(chan.sends_to(ADMIN), 2);
    }

    #[tokio::test]
    async fn reset_keeps_notification_armed_off_when_configured() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), false);

        eng.handle_new_post(&text_post(1, "a")).await;
        eng.reset().await;
        eng.handle_new_post(&text_post(2, "b")).await;

        assert_eq!(chan.sends_to(ADMIN), 1);
    }

    #[tokio::test]
    async fn reset_clears_maps_and_counters_together() {
        let chan = FakeChannel::new();
        let eng = engine(chan.clone(), true);

        eng.handle_new_post(&text_post(1, "a")).await;
        eng.handle_edited_post(&text_post(1, "a2")).await;
        eng.reset().await;

        let snap = eng.snapshot().await;
        assert_eq!((snap.translated, snap.edited, snap.errors), (0, 0, 0));
        assert_eq!(snap.relayed, 0);
        assert!(snap.recent.is_empty());

        // A post relayed before the reset is treated as brand new again.
        assert!(matches!(
            eng.handle_new_post(&text_post(1, "a")).await,
            RelayOutcome::Created(_)
        ));
    }
}
