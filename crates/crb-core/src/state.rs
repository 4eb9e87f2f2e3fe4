//! Process-wide relay state: the identity map, the signature map, stats,
//! and the one-shot notification flags.
//!
//! All four structures live in one struct so the engine can guard them
//! with a single mutex — `reset` must appear atomic to every observer.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::{domain::MessageId, signature::ContentSignature};

/// Bounded ring of recent processed-message summaries.
pub const RECENT_CAPACITY: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Created,
    Edited,
    Failed,
}

#[derive(Clone, Debug)]
pub struct ActivityEntry {
    pub source: MessageId,
    pub target: Option<MessageId>,
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Stats {
    pub translated: u64,
    pub edited: u64,
    pub errors: u64,
    pub started_at: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
    recent: VecDeque<ActivityEntry>,
}

impl Stats {
    fn new() -> Self {
        Self {
            translated: 0,
            edited: 0,
            errors: 0,
            started_at: Utc::now(),
            last_activity: None,
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
        }
    }

    /// translated / (translated + edited + errors), as a percentage.
    /// Zero operations counts as 100%.
    pub fn success_rate(&self) -> f64 {
        let total = self.translated + self.edited + self.errors;
        if total == 0 {
            return 100.0;
        }
        self.translated as f64 / total as f64 * 100.0
    }

    fn record(&mut self, entry: ActivityEntry) {
        self.recent.push_back(entry);
        while self.recent.len() > RECENT_CAPACITY {
            self.recent.pop_front();
        }
    }
}

/// One-shot booleans. Once set they never re-fire, except through `reset`
/// when the reset scope includes them.
#[derive(Debug, Default)]
pub struct NotificationFlags {
    pub first_success_notified: bool,
}

/// Read-only view for the command surface.
#[derive(Clone, Debug)]
pub struct StatsSnapshot {
    pub translated: u64,
    pub edited: u64,
    pub errors: u64,
    pub relayed: usize,
    pub started_at: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
    pub success_rate: f64,
    pub recent: Vec<ActivityEntry>,
}

#[derive(Debug)]
pub struct RelayState {
    relayed: HashMap<MessageId, MessageId>,
    signatures: HashMap<MessageId, ContentSignature>,
    stats: Stats,
    flags: NotificationFlags,
}

impl RelayState {
    pub fn new() -> Self {
        Self {
            relayed: HashMap::new(),
            signatures: HashMap::new(),
            stats: Stats::new(),
            flags: NotificationFlags::default(),
        }
    }

    pub fn lookup(&self, source: MessageId) -> Option<MessageId> {
        self.relayed.get(&source).copied()
    }

    pub fn signature(&self, source: MessageId) -> Option<ContentSignature> {
        self.signatures.get(&source).copied()
    }

    pub fn relayed_count(&self) -> usize {
        self.relayed.len()
    }

    /// Record a successful first relay: identity and signature are written
    /// together so one is present iff the other is.
    ///
    /// Returns true when the caller should fire the first-success
    /// notification; the flag is claimed here, under the state lock, so it
    /// can be returned true at most once per epoch.
    pub fn record_created(
        &mut self,
        source: MessageId,
        target: MessageId,
        sig: ContentSignature,
    ) -> bool {
        self.relayed.insert(source, target);
        self.signatures.insert(source, sig);
        self.stats.translated += 1;
        let at = Utc::now();
        self.stats.last_activity = Some(at);
        self.stats.record(ActivityEntry {
            source,
            target: Some(target),
            kind: ActivityKind::Created,
            at,
        });

        if self.flags.first_success_notified {
            return false;
        }
        self.flags.first_success_notified = true;
        true
    }

    /// Record a successful in-place update of an already relayed message.
    pub fn record_edited(&mut self, source: MessageId, target: MessageId, sig: ContentSignature) {
        self.signatures.insert(source, sig);
        self.stats.edited += 1;
        let at = Utc::now();
        self.stats.last_activity = Some(at);
        self.stats.record(ActivityEntry {
            source,
            target: Some(target),
            kind: ActivityKind::Edited,
            at,
        });
    }

    /// Record a delivery failure. Identity and signature are deliberately
    /// left untouched: a failed create stays retryable as "new", a failed
    /// edit keeps the old signature so an identical retry is not dropped.
    pub fn record_failure(&mut self, source: MessageId, target: Option<MessageId>) {
        self.stats.errors += 1;
        self.stats.record(ActivityEntry {
            source,
            target,
            kind: ActivityKind::Failed,
            at: Utc::now(),
        });
    }

    /// Clear both maps and the counters as one unit of work. The caller
    /// holds the state mutex, so no observer can see a partial reset.
    pub fn reset(&mut self, rearm_notify: bool) {
        self.relayed.clear();
        self.signatures.clear();
        self.stats = Stats::new();
        if rearm_notify {
            self.flags = NotificationFlags::default();
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            translated: self.stats.translated,
            edited: self.stats.edited,
            errors: self.stats.errors,
            relayed: self.relayed.len(),
            started_at: self.stats.started_at,
            last_activity: self.stats.last_activity,
            success_rate: self.stats.success_rate(),
            recent: self.stats.recent.iter().cloned().collect(),
        }
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(text: &str) -> ContentSignature {
        ContentSignature::of(Some(text), None)
    }

    #[test]
    fn created_writes_identity_and_signature_together() {
        let mut st = RelayState::new();
        assert!(st.lookup(MessageId(1)).is_none());
        assert!(st.signature(MessageId(1)).is_none());

        st.record_created(MessageId(1), MessageId(100), sig("a"));
        assert_eq!(st.lookup(MessageId(1)), Some(MessageId(100)));
        assert_eq!(st.signature(MessageId(1)), Some(sig("a")));
        assert_eq!(st.relayed_count(), 1);
    }

    #[test]
    fn first_success_claimed_once() {
        let mut st = RelayState::new();
        assert!(st.record_created(MessageId(1), MessageId(100), sig("a")));
        assert!(!st.record_created(MessageId(2), MessageId(101), sig("b")));
        assert!(!st.record_created(MessageId(3), MessageId(102), sig("c")));
    }

    #[test]
    fn failure_leaves_maps_untouched() {
        let mut st = RelayState::new();
        st.record_failure(MessageId(7), None);
        assert_eq!(st.relayed_count(), 0);
        assert!(st.signature(MessageId(7)).is_none());

        let snap = st.snapshot();
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.translated, 0);
    }

    #[test]
    fn recent_ring_evicts_oldest() {
        let mut st = RelayState::new();
        for i in 0..15 {
            st.record_created(MessageId(i), MessageId(1000 + i), sig(&i.to_string()));
        }
        let snap = st.snapshot();
        assert_eq!(snap.recent.len(), RECENT_CAPACITY);
        assert_eq!(snap.recent.first().unwrap().source, MessageId(5));
        assert_eq!(snap.recent.last().unwrap().source, MessageId(14));
    }

    #[test]
    fn success_rate_conventions() {
        let mut st = RelayState::new();
        assert_eq!(st.snapshot().success_rate, 100.0);

        st.record_created(MessageId(1), MessageId(100), sig("a"));
        st.record_failure(MessageId(2), None);
        assert_eq!(st.snapshot().success_rate, 50.0);
    }

    #[test]
    fn reset_clears_everything_at_once() {
        let mut st = RelayState::new();
        st.record_created(MessageId(1), MessageId(100), sig("a"));
        st.record_edited(MessageId(1), MessageId(100), sig("b"));
        st.record_failure(MessageId(2), None);

        st.reset(true);
        let snap = st.snapshot();
        assert_eq!(snap.translated, 0);
        assert_eq!(snap.edited, 0);
        assert_eq!(snap.errors, 0);
        assert_eq!(snap.relayed, 0);
        assert!(snap.recent.is_empty());
        assert!(st.lookup(MessageId(1)).is_none());
        assert!(st.signature(MessageId(1)).is_none());
    }

    #[test]
    fn reset_notify_scope_is_configurable() {
        let mut st = RelayState::new();
        assert!(st.record_created(MessageId(1), MessageId(100), sig("a")));

        st.reset(false);
        assert!(!st.record_created(MessageId(2), MessageId(101), sig("b")));

        st.reset(true);
        assert!(st.record_created(MessageId(3), MessageId(102), sig("c")));
    }
}
