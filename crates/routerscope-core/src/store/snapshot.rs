// ── Snapshot store ──
//
// Current snapshot plus a bounded history of prior ones. Empty until the
// first successful cycle publishes.

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::model::MetricsSnapshot;
use crate::stream::SnapshotStream;

#[derive(Debug, Default)]
struct StoreState {
    current: Option<Arc<MetricsSnapshot>>,
    /// Oldest first.
    history: VecDeque<Arc<MetricsSnapshot>>,
}

/// Holds what consumers read. Lock-free reads via `ArcSwap`; change
/// notification via a `watch` channel.
pub struct SnapshotStore {
    state: ArcSwap<StoreState>,
    history_size: usize,
    notify: watch::Sender<Option<Arc<MetricsSnapshot>>>,
}

impl SnapshotStore {
    pub fn new(history_size: usize) -> Self {
        let (notify, _) = watch::channel(None);
        Self {
            state: ArcSwap::from_pointee(StoreState::default()),
            history_size,
            notify,
        }
    }

    /// Replace the current snapshot. The previous one moves into history,
    /// evicting the oldest entry beyond `history_size`.
    pub fn publish(&self, snapshot: MetricsSnapshot) -> Arc<MetricsSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.state.rcu(|old| {
            let mut history = old.history.clone();
            if let Some(ref prev) = old.current {
                history.push_back(Arc::clone(prev));
            }
            while history.len() > self.history_size {
                history.pop_front();
            }
            StoreState {
                current: Some(Arc::clone(&snapshot)),
                history,
            }
        });
        self.notify.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Flag the current snapshot as stale, keeping its values. History is
    /// untouched. Returns `false` when there is nothing to flag (no
    /// snapshot yet, or already stale).
    pub fn mark_stale(&self) -> bool {
        let mut flagged = None;
        self.state.rcu(|old| match old.current {
            Some(ref current) if !current.stale => {
                let stale = Arc::new(current.to_stale());
                flagged = Some(Arc::clone(&stale));
                Arc::new(StoreState {
                    current: Some(stale),
                    history: old.history.clone(),
                })
            }
            _ => {
                flagged = None;
                Arc::clone(old)
            }
        });
        match flagged {
            Some(stale) => {
                self.notify.send_replace(Some(stale));
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<Arc<MetricsSnapshot>> {
        self.state.load().current.clone()
    }

    /// Prior snapshots, oldest first. Excludes the current one.
    pub fn history(&self) -> Vec<Arc<MetricsSnapshot>> {
        self.state.load().history.iter().cloned().collect()
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.notify.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::snapshot_fixture as snapshot;

    #[test]
    fn empty_until_first_publish() {
        let store = SnapshotStore::new(3);
        assert!(store.current().is_none());
        assert!(store.history().is_empty());
        assert!(!store.mark_stale());
        assert!(store.current().is_none());
    }

    #[test]
    fn publish_rotates_into_bounded_history() {
        let store = SnapshotStore::new(2);
        for seq in 1..=5 {
            store.publish(snapshot(seq));
        }
        assert_eq!(store.current().unwrap().sequence, 5);
        let history: Vec<u64> = store.history().iter().map(|s| s.sequence).collect();
        assert_eq!(history, vec![3, 4]);
    }

    #[test]
    fn mark_stale_keeps_values_and_history() {
        let store = SnapshotStore::new(5);
        store.publish(snapshot(1));
        store.publish(snapshot(2));
        let before = store.current().unwrap();

        assert!(store.mark_stale());
        let after = store.current().unwrap();
        assert!(after.stale);
        assert_eq!(after.sequence, before.sequence);
        assert_eq!(after.throughput, before.throughput);
        assert_eq!(after.clients, before.clients);
        assert_eq!(store.history().len(), 1);

        assert!(!store.mark_stale(), "already stale");
    }

    #[test]
    fn readers_hold_old_snapshot_across_publish() {
        let store = SnapshotStore::new(1);
        store.publish(snapshot(1));
        let held = store.current().unwrap();
        store.publish(snapshot(2));
        assert_eq!(held.sequence, 1);
        assert_eq!(store.current().unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn subscribers_see_publish_and_stale() {
        let store = SnapshotStore::new(1);
        let mut stream = store.subscribe();
        assert!(stream.current().is_none());

        store.publish(snapshot(1));
        let seen = stream.changed().await.unwrap();
        assert_eq!(seen.sequence, 1);
        assert!(!seen.stale);

        store.mark_stale();
        let seen = stream.changed().await.unwrap();
        assert!(seen.stale);
        assert!(stream.current().unwrap().stale);
    }
}
