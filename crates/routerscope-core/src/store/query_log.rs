// ── Query log ──
//
// Append-only ring of executor calls. Entries are immutable `Arc`s; the
// oldest is evicted silently once the ring is full. There is no way to
// edit or clear it from outside. Writers take `next_seq` for the whole
// append, so entries are stored in sequence order; readers never lock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

use crate::command::CommandId;
use crate::model::{Outcome, QueryLogEntry};

pub struct QueryLog {
    entries: ArcSwap<VecDeque<Arc<QueryLogEntry>>>,
    capacity: usize,
    next_seq: Mutex<u64>,
}

impl QueryLog {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: ArcSwap::from_pointee(VecDeque::with_capacity(capacity)),
            capacity,
            next_seq: Mutex::new(1),
        }
    }

    /// Record one executor call. Safe to call from several tasks at once.
    pub fn append(
        &self,
        command: CommandId,
        timestamp: DateTime<Utc>,
        duration_ms: u64,
        outcome: Outcome,
        detail: Option<String>,
        raw_len: usize,
    ) -> Arc<QueryLogEntry> {
        let mut next_seq = self.next_seq.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = Arc::new(QueryLogEntry {
            seq: *next_seq,
            command,
            timestamp,
            duration_ms,
            outcome,
            detail,
            raw_len,
        });
        *next_seq += 1;

        let mut next = VecDeque::clone(&self.entries.load());
        while next.len() >= self.capacity {
            next.pop_front();
        }
        next.push_back(Arc::clone(&entry));
        self.entries.store(Arc::new(next));
        entry
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<Arc<QueryLogEntry>> {
        self.entries.load().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn log_one(log: &QueryLog, outcome: Outcome) -> Arc<QueryLogEntry> {
        log.append(CommandId::Memory, Utc::now(), 3, outcome, None, 100)
    }

    #[test]
    fn evicts_oldest_first() {
        let log = QueryLog::new(3);
        for _ in 0..5 {
            log_one(&log, Outcome::Success);
        }
        let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
        assert_eq!(log.len(), 3);
        assert_eq!(log.capacity(), 3);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let log = QueryLog::new(0);
        log_one(&log, Outcome::Success);
        log_one(&log, Outcome::TransportError);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].outcome, Outcome::TransportError);
    }

    #[test]
    fn readers_keep_entries_after_eviction() {
        let log = QueryLog::new(1);
        let first = log_one(&log, Outcome::ParseError);
        log_one(&log, Outcome::Success);
        assert_eq!(first.outcome, Outcome::ParseError);
        assert_eq!(log.entries()[0].seq, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_all_counted() {
        let log = Arc::new(QueryLog::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        log_one(&log, Outcome::Success);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(log.len(), 400);
        let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=400).collect::<Vec<u64>>());
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(capacity in 1usize..20, appends in 0usize..60) {
            let log = QueryLog::new(capacity);
            for _ in 0..appends {
                log_one(&log, Outcome::Success);
            }
            prop_assert_eq!(log.len(), appends.min(capacity));
            let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
            let first = u64::try_from(appends.saturating_sub(capacity)).unwrap() + 1;
            let expected: Vec<u64> = (first..first + seqs.len() as u64).collect();
            prop_assert_eq!(seqs, expected);
        }
    }
}
