// ── Reactive snapshot stream ──
//
// Subscription handle vended by the SnapshotStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::MetricsSnapshot;

type Slot = Option<Arc<MetricsSnapshot>>;

/// A subscription to published snapshots.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct SnapshotStream {
    current: Slot,
    receiver: watch::Receiver<Slot>,
}

impl SnapshotStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Slot>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The snapshot seen at creation or at the last `changed()`.
    pub fn current(&self) -> Option<&Arc<MetricsSnapshot>> {
        self.current.as_ref()
    }

    /// The latest snapshot (may have changed since `current`).
    pub fn latest(&self) -> Option<Arc<MetricsSnapshot>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish or staleness change.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<MetricsSnapshot>> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(snap) = self.receiver.borrow_and_update().clone() {
                self.current = Some(Arc::clone(&snap));
                return Some(snap);
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// Yields the current snapshot first (if any), then every change.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Slot>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<MetricsSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Some(snap))) => return Poll::Ready(Some(snap)),
                // Nothing published yet; wait for the next change.
                Poll::Ready(Some(None)) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
