// ── Shared state ──
//
// Single-writer / many-reader storage. Writers build a whole new value and
// swap it in; readers take an `Arc` and never see a half-written state.

mod query_log;
mod snapshot;

pub use query_log::QueryLog;
pub use snapshot::SnapshotStore;
