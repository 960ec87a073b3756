//! Derived metrics: throughput, client identity, service tags.
//!
//! All pure. A withheld value (counter reset, polls too close together) is
//! a normal decision, reported as `None` and logged at debug level only.

mod classify;
mod identity;
mod throughput;

pub use classify::{DEFAULT_CONNECTION_LIMIT, ServiceClassifier};
pub use identity::resolve_clients;
pub use throughput::{MIN_ELAPSED, ThroughputSkip, ThroughputTracker, compute_throughput, evaluate_throughput};
