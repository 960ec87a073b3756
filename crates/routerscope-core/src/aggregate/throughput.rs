// ── Throughput ──
//
// Rate between two counter samples of the same interface. Pairs that
// cannot yield an honest rate are discarded outright, never clamped.

use std::time::Duration;

use tracing::debug;

use crate::model::{InterfaceCounterSample, ThroughputSample};

/// Samples closer together than this are treated as duplicate polls.
pub const MIN_ELAPSED: Duration = Duration::from_millis(250);

/// Why a sample pair produced no rate. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThroughputSkip {
    DifferentInterface { previous: String, current: String },
    /// Includes zero and negative elapsed time (clock stepped back).
    ElapsedTooShort { elapsed_ms: i64 },
    /// A counter went backwards: interface restart or device reboot.
    CounterReset,
}

/// Compute the rate from `prev` to `curr`, or explain why not.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn evaluate_throughput(
    prev: &InterfaceCounterSample,
    curr: &InterfaceCounterSample,
) -> Result<ThroughputSample, ThroughputSkip> {
    if prev.interface != curr.interface {
        return Err(ThroughputSkip::DifferentInterface {
            previous: prev.interface.clone(),
            current: curr.interface.clone(),
        });
    }

    let delta = curr.timestamp - prev.timestamp;
    let elapsed = match delta.to_std() {
        Ok(elapsed) if elapsed >= MIN_ELAPSED => elapsed,
        _ => {
            return Err(ThroughputSkip::ElapsedTooShort {
                elapsed_ms: delta.num_milliseconds(),
            });
        }
    };

    let (Some(rx), Some(tx)) = (
        curr.rx_bytes.checked_sub(prev.rx_bytes),
        curr.tx_bytes.checked_sub(prev.tx_bytes),
    ) else {
        return Err(ThroughputSkip::CounterReset);
    };

    let secs = elapsed.as_secs_f64();
    let download_mbps = rx as f64 * 8.0 / 1e6 / secs;
    let upload_mbps = tx as f64 * 8.0 / 1e6 / secs;
    Ok(ThroughputSample {
        download_mbps,
        upload_mbps,
        total_mbps: download_mbps + upload_mbps,
        elapsed_secs: secs,
    })
}

/// [`evaluate_throughput`] with the skip reason logged and dropped.
pub fn compute_throughput(
    prev: &InterfaceCounterSample,
    curr: &InterfaceCounterSample,
) -> Option<ThroughputSample> {
    match evaluate_throughput(prev, curr) {
        Ok(sample) => Some(sample),
        Err(skip) => {
            debug!(interface = %curr.interface, ?skip, "throughput sample withheld");
            None
        }
    }
}

/// Keeps the previous sample between cycles.
///
/// Every observation becomes the new baseline, including ones that yielded
/// no rate, so a counter reset costs exactly one cycle.
#[derive(Debug, Default)]
pub struct ThroughputTracker {
    baseline: Option<InterfaceCounterSample>,
}

impl ThroughputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sample: InterfaceCounterSample) -> Option<ThroughputSample> {
        let rate = self
            .baseline
            .as_ref()
            .and_then(|prev| compute_throughput(prev, &sample));
        self.baseline = Some(sample);
        rate
    }

    pub fn baseline(&self) -> Option<&InterfaceCounterSample> {
        self.baseline.as_ref()
    }
}
