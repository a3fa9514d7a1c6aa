//! Incremental bandwidth from a restart-prone cumulative egress counter.
//!
//! The runtime's counter only grows while the container keeps running and
//! restarts near zero with each new container process. Each sample is turned
//! into a gigabyte delta against the previous sample, re-baselining whenever
//! continuity with that sample cannot be established.

use chrono::{DateTime, Utc};

use crate::config::BYTES_PER_GB;
use crate::core::tenant::StatsSample;

/// How the delta was derived from the raw reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    /// No previous sample: the whole counter is new usage.
    FirstSample,
    /// Container started at or after the previous sample.
    Restarted,
    /// Counter continued from the previous sample.
    Continuous,
    /// Counter went backwards without a container restart. Counted from zero.
    Rebaselined,
}

/// Bandwidth consumed since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub kind: DeltaKind,
    pub bytes: u64,
}

impl Delta {
    pub fn gigabytes(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_GB
    }
}

/// Compute the usage delta for one raw counter reading.
pub fn compute_delta(
    previous: Option<StatsSample>,
    raw_counter: u64,
    container_started_at: DateTime<Utc>,
) -> Delta {
    let Some(previous) = previous else {
        return Delta {
            kind: DeltaKind::FirstSample,
            bytes: raw_counter,
        };
    };

    if container_started_at >= previous.time {
        return Delta {
            kind: DeltaKind::Restarted,
            bytes: raw_counter,
        };
    }

    match raw_counter.checked_sub(previous.result) {
        Some(bytes) => Delta {
            kind: DeltaKind::Continuous,
            bytes,
        },
        None => Delta {
            kind: DeltaKind::Rebaselined,
            bytes: raw_counter,
        },
    }
}
