//! I/O counters reported by Stats operations.

use crate::spdk::BdevIostat;
use serde::{Deserialize, Serialize};

/// Counter value for anything the backend did not report.
pub const NOT_REPORTED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub read_bytes_count: i64,
    pub read_ops_count: i64,
    pub write_bytes_count: i64,
    pub write_ops_count: i64,
    pub unmap_bytes_count: i64,
    pub unmap_ops_count: i64,
    pub read_latency_ticks: i64,
    pub write_latency_ticks: i64,
    pub unmap_latency_ticks: i64,
}

impl Default for VolumeStats {
    fn default() -> Self {
        Self::unreported()
    }
}

fn counter(value: Option<u64>) -> i64 {
    value
        .map(|v| i64::try_from(v).unwrap_or(i64::MAX))
        .unwrap_or(NOT_REPORTED)
}

fn add(total: &mut i64, value: i64) {
    if value == NOT_REPORTED {
        return;
    }
    *total = if *total == NOT_REPORTED {
        value
    } else {
        total.saturating_add(value)
    };
}

impl VolumeStats {
    /// Every counter set to [`NOT_REPORTED`].
    pub fn unreported() -> Self {
        Self {
            read_bytes_count: NOT_REPORTED,
            read_ops_count: NOT_REPORTED,
            write_bytes_count: NOT_REPORTED,
            write_ops_count: NOT_REPORTED,
            unmap_bytes_count: NOT_REPORTED,
            unmap_ops_count: NOT_REPORTED,
            read_latency_ticks: NOT_REPORTED,
            write_latency_ticks: NOT_REPORTED,
            unmap_latency_ticks: NOT_REPORTED,
        }
    }

    pub fn from_iostat(iostat: &BdevIostat) -> Self {
        Self {
            read_bytes_count: counter(iostat.bytes_read),
            read_ops_count: counter(iostat.num_read_ops),
            write_bytes_count: counter(iostat.bytes_written),
            write_ops_count: counter(iostat.num_write_ops),
            unmap_bytes_count: counter(iostat.bytes_unmapped),
            unmap_ops_count: counter(iostat.num_unmap_ops),
            read_latency_ticks: counter(iostat.read_latency_ticks),
            write_latency_ticks: counter(iostat.write_latency_ticks),
            unmap_latency_ticks: counter(iostat.unmap_latency_ticks),
        }
    }

    /// Add `other` into `self`. Unreported counters on either side do not
    /// turn a reported total back into [`NOT_REPORTED`].
    pub fn accumulate(&mut self, other: &VolumeStats) {
        add(&mut self.read_bytes_count, other.read_bytes_count);
        add(&mut self.read_ops_count, other.read_ops_count);
        add(&mut self.write_bytes_count, other.write_bytes_count);
        add(&mut self.write_ops_count, other.write_ops_count);
        add(&mut self.unmap_bytes_count, other.unmap_bytes_count);
        add(&mut self.unmap_ops_count, other.unmap_ops_count);
        add(&mut self.read_latency_ticks, other.read_latency_ticks);
        add(&mut self.write_latency_ticks, other.write_latency_ticks);
        add(&mut self.unmap_latency_ticks, other.unmap_latency_ticks);
    }
}
