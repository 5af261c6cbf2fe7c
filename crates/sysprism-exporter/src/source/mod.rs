//! Host probe capability consumed by the sampler.
//!
//! Each operation is independently fallible so the sampler can isolate a
//! failing category (e.g. disk) from the others in the same tick. Disk
//! sampling is split into enumeration and a per-partition usage lookup so one
//! unreadable mount does not hide the rest.

mod host;

use async_trait::async_trait;

use sysprism_core::Result;

pub use host::SysinfoSource;

pub const CATEGORY_CPU: &str = "cpu";
pub const CATEGORY_MEMORY: &str = "memory";
pub const CATEGORY_DISK: &str = "disk";

/// Overall and per-core usage, percentages in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSample {
    pub overall: f64,
    pub per_core: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemorySample {
    pub used_percent: f64,
    pub available_bytes: f64,
    pub total_bytes: f64,
}

/// A mounted, non-virtual partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub mountpoint: String,
    pub device: String,
    pub fs_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub used_percent: f64,
    pub total_bytes: f64,
}

#[async_trait]
pub trait SystemSource: Send + Sync {
    async fn sample_cpu(&self) -> Result<CpuSample>;
    async fn sample_memory(&self) -> Result<MemorySample>;
    async fn disk_partitions(&self) -> Result<Vec<Partition>>;
    async fn disk_usage(&self, partition: &Partition) -> Result<DiskUsage>;
}

/// `used / total` as a percentage; `None` when `total` is zero.
pub(crate) fn percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(used as f64 / total as f64 * 100.0)
}

/// Disk usage as `df` reports it: `used / (used + avail)` with
/// `used = total - free`. Blocks reserved for root are in `free` but not in
/// `avail`, so they count as neither used nor available. `None` when the
/// filesystem reports no usable space at all.
pub fn disk_used_percent(total: u64, free: u64, avail: u64) -> Option<f64> {
    let used = total.saturating_sub(free);
    percent(used, used.saturating_add(avail))
}
