//! `SystemSource` backed by `sysinfo`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, Disk, Disks, RefreshKind, System};

use sysprism_core::error::{Result, SysPrismError};

use super::{
    disk_used_percent, percent, CpuSample, DiskUsage, MemorySample, Partition, SystemSource, CATEGORY_CPU,
    CATEGORY_DISK, CATEGORY_MEMORY,
};

/// Pseudo and in-memory filesystems that are not reported as partitions.
const VIRTUAL_FS: [&str; 22] = [
    "autofs", "binfmt_misc", "bpf", "cgroup", "cgroup2", "configfs", "debugfs", "devfs",
    "devpts", "devtmpfs", "efivarfs", "fusectl", "hugetlbfs", "mqueue", "nsfs", "overlay",
    "proc", "pstore", "ramfs", "securityfs", "squashfs", "sysfs",
];

/// Probes the local host. CPU usage is a delta between two refreshes, so the
/// `System` is kept across calls and primed once at construction.
pub struct SysinfoSource {
    system: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut system =
            System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
        system.refresh_cpu();
        system.refresh_memory();

        Self {
            system: Arc::new(Mutex::new(system)),
            disks: Arc::new(Mutex::new(Disks::new())),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

fn is_physical(disk: &Disk) -> bool {
    let fs = disk.file_system().to_string_lossy();
    let fs: &str = &fs;
    !fs.starts_with("tmpfs") && !VIRTUAL_FS.contains(&fs) && disk.total_space() > 0
}

/// Total, free and available bytes of the filesystem mounted at `disk`.
///
/// sysinfo does not expose the free block count, so unix hosts read the
/// mount with `statvfs` directly.
#[cfg(unix)]
fn space(disk: &mut Disk) -> Result<(u64, u64, u64)> {
    let mount = disk.mount_point();
    let st = nix::sys::statvfs::statvfs(mount).map_err(|e| {
        SysPrismError::sample(CATEGORY_DISK, format!("statvfs {}: {e}", mount.display()))
    })?;
    let frsize = u64::from(st.fragment_size());
    Ok((
        u64::from(st.blocks()).saturating_mul(frsize),
        u64::from(st.blocks_free()).saturating_mul(frsize),
        u64::from(st.blocks_available()).saturating_mul(frsize),
    ))
}

#[cfg(not(unix))]
fn space(disk: &mut Disk) -> Result<(u64, u64, u64)> {
    disk.refresh();
    let available = disk.available_space();
    Ok((disk.total_space(), available, available))
}

/// Run a blocking probe off the async workers.
async fn blocking<T, F>(category: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SysPrismError::sample(category, format!("probe task failed: {e}")))?
}

fn poisoned(category: &'static str) -> SysPrismError {
    SysPrismError::sample(category, "probe state poisoned by an earlier panic")
}

#[async_trait]
impl SystemSource for SysinfoSource {
    async fn sample_cpu(&self) -> Result<CpuSample> {
        let system = Arc::clone(&self.system);
        blocking(CATEGORY_CPU, move || {
            let mut sys = system.lock().map_err(|_| poisoned(CATEGORY_CPU))?;
            sys.refresh_cpu();

            let per_core: Vec<f64> = sys
                .cpus()
                .iter()
                .map(|c| f64::from(c.cpu_usage()).clamp(0.0, 100.0))
                .collect();
            if per_core.is_empty() {
                return Err(SysPrismError::sample(CATEGORY_CPU, "no cpus reported"));
            }
            let overall = f64::from(sys.global_cpu_info().cpu_usage()).clamp(0.0, 100.0);
            Ok(CpuSample { overall, per_core })
        })
        .await
    }

    async fn sample_memory(&self) -> Result<MemorySample> {
        let system = Arc::clone(&self.system);
        blocking(CATEGORY_MEMORY, move || {
            let mut sys = system.lock().map_err(|_| poisoned(CATEGORY_MEMORY))?;
            sys.refresh_memory();

            let total = sys.total_memory();
            let available = sys.available_memory();
            let used_percent = percent(total.saturating_sub(available), total)
                .ok_or_else(|| SysPrismError::sample(CATEGORY_MEMORY, "total memory reported as zero"))?;
            Ok(MemorySample {
                used_percent,
                available_bytes: available as f64,
                total_bytes: total as f64,
            })
        })
        .await
    }

    async fn disk_partitions(&self) -> Result<Vec<Partition>> {
        let disks = Arc::clone(&self.disks);
        blocking(CATEGORY_DISK, move || {
            let mut disks = disks.lock().map_err(|_| poisoned(CATEGORY_DISK))?;
            disks.refresh_list();

            Ok(disks
                .list()
                .iter()
                .filter(|d| is_physical(d))
                .map(|d| Partition {
                    mountpoint: d.mount_point().to_string_lossy().into_owned(),
                    device: d.name().to_string_lossy().into_owned(),
                    fs_type: d.file_system().to_string_lossy().into_owned(),
                })
                .collect())
        })
        .await
    }

    async fn disk_usage(&self, partition: &Partition) -> Result<DiskUsage> {
        let disks = Arc::clone(&self.disks);
        let mountpoint = partition.mountpoint.clone();
        blocking(CATEGORY_DISK, move || {
            let mut disks = disks.lock().map_err(|_| poisoned(CATEGORY_DISK))?;
            let disk = disks
                .list_mut()
                .iter_mut()
                .find(|d| d.mount_point() == Path::new(&mountpoint))
                .ok_or_else(|| {
                    SysPrismError::sample(CATEGORY_DISK, format!("{mountpoint} is no longer mounted"))
                })?;

            let (total, free, available) = space(disk)?;
            let used_percent = disk_used_percent(total, free, available).ok_or_else(|| {
                SysPrismError::sample(CATEGORY_DISK, format!("{mountpoint} reports zero size"))
            })?;
            Ok(DiskUsage {
                used_percent,
                total_bytes: total as f64,
            })
        })
        .await
    }
}
