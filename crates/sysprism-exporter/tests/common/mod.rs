//! Shared fixtures: a scriptable host probe and a raw HTTP/1.1 client.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use sysprism_core::{Result, SysPrismError};
use sysprism_exporter::config::ExporterConfig;
use sysprism_exporter::lifecycle::Shutdown;
use sysprism_exporter::source::{
    CpuSample, DiskUsage, MemorySample, Partition, SystemSource, CATEGORY_CPU, CATEGORY_DISK,
    CATEGORY_MEMORY,
};

/// Deterministic `SystemSource` with per-category fault injection.
#[derive(Default)]
pub struct FakeSource {
    pub fail_cpu: AtomicBool,
    pub fail_memory: AtomicBool,
    pub fail_disk: AtomicBool,
    /// Mountpoints whose usage lookup fails.
    pub failing_mounts: Mutex<Vec<String>>,
    pub partitions: Mutex<Vec<Partition>>,
    /// Extra latency inside `sample_cpu`, to simulate a slow tick.
    pub cpu_delay: Mutex<Option<Duration>>,
    /// Tripped from inside `sample_cpu`, to simulate a signal mid-tick.
    pub trip_on_cpu: Mutex<Option<Shutdown>>,

    cpu_calls: AtomicUsize,
    memory_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn healthy() -> Self {
        let src = Self::default();
        *src.partitions.lock().unwrap() = vec![partition("/", "/dev/sda1"), partition("/data", "/dev/sdb1")];
        src
    }

    pub fn cpu_calls(&self) -> usize {
        self.cpu_calls.load(Ordering::SeqCst)
    }

    pub fn memory_calls(&self) -> usize {
        self.memory_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn partition(mountpoint: &str, device: &str) -> Partition {
    Partition {
        mountpoint: mountpoint.to_string(),
        device: device.to_string(),
        fs_type: "ext4".to_string(),
    }
}

#[async_trait]
impl SystemSource for FakeSource {
    async fn sample_cpu(&self) -> Result<CpuSample> {
        let n = self.cpu_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.cpu_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        let trip = self.trip_on_cpu.lock().unwrap().clone();
        if let Some(s) = trip {
            s.trigger();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_cpu.load(Ordering::SeqCst) {
            return Err(SysPrismError::sample(CATEGORY_CPU, "injected"));
        }
        Ok(CpuSample {
            overall: 10.0 + n as f64,
            per_core: vec![5.0, 15.0],
        })
    }

    async fn sample_memory(&self) -> Result<MemorySample> {
        self.memory_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_memory.load(Ordering::SeqCst) {
            return Err(SysPrismError::sample(CATEGORY_MEMORY, "injected"));
        }
        Ok(MemorySample {
            used_percent: 50.0,
            available_bytes: 4096.0,
            total_bytes: 8192.0,
        })
    }

    async fn disk_partitions(&self) -> Result<Vec<Partition>> {
        if self.fail_disk.load(Ordering::SeqCst) {
            return Err(SysPrismError::sample(CATEGORY_DISK, "injected"));
        }
        Ok(self.partitions.lock().unwrap().clone())
    }

    async fn disk_usage(&self, partition: &Partition) -> Result<DiskUsage> {
        if self.failing_mounts.lock().unwrap().contains(&partition.mountpoint) {
            return Err(SysPrismError::sample(CATEGORY_DISK, "injected"));
        }
        Ok(DiskUsage {
            used_percent: 25.0,
            total_bytes: 1_000_000.0,
        })
    }
}

pub fn test_config(interval_ms: u64, grace_ms: u64) -> ExporterConfig {
    let mut cfg = ExporterConfig::default();
    cfg.exporter.host = "127.0.0.1".into();
    cfg.exporter.port = 0;
    cfg.exporter.scrape_interval_ms = interval_ms;
    cfg.exporter.shutdown_grace_ms = grace_ms;
    cfg
}

/// Value of the first sample line starting with `prefix` (`name` or `name{...}`).
pub fn sample_value(render: &str, prefix: &str) -> Option<f64> {
    render
        .lines()
        .filter(|l| !l.starts_with('#'))
        .find(|l| l.starts_with(prefix) && l[prefix.len()..].starts_with(' '))
        .and_then(|l| l.rsplit(' ').next())
        .and_then(|v| v.parse().ok())
}

/// One-shot `GET` returning (status, head, body).
pub async fn http_get(addr: SocketAddr, path: &str) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).into_owned();
    let (head, body) = text.split_once("\r\n\r\n").expect("malformed response");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("missing status");
    (status, head.to_string(), body.to_string())
}
