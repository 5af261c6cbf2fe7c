//! Periodic host sampler.
//!
//! One tick probes CPU, memory and disk in that order and writes the
//! readings into the registry. Categories fail independently: a failed probe
//! is logged and counted, and its series keep their previous values until
//! the next successful tick. Nothing here is fatal.
//!
//! Ticks never overlap. The interval uses `MissedTickBehavior::Delay`, so a
//! slow tick delays the next one instead of queueing a burst.

mod metrics;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use sysprism_core::error::{Result, SysPrismError};

use crate::lifecycle::Shutdown;
use crate::source::{SystemSource, CATEGORY_CPU, CATEGORY_DISK, CATEGORY_MEMORY};

pub use metrics::{core_label, HostMetrics};

/// What one tick managed to record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub cpu: bool,
    pub memory: bool,
    /// Partition enumeration succeeded.
    pub disk: bool,
    pub partitions_written: usize,
    pub partitions_failed: usize,
    /// Shutdown was observed between categories.
    pub interrupted: bool,
}

pub struct Sampler {
    source: Arc<dyn SystemSource>,
    metrics: HostMetrics,
    interval: Duration,
}

impl Sampler {
    pub fn new(source: Arc<dyn SystemSource>, metrics: HostMetrics, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(SysPrismError::Config("scrape interval must be greater than zero".into()));
        }
        Ok(Self {
            source,
            metrics,
            interval,
        })
    }

    /// Tick immediately, then every `interval` until `shutdown` trips.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "sampler started");

        // The first tick of a tokio interval completes immediately.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick(&shutdown).await;
                }
            }
        }

        tracing::info!("sampler stopped");
    }

    /// Run one full tick. Stops at the next category boundary once
    /// `shutdown` has tripped.
    pub async fn tick(&self, shutdown: &Shutdown) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        report.cpu = self.sample_cpu().await;
        if shutdown.is_triggered() {
            report.interrupted = true;
            return report;
        }

        report.memory = self.sample_memory().await;
        if shutdown.is_triggered() {
            report.interrupted = true;
            return report;
        }

        self.sample_disk(&mut report).await;

        let elapsed = started.elapsed();
        record(self.metrics.ticks.add(&[], 1.0));
        record(self.metrics.tick_duration.set(&[], elapsed.as_secs_f64()));
        tracing::debug!(
            cpu = report.cpu,
            memory = report.memory,
            disk = report.disk,
            partitions = report.partitions_written,
            partitions_failed = report.partitions_failed,
            elapsed_us = elapsed.as_micros() as u64,
            "tick complete"
        );
        report
    }

    async fn sample_cpu(&self) -> bool {
        let cpu = match self.source.sample_cpu().await {
            Ok(c) => c,
            Err(e) => {
                self.sample_failed(CATEGORY_CPU, &e);
                return false;
            }
        };

        record(self.metrics.cpu_usage.set(&[], cpu.overall));
        for (i, pct) in cpu.per_core.iter().enumerate() {
            let core = core_label(i);
            record(self.metrics.cpu_core_usage.set(&[core.as_str()], *pct));
        }
        true
    }

    async fn sample_memory(&self) -> bool {
        let mem = match self.source.sample_memory().await {
            Ok(m) => m,
            Err(e) => {
                self.sample_failed(CATEGORY_MEMORY, &e);
                return false;
            }
        };

        record(self.metrics.mem_usage.set(&[], mem.used_percent));
        record(self.metrics.mem_available.set(&[], mem.available_bytes));
        record(self.metrics.mem_total.set(&[], mem.total_bytes));
        true
    }

    async fn sample_disk(&self, report: &mut TickReport) {
        let partitions = match self.source.disk_partitions().await {
            Ok(p) => p,
            Err(e) => {
                self.sample_failed(CATEGORY_DISK, &e);
                return;
            }
        };
        report.disk = true;

        for p in &partitions {
            let usage = match self.source.disk_usage(p).await {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!(
                        mountpoint = %p.mountpoint,
                        device = %p.device,
                        error = %e,
                        "disk usage lookup failed; skipping partition"
                    );
                    record(self.metrics.sample_errors.add(&[CATEGORY_DISK], 1.0));
                    report.partitions_failed += 1;
                    continue;
                }
            };

            let labels = [p.mountpoint.as_str(), p.device.as_str()];
            record(self.metrics.disk_usage.set(&labels, usage.used_percent));
            record(self.metrics.disk_total.set(&labels, usage.total_bytes));
            report.partitions_written += 1;
        }
    }

    fn sample_failed(&self, category: &'static str, err: &SysPrismError) {
        tracing::warn!(category, code = err.code().as_str(), error = %err, "sample failed; keeping previous values");
        record(self.metrics.sample_errors.add(&[category], 1.0));
    }
}

/// Registry writes only fail on label arity, which is a wiring bug.
fn record(res: Result<()>) {
    if let Err(e) = res {
        tracing::error!(code = e.code().as_str(), error = %e, "registry write rejected");
    }
}
