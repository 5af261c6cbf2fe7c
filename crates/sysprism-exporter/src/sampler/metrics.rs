use sysprism_core::{MetricKind, Registry, Result, SeriesHandle};

/// Handles to every series the sampler writes.
#[derive(Debug, Clone)]
pub struct HostMetrics {
    pub cpu_usage: SeriesHandle,
    pub cpu_core_usage: SeriesHandle,
    pub mem_usage: SeriesHandle,
    pub mem_available: SeriesHandle,
    pub mem_total: SeriesHandle,
    pub disk_usage: SeriesHandle,
    pub disk_total: SeriesHandle,

    pub sample_errors: SeriesHandle,
    pub ticks: SeriesHandle,
    pub tick_duration: SeriesHandle,
}

impl HostMetrics {
    /// Register the host series. Any error here is a wiring bug and must
    /// stop startup.
    pub fn register(reg: &Registry) -> Result<Self> {
        Ok(Self {
            cpu_usage: reg.register(
                "system_cpu_usage_percent",
                "Current CPU usage percentage (all cores)",
                MetricKind::Gauge,
                &[],
            )?,
            cpu_core_usage: reg.register(
                "system_cpu_core_usage_percent",
                "Current CPU usage percentage per core",
                MetricKind::Gauge,
                &["core"],
            )?,
            mem_usage: reg.register(
                "system_memory_usage_percent",
                "Current memory usage percentage",
                MetricKind::Gauge,
                &[],
            )?,
            mem_available: reg.register(
                "system_memory_available_bytes",
                "Available memory in bytes",
                MetricKind::Gauge,
                &[],
            )?,
            mem_total: reg.register(
                "system_memory_total_bytes",
                "Total memory in bytes",
                MetricKind::Gauge,
                &[],
            )?,
            disk_usage: reg.register(
                "system_disk_usage_percent",
                "Current disk usage percentage",
                MetricKind::Gauge,
                &["mount", "device"],
            )?,
            disk_total: reg.register(
                "system_disk_total_bytes",
                "Total disk space in bytes",
                MetricKind::Gauge,
                &["mount", "device"],
            )?,
            sample_errors: reg.register(
                "sysprism_sample_errors_total",
                "Failed host probes by category",
                MetricKind::Counter,
                &["category"],
            )?,
            ticks: reg.register(
                "sysprism_ticks_total",
                "Completed sampling ticks",
                MetricKind::Counter,
                &[],
            )?,
            tick_duration: reg.register(
                "sysprism_last_tick_duration_seconds",
                "Wall-clock duration of the last completed tick",
                MetricKind::Gauge,
                &[],
            )?,
        })
    }
}

/// Label value for a per-core series: the zero-based core index in base 10,
/// no padding (`0`, `1`, ... `15`).
pub fn core_label(index: usize) -> String {
    index.to_string()
}
