use std::time::Duration;

use clap::Parser;

use super::schema::ExporterConfig;

/// Command-line flags. Every flag is optional and overrides the config file.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "sysprism")]
#[command(about = "Host CPU, memory and disk metrics in Prometheus text format")]
#[command(version)]
pub struct Cli {
    /// YAML config file
    #[arg(short, long, env = "SYSPRISM_CONFIG")]
    pub config: Option<String>,

    /// Listen address
    #[arg(long, env = "SYSPRISM_HOST")]
    pub host: Option<String>,

    /// Port to serve metrics on
    #[arg(short, long, env = "SYSPRISM_PORT")]
    pub port: Option<u16>,

    /// Path to expose metrics on
    #[arg(long = "metrics-path", env = "SYSPRISM_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Interval between metric collections (ms)
    #[arg(long = "scrape-interval-ms", env = "SYSPRISM_SCRAPE_INTERVAL_MS")]
    pub scrape_interval_ms: Option<u64>,

    /// Interval between metric collections as a duration (`5s`, `1m30s`)
    #[arg(
        long = "scrape-interval",
        env = "SYSPRISM_SCRAPE_INTERVAL",
        value_parser = humantime::parse_duration,
        conflicts_with = "scrape_interval_ms"
    )]
    pub scrape_interval: Option<Duration>,

    /// Time allowed for in-flight requests on shutdown (ms)
    #[arg(long = "shutdown-grace-ms", env = "SYSPRISM_SHUTDOWN_GRACE_MS")]
    pub shutdown_grace_ms: Option<u64>,

    /// Shutdown grace period as a duration (`5s`, `1500ms`)
    #[arg(
        long = "shutdown-grace",
        env = "SYSPRISM_SHUTDOWN_GRACE",
        value_parser = humantime::parse_duration,
        conflicts_with = "shutdown_grace_ms"
    )]
    pub shutdown_grace: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "SYSPRISM_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn apply(&self, cfg: &mut ExporterConfig) {
        let ex = &mut cfg.exporter;
        if let Some(h) = &self.host {
            ex.host = h.clone();
        }
        if let Some(p) = self.port {
            ex.port = p;
        }
        if let Some(p) = &self.metrics_path {
            ex.metrics_path = p.clone();
        }
        if let Some(ms) = self
            .scrape_interval_ms
            .or(self.scrape_interval.map(duration_ms))
        {
            ex.scrape_interval_ms = ms;
        }
        if let Some(ms) = self
            .shutdown_grace_ms
            .or(self.shutdown_grace.map(duration_ms))
        {
            ex.shutdown_grace_ms = ms;
        }
        if let Some(l) = &self.log_level {
            cfg.log.level = l.to_ascii_lowercase();
        }
    }
}

/// Whole milliseconds; out-of-range values saturate and fail validation.
fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
