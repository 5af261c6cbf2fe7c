use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use sysprism_core::error::{Result, SysPrismError};

/// Paths the router owns besides the metrics path.
const RESERVED_PATHS: [&str; 3] = ["/", "/healthz", "/readyz"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub log: LogSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
            log: LogSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SysPrismError::UnsupportedVersion);
        }
        self.exporter.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    #[serde(default = "default_scrape_interval_ms")]
    pub scrape_interval_ms: u64,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_path: default_metrics_path(),
            scrape_interval_ms: default_scrape_interval_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.host.parse::<IpAddr>().map_err(|_| {
            SysPrismError::Config(format!("exporter.host must be an IP address, got {:?}", self.host))
        })?;
        if !(1..=3_600_000).contains(&self.scrape_interval_ms) {
            return Err(SysPrismError::Config(
                "exporter.scrape_interval_ms must be between 1 and 3600000".into(),
            ));
        }
        if self.shutdown_grace_ms > 600_000 {
            return Err(SysPrismError::Config(
                "exporter.shutdown_grace_ms must be at most 600000".into(),
            ));
        }
        validate_metrics_path(&self.metrics_path)
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_millis(self.scrape_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn validate_metrics_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(SysPrismError::Config(
            "exporter.metrics_path must start with '/'".into(),
        ));
    }
    if RESERVED_PATHS.contains(&path) {
        return Err(SysPrismError::Config(format!(
            "exporter.metrics_path {path} collides with a built-in route"
        )));
    }
    // Route syntax characters would turn the path into a capture.
    if path
        .chars()
        .any(|c| matches!(c, ':' | '*' | '{' | '}' | '?' | '#') || c.is_whitespace())
    {
        return Err(SysPrismError::Config(format!(
            "exporter.metrics_path {path:?} contains reserved characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogSection {
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(SysPrismError::Config(format!(
                "log.level must be one of {}, got {:?}",
                LOG_LEVELS.join("|"),
                self.level
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_scrape_interval_ms() -> u64 {
    5000
}
fn default_shutdown_grace_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}
