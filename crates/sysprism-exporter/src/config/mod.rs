//! Exporter config loader (strict parsing) and command-line overrides.

pub mod cli;
pub mod schema;

use std::fs;

use sysprism_core::error::{Result, SysPrismError};

pub use cli::Cli;
pub use schema::{ExporterConfig, ExporterSection, LogSection};

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SysPrismError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| SysPrismError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the effective config: optional file first, then flags on top.
pub fn resolve(cli: &Cli) -> Result<ExporterConfig> {
    let mut cfg = match cli.config.as_deref() {
        Some(path) => load_from_file(path)?,
        None => ExporterConfig::default(),
    };
    cli.apply(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}
