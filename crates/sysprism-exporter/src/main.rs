//! sysPrism exporter
//!
//! - Samples host CPU, memory and disk on a fixed interval
//! - Serves the latest values at the metrics path (Prometheus text format)
//! - SIGINT/SIGTERM: stop sampling, drain HTTP within the grace period
//!
//! Exit code 0 on clean shutdown, 1 on config, wiring, bind or drain errors.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use sysprism_exporter::{app_state, config, lifecycle, source::SysinfoSource};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = config::Cli::parse();

    let cfg = match config::resolve(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            fmt().with_env_filter(EnvFilter::new("error")).init();
            tracing::error!(code = e.code().as_str(), error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.level));
    fmt().with_env_filter(filter).init();

    match serve(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "sysprism exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cfg: config::ExporterConfig) -> sysprism_core::Result<()> {
    let state = app_state::AppState::new(cfg)?;
    let listener = lifecycle::bind(&state).await?;

    let shutdown = lifecycle::Shutdown::new();
    tokio::spawn(lifecycle::trip_on_signal(shutdown.clone()));

    lifecycle::run(state, Arc::new(SysinfoSource::new()), listener, shutdown).await
}
