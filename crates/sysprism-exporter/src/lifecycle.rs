//! Startup and coordinated shutdown.
//!
//! The exporter has two states, `Running` and `ShuttingDown` (terminal).
//! Both the sampler task and the HTTP server observe one `Shutdown` token.
//! Once it trips:
//! - the sampler starts no new tick and is joined;
//! - the server stops accepting and drains in-flight requests, bounded by
//!   the grace period. Past the deadline the server task is aborted and any
//!   unfinished requests are abandoned.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time::Instant;

use sysprism_core::error::{Result, SysPrismError};

use crate::app_state::AppState;
use crate::router;
use crate::sampler::Sampler;
use crate::source::SystemSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    ShuttingDown,
}

/// One-way, level-triggered cancellation signal.
///
/// Clones share the same state. Once triggered it stays triggered, and every
/// pending `cancelled()` wakes immediately.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_triggered() {
            LifecycleState::ShuttingDown
        } else {
            LifecycleState::Running
        }
    }

    /// Resolves once the token has been triggered.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns Ok.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

/// Trip `shutdown` on SIGINT (Ctrl+C) or SIGTERM.
pub async fn trip_on_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }
    tracing::info!("signal received, starting graceful shutdown");
    shutdown.trigger();
}

/// Bind the HTTP listener. Failure here is fatal.
pub async fn bind(state: &AppState) -> Result<TcpListener> {
    let addr = state.listen_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| SysPrismError::ListenerStart(format!("bind {addr}: {e}")))
}

/// Run sampler and server until `shutdown` trips, then drain both.
pub async fn run(
    state: AppState,
    source: Arc<dyn SystemSource>,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<()> {
    let ex = &state.cfg().exporter;
    let grace = ex.shutdown_grace();
    let sampler = Sampler::new(source, state.host_metrics().clone(), ex.scrape_interval())?;

    let local = listener
        .local_addr()
        .map_err(|e| SysPrismError::ListenerStart(format!("listener address: {e}")))?;
    tracing::info!(address = %local, metrics_path = %ex.metrics_path, "sysprism exporter starting");

    let mut sampler_task = tokio::spawn(sampler.run(shutdown.clone()));

    let app = router::build_router(state.clone());
    let server_shutdown = shutdown.clone();
    let mut server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    // Running
    let early_exit = tokio::select! {
        _ = shutdown.cancelled() => None,
        res = &mut server_task => Some(res),
    };

    // ShuttingDown
    state.set_draining();
    shutdown.trigger();
    let deadline = Instant::now() + grace;

    let drain = async move {
        match early_exit {
            Some(res) => match server_result(res) {
                Ok(()) => Err(SysPrismError::ShutdownDrain(
                    "server stopped before shutdown was requested".into(),
                )),
                Err(e) => Err(e),
            },
            None => match tokio::time::timeout_at(deadline, &mut server_task).await {
                Ok(res) => server_result(res),
                Err(_) => {
                    server_task.abort();
                    tracing::warn!(
                        grace_ms = grace.as_millis() as u64,
                        "grace period expired; abandoning in-flight requests"
                    );
                    Ok(())
                }
            },
        }
    };

    let stop_sampler = async move {
        match tokio::time::timeout_at(deadline, &mut sampler_task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SysPrismError::Internal(format!("sampler task failed: {e}"))),
            Err(_) => {
                sampler_task.abort();
                tracing::warn!("sampler did not stop within the grace period; aborted");
                Ok(())
            }
        }
    };

    let (drained, stopped) = tokio::join!(drain, stop_sampler);
    if let Err(e) = &stopped {
        tracing::error!(error = %e, "sampler shutdown failed");
    }
    match drained {
        Ok(()) => {
            tracing::info!("server gracefully stopped");
            stopped
        }
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "server shutdown error");
            Err(e)
        }
    }
}

fn server_result(res: std::result::Result<std::io::Result<()>, JoinError>) -> Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SysPrismError::ShutdownDrain(e.to_string())),
        Err(e) => Err(SysPrismError::ShutdownDrain(format!("server task failed: {e}"))),
    }
}
