//! Shared application state for the sysPrism exporter.
//!
//! Owns the registry explicitly (no process-wide globals) so tests can run
//! several independent exporters side by side.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sysprism_core::error::{Result, SysPrismError};
use sysprism_core::{MetricKind, Registry, SeriesHandle};

use crate::config::ExporterConfig;
use crate::sampler::HostMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<Registry>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    host: HostMetrics,
    scrapes: SeriesHandle,
    index_html: String,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state and register every host series.
    /// Registration errors are returned so main can refuse to start.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let host = HostMetrics::register(&registry)?;
        let scrapes = registry.register(
            "sysprism_scrape_requests_total",
            "Metrics endpoint requests by HTTP status code",
            MetricKind::Counter,
            &["code"],
        )?;
        let index_html = render_index(&cfg.exporter.metrics_path);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                host,
                scrapes,
                index_html,
                draining: AtomicBool::new(false),
            }),
            registry,
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn host_metrics(&self) -> &HostMetrics {
        &self.inner.host
    }

    /// Count one served metrics request.
    pub fn record_scrape(&self, code: u16) {
        let code = code.to_string();
        if let Err(e) = self
            .registry
            .add(&self.inner.scrapes, &[code.as_str()], 1.0)
        {
            tracing::error!(code = e.code().as_str(), error = %e, "scrape counter update failed");
        }
    }

    pub fn index_html(&self) -> &str {
        &self.inner.index_html
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ex = &self.inner.cfg.exporter;
        let ip: IpAddr = ex
            .host
            .parse()
            .map_err(|_| SysPrismError::Config(format!("exporter.host {:?} is not an IP address", ex.host)))?;
        Ok(SocketAddr::new(ip, ex.port))
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}

fn render_index(metrics_path: &str) -> String {
    let href = html_escape(metrics_path);
    format!(
        "<html>\n\
         <head><title>System Metrics Exporter</title></head>\n\
         <body>\n\
         <h1>System Metrics Exporter</h1>\n\
         <p><a href=\"{href}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
