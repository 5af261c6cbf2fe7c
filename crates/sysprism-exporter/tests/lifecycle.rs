//! End-to-end: sampler + HTTP server + coordinated shutdown.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use sysprism_exporter::app_state::AppState;
use sysprism_exporter::config::ExporterConfig;
use sysprism_exporter::lifecycle::{self, LifecycleState, Shutdown};

use common::{http_get, sample_value, test_config, FakeSource};

async fn start(
    cfg: ExporterConfig,
    src: Arc<FakeSource>,
) -> (
    std::net::SocketAddr,
    AppState,
    Shutdown,
    tokio::task::JoinHandle<sysprism_core::Result<()>>,
) {
    let state = AppState::new(cfg).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(lifecycle::run(state.clone(), src, listener, shutdown.clone()));
    (addr, state, shutdown, task)
}

#[tokio::test]
async fn shutdown_token_is_one_way() {
    let s = Shutdown::new();
    let other = s.clone();
    assert_eq!(s.state(), LifecycleState::Running);

    let waiter = tokio::spawn(async move { other.cancelled().await });
    s.trigger();
    s.trigger();
    waiter.await.unwrap();

    assert!(s.is_triggered());
    assert_eq!(s.state(), LifecycleState::ShuttingDown);
    // Level-triggered: late waiters resolve immediately.
    tokio::time::timeout(Duration::from_millis(50), s.cancelled())
        .await
        .expect("cancelled() must resolve after trigger");
}

#[tokio::test]
async fn end_to_end_scrape_and_shutdown() {
    let src = Arc::new(FakeSource::healthy());
    let (addr, state, shutdown, task) = start(test_config(100, 200), src.clone()).await;

    tokio::time::sleep(Duration::from_millis(350)).await;

    let (status, head, body) = http_get(addr, "/metrics").await;
    assert_eq!(status, 200);
    assert!(head
        .to_ascii_lowercase()
        .contains("content-type: text/plain; version=0.0.4; charset=utf-8"));
    assert!(sample_value(&body, "sysprism_ticks_total").unwrap() >= 3.0, "body={body}");
    assert!(body.contains("system_cpu_core_usage_percent{core=\"1\"} 15"));
    assert!(body.contains("system_disk_total_bytes{mount=\"/\",device=\"/dev/sda1\"} 1000000"));

    let (status, _, _) = http_get(addr, "/readyz").await;
    assert_eq!(status, 200);

    let started = Instant::now();
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("run must return")
        .unwrap()
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(200 + 300));
    assert!(state.is_draining());

    let stopped_at = src.cpu_calls();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(src.cpu_calls(), stopped_at, "tick started after shutdown");

    assert!(TcpStream::connect(addr).await.is_err(), "listener still accepting");
}

#[tokio::test]
async fn index_links_to_metrics_path_and_unknown_is_404() {
    let mut cfg = test_config(1000, 200);
    cfg.exporter.metrics_path = "/probe/metrics".into();
    let (addr, _state, shutdown, task) = start(cfg, Arc::new(FakeSource::healthy())).await;

    let (status, head, body) = http_get(addr, "/").await;
    assert_eq!(status, 200);
    assert!(head.to_ascii_lowercase().contains("content-type: text/html"));
    assert!(body.contains("<a href=\"/probe/metrics\">Metrics</a>"));

    let (status, _, _) = http_get(addr, "/probe/metrics").await;
    assert_eq!(status, 200);
    let (status, _, _) = http_get(addr, "/metrics").await;
    assert_eq!(status, 404);
    let (status, _, body) = http_get(addr, "/healthz").await;
    assert_eq!((status, body.as_str()), (200, "ok"));

    shutdown.trigger();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn empty_registry_renders_empty_body() {
    // Series are registered but no sampler ever writes them.
    let state = AppState::new(test_config(60_000, 200)).unwrap();
    let app = sysprism_exporter::router::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let (status, _, body) = http_get(addr, "/metrics").await;
    assert_eq!(status, 200);
    assert_eq!(body, "");
    server.abort();
}

#[tokio::test]
async fn metrics_requests_are_counted() {
    let state = AppState::new(test_config(60_000, 200)).unwrap();
    let app = sysprism_exporter::router::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    http_get(addr, "/metrics").await;
    http_get(addr, "/healthz").await;
    let (_, _, body) = http_get(addr, "/metrics").await;
    assert_eq!(
        sample_value(&body, "sysprism_scrape_requests_total{code=\"200\"}"),
        Some(1.0),
        "body={body}"
    );
    assert!(body.contains("# TYPE sysprism_scrape_requests_total counter"));

    let (_, _, body) = http_get(addr, "/metrics").await;
    assert_eq!(
        sample_value(&body, "sysprism_scrape_requests_total{code=\"200\"}"),
        Some(2.0)
    );
    server.abort();
}

#[tokio::test]
async fn stalled_request_is_abandoned_after_grace() {
    let src = Arc::new(FakeSource::healthy());
    let (addr, _state, shutdown, task) = start(test_config(100, 200), src).await;

    // Half-written request keeps a connection in flight.
    let mut stalled = TcpStream::connect(addr).await.unwrap();
    stalled
        .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("run must return within the grace period")
        .unwrap()
        .unwrap();
    let elapsed = started.elapsed();
    // The half-open connection holds the drain until the grace deadline.
    assert!(elapsed >= Duration::from_millis(200), "elapsed={elapsed:?}");
    assert!(elapsed < Duration::from_millis(200 + 300), "elapsed={elapsed:?}");
    drop(stalled);
}

#[tokio::test]
async fn readyz_reports_draining() {
    let state = AppState::new(test_config(1000, 200)).unwrap();
    let app = sysprism_exporter::router::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    state.set_draining();
    let (status, _, body) = http_get(addr, "/readyz").await;
    assert_eq!((status, body.as_str()), (503, "draining"));
    server.abort();
}

#[tokio::test]
async fn bind_failure_is_listener_start_error() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut cfg = test_config(1000, 200);
    cfg.exporter.port = taken.local_addr().unwrap().port();

    let state = AppState::new(cfg).unwrap();
    let err = lifecycle::bind(&state).await.expect_err("port in use");
    assert_eq!(err.code().as_str(), "LISTENER_START");
}
