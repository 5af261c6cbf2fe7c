//! sysPrism core: metrics registry, exposition encoding, and error types.
//!
//! This crate defines the data model shared by the exporter and its tests.
//! It intentionally carries no runtime or HTTP dependencies so the registry
//! can be exercised without a tokio runtime.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Label arity and registration mistakes surface as `SysPrismError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod registry;

/// Shared result type.
pub use error::{ErrorCode, Result, SysPrismError};
pub use registry::{MetricKind, Registry, SeriesHandle};
