//! sysPrism exporter library entry.
//!
//! This crate wires the host probe, the periodic sampler, the HTTP
//! endpoints, and the shutdown coordinator around one registry. It is
//! intended to be consumed by the binary (`main.rs`) and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod lifecycle;
pub mod ops;
pub mod router;
pub mod sampler;
pub mod source;
