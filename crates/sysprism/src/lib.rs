//! Top-level facade crate for sysPrism.
//!
//! Re-exports the registry/error core and the exporter library so users can
//! depend on a single crate.

pub mod core {
    pub use sysprism_core::*;
}

pub mod exporter {
    pub use sysprism_exporter::*;
}
