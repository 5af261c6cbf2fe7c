//! Shared error type across sysPrism crates.

use thiserror::Error;

/// Stable error codes (used in logs and by tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A host probe failed for one category in one tick.
    SampleFailed,
    /// Series registered twice with a different shape.
    DuplicateSeries,
    /// Handle belongs to a different registry.
    ForeignSeries,
    /// Label values do not match the series' label keys.
    LabelArity,
    /// Metric or label name is not a valid exposition identifier.
    InvalidName,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// HTTP listener could not be bound.
    ListenerStart,
    /// HTTP listener failed while draining.
    ShutdownDrain,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SampleFailed => "SAMPLE_FAILED",
            ErrorCode::DuplicateSeries => "DUPLICATE_SERIES",
            ErrorCode::ForeignSeries => "FOREIGN_SERIES",
            ErrorCode::LabelArity => "LABEL_ARITY",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::ListenerStart => "LISTENER_START",
            ErrorCode::ShutdownDrain => "SHUTDOWN_DRAIN",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SysPrismError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum SysPrismError {
    #[error("{category} sample failed: {reason}")]
    Sample {
        category: &'static str,
        reason: String,
    },
    #[error("series {name} already registered with a different kind or label keys")]
    DuplicateSeries { name: String },
    #[error("series {name} is not registered in this registry")]
    ForeignSeries { name: String },
    #[error("series {name} expects {expected} label values, got {got}")]
    LabelArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("bad config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("listener start failed: {0}")]
    ListenerStart(String),
    #[error("shutdown drain failed: {0}")]
    ShutdownDrain(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SysPrismError {
    /// Shorthand for a transient probe failure.
    pub fn sample(category: &'static str, reason: impl Into<String>) -> Self {
        SysPrismError::Sample {
            category,
            reason: reason.into(),
        }
    }

    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SysPrismError::Sample { .. } => ErrorCode::SampleFailed,
            SysPrismError::DuplicateSeries { .. } => ErrorCode::DuplicateSeries,
            SysPrismError::ForeignSeries { .. } => ErrorCode::ForeignSeries,
            SysPrismError::LabelArity { .. } => ErrorCode::LabelArity,
            SysPrismError::InvalidName(_) => ErrorCode::InvalidName,
            SysPrismError::Config(_) => ErrorCode::BadConfig,
            SysPrismError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            SysPrismError::ListenerStart(_) => ErrorCode::ListenerStart,
            SysPrismError::ShutdownDrain(_) => ErrorCode::ShutdownDrain,
            SysPrismError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Registration errors are wiring bugs and must stop startup.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            SysPrismError::DuplicateSeries { .. }
                | SysPrismError::ForeignSeries { .. }
                | SysPrismError::LabelArity { .. }
                | SysPrismError::InvalidName(_)
        )
    }
}
