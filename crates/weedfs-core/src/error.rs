//! Error types module
//!
//! All failures of the weedfs client are expressed as `WeedError`. Each variant
//! describes itself through the `ErrorMetadata` trait (stable code, whether a
//! retry can help, and the level it should be logged at) so callers can make
//! decisions without matching on message text.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like an unknown volume
    Debug,
    /// Warning level - for remote refusals the caller may act on
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Self-description of an error, independent of its message.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "ASSIGNMENT_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same call later may succeed
    fn is_retryable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeedError {
    #[error("Invalid file id: {0}")]
    InvalidIdentifier(String),

    #[error("Assign failed: {message}")]
    AssignmentFailed { message: String, retryable: bool },

    #[error("Volume lookup failed: {message}")]
    ResolutionFailed { message: String, retryable: bool },

    #[error("No location available for volume {0}")]
    NoLocationAvailable(String),

    #[error("Remote error: {0}")]
    RemoteBusinessError(String),

    #[error("Transport error: {message}")]
    Transport { message: String, retryable: bool },

    #[error("Filer error: {0}")]
    Filer(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WeedError {
    pub fn assignment(message: impl Into<String>) -> Self {
        WeedError::AssignmentFailed {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        WeedError::ResolutionFailed {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        WeedError::Transport {
            message: message.into(),
            retryable,
        }
    }

    /// Re-classify a transport failure that happened while talking to the master
    /// during an assign call. The retry hint is preserved.
    pub fn into_assignment(self) -> Self {
        match self {
            WeedError::Transport { message, retryable } => {
                WeedError::AssignmentFailed { message, retryable }
            }
            WeedError::AssignmentFailed { .. } => self,
            other => WeedError::assignment(other.to_string()),
        }
    }

    /// Same as [`WeedError::into_assignment`] for volume lookups.
    pub fn into_resolution(self) -> Self {
        match self {
            WeedError::Transport { message, retryable } => {
                WeedError::ResolutionFailed { message, retryable }
            }
            WeedError::ResolutionFailed { .. } | WeedError::NoLocationAvailable(_) => self,
            other => WeedError::resolution(other.to_string()),
        }
    }
}

/// Static metadata for each variant: (error_code, retryable, log_level).
fn weed_error_static_metadata(err: &WeedError) -> (&'static str, bool, LogLevel) {
    match err {
        WeedError::InvalidIdentifier(_) => ("INVALID_IDENTIFIER", false, LogLevel::Debug),
        WeedError::AssignmentFailed { retryable, .. } => {
            ("ASSIGNMENT_FAILED", *retryable, LogLevel::Error)
        }
        WeedError::ResolutionFailed { retryable, .. } => {
            ("RESOLUTION_FAILED", *retryable, LogLevel::Error)
        }
        WeedError::NoLocationAvailable(_) => ("NO_LOCATION_AVAILABLE", false, LogLevel::Debug),
        WeedError::RemoteBusinessError(_) => ("REMOTE_BUSINESS_ERROR", false, LogLevel::Warn),
        WeedError::Transport { retryable, .. } => ("TRANSPORT_ERROR", *retryable, LogLevel::Error),
        WeedError::Filer(_) => ("FILER_ERROR", false, LogLevel::Warn),
        WeedError::Config(_) => ("CONFIG_ERROR", false, LogLevel::Error),
    }
}

impl ErrorMetadata for WeedError {
    fn error_code(&self) -> &'static str {
        weed_error_static_metadata(self).0
    }

    fn is_retryable(&self) -> bool {
        weed_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        weed_error_static_metadata(self).2
    }
}

impl From<serde_json::Error> for WeedError {
    fn from(err: serde_json::Error) -> Self {
        WeedError::RemoteBusinessError(format!("Unparsable response body: {}", err))
    }
}

pub type WeedResult<T> = Result<T, WeedError>;
