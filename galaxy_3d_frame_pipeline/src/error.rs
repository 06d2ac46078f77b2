//! Error types for the Galaxy3D frame pipeline
//!
//! Errors surface from device-facing work (offscreen buffer allocation,
//! upload worker start-up) and from registry mutations on unknown targets.
//! Command handlers translate them into failure events instead of
//! propagating them further.

use std::fmt;

/// Result type for frame pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame pipeline errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Graphics device reported a failure (invalid handle, unhealthy device)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Unknown or already released resource, buffer, scene or display
    InvalidResource(String),

    /// Start-up of a device context or worker thread failed
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
