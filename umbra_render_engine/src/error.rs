//! Error types for the Umbra engine
//!
//! One enum covers the whole engine. The variants fall into three
//! groups with different handling:
//! - fatal setup failures (`InitializationFailed`, `BackendError`,
//!   `OutOfMemory`, `InvalidResource`) propagate to the caller and
//!   abort initialization,
//! - programmer errors against the binding contract (`BindingContract`)
//!   are reported at setup time, never deferred to draw time,
//! - `SurfaceOutdated` is the one retryable condition and feeds the
//!   swapchain rebuild path instead of failing the frame.

use std::fmt;

/// Result type for Umbra engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Umbra engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory, or a statically sized pool is exhausted
    OutOfMemory,

    /// Invalid resource or invalid use of a resource (buffer, shader, pass...)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, pipeline creation)
    InitializationFailed(String),

    /// A resource was bound to an undeclared slot, to a slot of the
    /// wrong kind, or a renderable was finalized with unfilled slots
    BindingContract(String),

    /// The presentation surface no longer matches the swapchain.
    /// Recovered by rebuilding the swapchain and skipping the frame.
    SurfaceOutdated,
}

impl Error {
    /// Whether this error is recovered locally by the swapchain rebuild
    /// protocol rather than propagated as a failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SurfaceOutdated)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::BindingContract(msg) => write!(f, "Binding contract violation: {}", msg),
            Error::SurfaceOutdated => write!(f, "Presentation surface out of date"),
        }
    }
}

impl std::error::Error for Error {}

/// Build a logged `Error::BackendError` value
///
/// Logs the message through the engine logger and evaluates to the
/// error value, for use in `map_err` or `Err(...)` positions.
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::engine_error!($source, "{}", msg);
        $crate::umbra::Error::BackendError(msg)
    }};
}

/// Log an error message and return it from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
