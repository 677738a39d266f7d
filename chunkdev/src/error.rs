//! Error types for device operations
//!
//! Every failure is reported synchronously to the caller of the failing
//! operation. An empty queue is not an error: reads return `Ok(0)`.

use thiserror::Error;

use crate::dispatch::AccessMode;

/// Result type alias for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Operation attempted on a session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Access-point index outside the configured range
    #[error("no access point with index {index}")]
    NotFound { index: u32 },

    /// Read on a write-only session, or write on a read-only one
    #[error("{op} is not permitted on a {mode} session")]
    InvalidOperation { mode: AccessMode, op: Operation },

    /// The byte transfer across the caller boundary failed
    #[error("transfer fault: {uncopied} byte(s) could not be copied")]
    TransferFault { uncopied: usize },

    /// Queue is at capacity and the overflow policy rejects the write, or a
    /// chunk of `capacity` bytes could not be allocated
    #[error("resource exhausted (limit {capacity})")]
    ResourceExhausted { capacity: usize },

    /// Registration or configuration failure at startup
    #[error("initialization failed: {0}")]
    InitializationFailure(String),
}

const ENXIO: i32 = 6;
const EBADF: i32 = 9;
const EFAULT: i32 = 14;
const EINVAL: i32 = 22;
const ENOSPC: i32 = 28;

impl DeviceError {
    /// Positive errno value for device-callback style reporting
    ///
    /// Callbacks conventionally return the negated value.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound { .. } => ENXIO,
            Self::InvalidOperation { .. } => EBADF,
            Self::TransferFault { .. } => EFAULT,
            Self::ResourceExhausted { .. } => ENOSPC,
            Self::InitializationFailure(_) => EINVAL,
        }
    }
}

impl embedded_io::Error for DeviceError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::NotFound { .. } => embedded_io::ErrorKind::NotFound,
            Self::InvalidOperation { .. } => embedded_io::ErrorKind::PermissionDenied,
            Self::TransferFault { .. } => embedded_io::ErrorKind::InvalidInput,
            Self::ResourceExhausted { .. } => embedded_io::ErrorKind::OutOfMemory,
            Self::InitializationFailure(_) => embedded_io::ErrorKind::Other,
        }
    }
}
