//! Access-point dispatch
//!
//! The mode of a session is chosen once, at open time, from the access-point
//! index, and never changes. Reads and writes are routed by matching on it.

use std::fmt;

use crate::config::Variant;
use crate::error::{DeviceError, Operation, Result};

/// What an open session may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Index 0 of the multi variant
    WriteOnly,
    /// Index 1 of the multi variant, reads through the session cursor
    NonDestructiveReadOnly,
    /// Index 2 of the multi variant, reads pop the head chunk
    DestructiveReadOnly,
    /// The single variant's only access point: write and destructive read
    ReadWrite,
}

impl AccessMode {
    /// Select the mode for an access-point index
    ///
    /// The single variant ignores the index.
    ///
    /// # Errors
    /// `NotFound` for an index outside 0..=2 in the multi variant.
    pub fn for_index(variant: Variant, index: u32) -> Result<Self> {
        match variant {
            Variant::Single => Ok(Self::ReadWrite),
            Variant::Multi => match index {
                0 => Ok(Self::WriteOnly),
                1 => Ok(Self::NonDestructiveReadOnly),
                2 => Ok(Self::DestructiveReadOnly),
                _ => Err(DeviceError::NotFound { index }),
            },
        }
    }

    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    #[must_use]
    pub fn can_read(self) -> bool {
        !matches!(self, Self::WriteOnly)
    }

    /// Fail with `InvalidOperation` unless `op` is allowed in this mode
    pub(crate) fn check(self, op: Operation) -> Result<()> {
        let allowed = match op {
            Operation::Read => self.can_read(),
            Operation::Write => self.can_write(),
        };
        if allowed {
            Ok(())
        } else {
            Err(DeviceError::InvalidOperation { mode: self, op })
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WriteOnly => "write-only",
            Self::NonDestructiveReadOnly => "non-destructive-read",
            Self::DestructiveReadOnly => "destructive-read",
            Self::ReadWrite => "read-write",
        };
        f.write_str(name)
    }
}
