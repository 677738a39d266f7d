//! Device configuration
//!
//! A `DeviceConfig` is built once at startup and validated when the device
//! is registered. The defaults reproduce the observed three-access-point
//! device: 32-byte chunks, unbounded queues, remainder of a short read
//! dropped.

use crate::error::{DeviceError, Result};

/// Largest chunk accepted by a single write unless configured otherwise
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 32;

/// Upper bound accepted for `max_chunk_size`
pub const MAX_CHUNK_SIZE_LIMIT: usize = 1 << 20;

/// Name used when registering the device's access points
pub const DEFAULT_DEVICE_NAME: &str = "chunkdev";

/// Which device variant to expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// One access point, one queue shared by every caller
    Single,
    /// Three access points (write, non-destructive read, destructive read),
    /// one private queue per caller identity
    #[default]
    Multi,
}

impl Variant {
    /// Number of access points the variant registers
    #[must_use]
    pub fn access_points(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Multi => 3,
        }
    }
}

/// What a write does when the queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail with `DeviceError::ResourceExhausted`
    #[default]
    Reject,
    /// Wait until a destructive read frees a slot
    Block,
}

/// What happens to the unread tail of a chunk larger than the read length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// Discard the tail; chunk boundaries are preserved
    #[default]
    Drop,
    /// Keep the tail as the new head chunk; no bytes are lost
    Requeue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    pub variant: Variant,
    pub max_chunk_size: usize,
    /// Maximum number of queued chunks per queue, `None` for unbounded
    pub capacity: Option<usize>,
    pub overflow: OverflowPolicy,
    pub remainder: RemainderPolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            variant: Variant::default(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            capacity: None,
            overflow: OverflowPolicy::default(),
            remainder: RemainderPolicy::default(),
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn single() -> Self {
        Self::default().with_variant(Variant::Single)
    }

    #[must_use]
    pub fn multi() -> Self {
        Self::default().with_variant(Variant::Multi)
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    #[must_use]
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize, overflow: OverflowPolicy) -> Self {
        self.capacity = Some(capacity);
        self.overflow = overflow;
        self
    }

    #[must_use]
    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    /// Check the configuration before any access point is registered
    ///
    /// # Errors
    /// `InitializationFailure` for an empty name, a chunk size of zero or
    /// above `MAX_CHUNK_SIZE_LIMIT`, or a zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DeviceError::InitializationFailure(
                "device name is empty".to_string(),
            ));
        }
        if self.max_chunk_size == 0 {
            return Err(DeviceError::InitializationFailure(
                "max_chunk_size must be positive".to_string(),
            ));
        }
        if self.max_chunk_size > MAX_CHUNK_SIZE_LIMIT {
            return Err(DeviceError::InitializationFailure(format!(
                "max_chunk_size {} exceeds {MAX_CHUNK_SIZE_LIMIT}",
                self.max_chunk_size
            )));
        }
        if self.capacity == Some(0) {
            return Err(DeviceError::InitializationFailure(
                "capacity must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_device() {
        let config = DeviceConfig::default();
        assert_eq!(config.max_chunk_size, 32);
        assert_eq!(config.capacity, None);
        assert_eq!(config.variant, Variant::Multi);
        assert_eq!(config.remainder, RemainderPolicy::Drop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_access_point_count() {
        assert_eq!(Variant::Single.access_points(), 1);
        assert_eq!(Variant::Multi.access_points(), 3);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_chunk = DeviceConfig::default().with_max_chunk_size(0);
        assert!(matches!(
            zero_chunk.validate(),
            Err(DeviceError::InitializationFailure(_))
        ));

        let zero_capacity = DeviceConfig::default().with_capacity(0, OverflowPolicy::Reject);
        assert!(matches!(
            zero_capacity.validate(),
            Err(DeviceError::InitializationFailure(_))
        ));

        let huge_chunk = DeviceConfig::default().with_max_chunk_size(MAX_CHUNK_SIZE_LIMIT + 1);
        assert!(huge_chunk.validate().is_err());
        let largest = DeviceConfig::default().with_max_chunk_size(MAX_CHUNK_SIZE_LIMIT);
        assert!(largest.validate().is_ok());

        let no_name = DeviceConfig::default().with_name("");
        assert!(no_name.validate().is_err());
    }
}
