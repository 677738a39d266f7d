//! Access-point registration
//!
//! Binding access points to device nodes is done by the host environment.
//! The device only needs a place to announce its name and how many access
//! points it serves, and to withdraw them at teardown.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Host-side registration point for device access points
pub trait Registrar {
    /// Reserve `access_points` consecutive indices under `name`
    ///
    /// # Errors
    /// A human-readable reason when the host refuses the registration.
    fn register(&mut self, name: &str, access_points: u32) -> Result<(), String>;

    /// Release the indices reserved under `name`
    fn unregister(&mut self, name: &str);
}

/// In-memory registrar
///
/// Keeps a name → access point count table and refuses duplicate names.
/// Useful for tests and for running the device inside one process.
#[derive(Debug, Default)]
pub struct MemRegistrar {
    devices: Mutex<HashMap<String, u32>>,
}

impl MemRegistrar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access point count registered under `name`
    #[must_use]
    pub fn access_points(&self, name: &str) -> Option<u32> {
        self.devices.lock().get(name).copied()
    }
}

impl Registrar for MemRegistrar {
    fn register(&mut self, name: &str, access_points: u32) -> Result<(), String> {
        let mut devices = self.devices.lock();
        if devices.contains_key(name) {
            return Err(format!("device name '{name}' is already registered"));
        }
        devices.insert(name.to_string(), access_points);
        Ok(())
    }

    fn unregister(&mut self, name: &str) {
        if self.devices.lock().remove(name).is_none() {
            log::warn!("registrar: unregister of unknown device '{name}'");
        }
    }
}
