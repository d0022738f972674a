//! Device-type catalog: `TYPE` to [`DeviceProfile`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::node::DeviceProfile;

/// Static per-type configuration, keyed by the description's `TYPE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceCatalog {
    profiles: HashMap<String, DeviceProfile>,
}

impl DeviceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the profile for `device_type`.
    pub fn insert(&mut self, device_type: impl Into<String>, profile: DeviceProfile) {
        self.profiles.insert(device_type.into(), profile);
    }

    #[must_use]
    pub fn with(mut self, device_type: impl Into<String>, profile: DeviceProfile) -> Self {
        self.insert(device_type, profile);
        self
    }

    #[must_use]
    pub fn get(&self, device_type: &str) -> Option<&DeviceProfile> {
        self.profiles.get(device_type)
    }

    /// Profile for `device_type`, or the default profile for unknown types.
    #[must_use]
    pub fn profile_for(&self, device_type: &str) -> DeviceProfile {
        self.get(device_type).cloned().unwrap_or_default()
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: Self) {
        self.profiles.extend(other.profiles);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Validate every profile.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, together with the
    /// offending device type.
    pub fn validate(&self) -> Result<(), (String, ValidationError)> {
        for (device_type, profile) in &self.profiles {
            profile
                .validate()
                .map_err(|err| (device_type.clone(), err))?;
        }
        Ok(())
    }
}
