//! Coordinator addresses for devices and their channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between a device address and a channel index (`ABC0001:1`).
pub const CHANNEL_SEPARATOR: char = ':';

/// Address of a device (`ABC0001`) or one of its channels (`ABC0001:1`).
///
/// Addresses are assigned by the coordinator and never change for the
/// lifetime of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Build the address of channel `index` of the device at `self`.
    #[must_use]
    pub fn channel(&self, index: u32) -> Self {
        Self(format!("{}{CHANNEL_SEPARATOR}{index}", self.device_part()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The device portion, i.e. everything before the channel separator.
    #[must_use]
    pub fn device_part(&self) -> &str {
        self.0
            .split_once(CHANNEL_SEPARATOR)
            .map_or(self.0.as_str(), |(device, _)| device)
    }

    /// The channel index suffix, if this is a well-formed channel address.
    #[must_use]
    pub fn channel_index(&self) -> Option<u32> {
        self.0
            .split_once(CHANNEL_SEPARATOR)
            .and_then(|(_, index)| index.parse().ok())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Address {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
