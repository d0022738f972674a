//! Node indirection tables.
//!
//! A device type declares, for every data point a consumer may ask for,
//! which entity actually serves it: the device itself, a channel chosen by
//! the caller, or one fixed channel. These tables are static per device type
//! and come from configuration (see [`DeviceCatalog`](crate::catalog::DeviceCatalog)).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::PARAM_RSSI_DEVICE;

/// Where a named data point lives.
///
/// In configuration files locators are written as `"self"`, `"dynamic"` or
/// `{ fixed = 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLocator {
    /// Read/write against the device's own address.
    #[serde(rename = "self")]
    Device,
    /// Use the channel index supplied by the caller.
    Dynamic,
    /// Always use this channel index.
    Fixed(u32),
}

/// Which of the four node tables a lookup uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Sensor,
    Binary,
    Attribute,
    Write,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor => f.write_str("sensor"),
            Self::Binary => f.write_str("binary"),
            Self::Attribute => f.write_str("attribute"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Mapping from parameter name to locator.
pub type NodeTable = HashMap<String, NodeLocator>;

/// The four node tables of a device type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTables {
    pub sensor: NodeTable,
    pub binary: NodeTable,
    pub attribute: NodeTable,
    pub write: NodeTable,
}

impl NodeTables {
    #[must_use]
    pub fn table(&self, kind: NodeKind) -> &NodeTable {
        match kind {
            NodeKind::Sensor => &self.sensor,
            NodeKind::Binary => &self.binary,
            NodeKind::Attribute => &self.attribute,
            NodeKind::Write => &self.write,
        }
    }

    #[must_use]
    pub fn locate(&self, kind: NodeKind, name: &str) -> Option<NodeLocator> {
        self.table(kind).get(name).copied()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &NodeLocator)> {
        self.sensor
            .iter()
            .chain(&self.binary)
            .chain(&self.attribute)
            .chain(&self.write)
    }
}

/// Static configuration of one device type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Number of structurally equivalent sibling functions (e.g. the two
    /// relays of a dual switch actuator).
    pub element_count: u32,
    #[serde(flatten)]
    pub nodes: NodeTables,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            element_count: 1,
            nodes: NodeTables::default(),
        }
    }
}

impl DeviceProfile {
    #[must_use]
    pub fn builder() -> DeviceProfileBuilder {
        DeviceProfileBuilder::default()
    }

    /// Check the profile invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroElementCount`] or
    /// [`ValidationError::FixedChannelZero`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.element_count == 0 {
            return Err(ValidationError::ZeroElementCount);
        }
        if let Some((name, _)) = self
            .nodes
            .iter()
            .find(|(_, locator)| **locator == NodeLocator::Fixed(0))
        {
            return Err(ValidationError::FixedChannelZero(name.clone()));
        }
        Ok(())
    }

    /// Node tables as used by a device: the profile's tables, with
    /// `RSSI_DEVICE` served by the device itself unless mapped elsewhere.
    #[must_use]
    pub fn effective_nodes(&self) -> NodeTables {
        let mut nodes = self.nodes.clone();
        nodes
            .attribute
            .entry(PARAM_RSSI_DEVICE.to_string())
            .or_insert(NodeLocator::Device);
        nodes
    }
}

/// Step-by-step builder for [`DeviceProfile`].
#[derive(Debug, Default)]
pub struct DeviceProfileBuilder {
    element_count: Option<u32>,
    nodes: NodeTables,
}

impl DeviceProfileBuilder {
    #[must_use]
    pub fn element_count(mut self, count: u32) -> Self {
        self.element_count = Some(count);
        self
    }

    #[must_use]
    pub fn node(mut self, kind: NodeKind, name: impl Into<String>, locator: NodeLocator) -> Self {
        let table = match kind {
            NodeKind::Sensor => &mut self.nodes.sensor,
            NodeKind::Binary => &mut self.nodes.binary,
            NodeKind::Attribute => &mut self.nodes.attribute,
            NodeKind::Write => &mut self.nodes.write,
        };
        table.insert(name.into(), locator);
        self
    }

    /// Consume the builder, validate, and return a [`DeviceProfile`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the profile is invalid.
    pub fn build(self) -> Result<DeviceProfile, ValidationError> {
        let profile = DeviceProfile {
            element_count: self.element_count.unwrap_or(1),
            nodes: self.nodes,
        };
        profile.validate()?;
        Ok(profile)
    }
}
