//! Device and channel description records.
//!
//! These are the typed form of what the coordinator returns from
//! `listDevices`/`getDeviceDescription`. Field names follow the coordinator's
//! upper-case keys so records deserialize as delivered. Optional fields are
//! explicit `Option`s: a missing key is represented, never guessed.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::ValidationError;

/// Fields shared by devices and channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EntityDescription {
    pub address: Address,
    #[serde(rename = "TYPE")]
    pub device_type: String,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
    /// Names of the paramsets known to exist for this entity.
    #[serde(default)]
    pub paramsets: Vec<String>,
}

impl EntityDescription {
    #[must_use]
    pub fn declares_paramset(&self, name: &str) -> bool {
        self.paramsets.iter().any(|p| p == name)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.address.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        if self.device_type.is_empty() {
            return Err(ValidationError::EmptyType(self.address.clone()));
        }
        Ok(())
    }
}

/// Link direction of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    None,
    Sender,
    Receiver,
}

/// Descriptive, immutable channel metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ChannelMetadata {
    pub parent_type: Option<String>,
    pub aes_active: Option<bool>,
    pub direction: Option<u8>,
    pub link_source_roles: Option<String>,
    pub link_target_roles: Option<String>,
    pub group: Option<Address>,
    pub team: Option<Address>,
    pub team_tag: Option<String>,
    pub team_channels: Vec<Address>,
}

impl ChannelMetadata {
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self.direction {
            Some(1) => Direction::Sender,
            Some(2) => Direction::Receiver,
            _ => Direction::None,
        }
    }
}

/// Description of one channel of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ChannelDescription {
    #[serde(flatten)]
    pub common: EntityDescription,
    pub parent: Address,
    pub index: u32,
    #[serde(flatten)]
    pub metadata: ChannelMetadata,
}

impl ChannelDescription {
    #[must_use]
    pub fn builder() -> ChannelDescriptionBuilder {
        ChannelDescriptionBuilder::default()
    }
}

/// Descriptive, immutable device metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct DeviceMetadata {
    pub children: Vec<Address>,
    pub rf_address: Option<i64>,
    pub physical_address: Option<i64>,
    pub interface: Option<String>,
    pub roaming: Option<bool>,
    pub rx_mode: Option<u32>,
    pub firmware: Option<String>,
    pub available_firmware: Option<String>,
    pub updatable: Option<bool>,
}

/// Description of a device together with its channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DeviceDescription {
    #[serde(flatten)]
    pub common: EntityDescription,
    #[serde(flatten)]
    pub metadata: DeviceMetadata,
    #[serde(default)]
    pub channels: Vec<ChannelDescription>,
}

impl DeviceDescription {
    #[must_use]
    pub fn builder() -> DeviceDescriptionBuilder {
        DeviceDescriptionBuilder::default()
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when an address or type is empty, a
    /// channel names a different parent, or two channels share an index.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.common.validate()?;
        let mut seen = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            channel.common.validate()?;
            if channel.parent != self.common.address {
                return Err(ValidationError::ParentMismatch {
                    channel: channel.common.address.clone(),
                    parent: channel.parent.clone(),
                    expected: self.common.address.clone(),
                });
            }
            if seen.contains(&channel.index) {
                return Err(ValidationError::DuplicateChannelIndex(channel.index));
            }
            seen.push(channel.index);
        }
        Ok(())
    }
}

/// Step-by-step builder for [`ChannelDescription`].
///
/// Address and parent default to the owning device when the channel is
/// added through [`DeviceDescriptionBuilder::channel`].
#[derive(Debug, Default)]
pub struct ChannelDescriptionBuilder {
    address: Option<Address>,
    parent: Option<Address>,
    index: u32,
    device_type: Option<String>,
    paramsets: Vec<String>,
    metadata: ChannelMetadata,
}

impl ChannelDescriptionBuilder {
    #[must_use]
    pub fn address(mut self, address: impl Into<Address>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: impl Into<Address>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    #[must_use]
    pub fn paramset(mut self, name: impl Into<String>) -> Self {
        self.paramsets.push(name.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: ChannelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    fn build_for(self, device: &Address) -> ChannelDescription {
        ChannelDescription {
            common: EntityDescription {
                address: self.address.unwrap_or_else(|| device.channel(self.index)),
                device_type: self.device_type.unwrap_or_default(),
                family: None,
                flags: 0,
                id: None,
                version: None,
                paramsets: self.paramsets,
            },
            parent: self.parent.unwrap_or_else(|| device.clone()),
            index: self.index,
            metadata: self.metadata,
        }
    }
}

/// Step-by-step builder for [`DeviceDescription`].
#[derive(Debug, Default)]
pub struct DeviceDescriptionBuilder {
    address: Option<Address>,
    device_type: Option<String>,
    family: Option<String>,
    version: Option<u32>,
    paramsets: Vec<String>,
    metadata: DeviceMetadata,
    channels: Vec<ChannelDescriptionBuilder>,
}

impl DeviceDescriptionBuilder {
    #[must_use]
    pub fn address(mut self, address: impl Into<Address>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    #[must_use]
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn paramset(mut self, name: impl Into<String>) -> Self {
        self.paramsets.push(name.into());
        self
    }

    #[must_use]
    pub fn firmware(mut self, firmware: impl Into<String>) -> Self {
        self.metadata.firmware = Some(firmware.into());
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: ChannelDescriptionBuilder) -> Self {
        self.channels.push(channel);
        self
    }

    /// Consume the builder, validate, and return a [`DeviceDescription`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the assembled record is invalid.
    pub fn build(self) -> Result<DeviceDescription, ValidationError> {
        let address = self.address.unwrap_or_else(|| Address::new(""));
        let channels: Vec<_> = self
            .channels
            .into_iter()
            .map(|c| c.build_for(&address))
            .collect();
        let mut metadata = self.metadata;
        if metadata.children.is_empty() {
            metadata.children = channels.iter().map(|c| c.common.address.clone()).collect();
        }
        let description = DeviceDescription {
            common: EntityDescription {
                address,
                device_type: self.device_type.unwrap_or_default(),
                family: self.family,
                flags: 0,
                id: None,
                version: self.version,
                paramsets: self.paramsets,
            },
            metadata,
            channels,
        };
        description.validate()?;
        Ok(description)
    }
}
