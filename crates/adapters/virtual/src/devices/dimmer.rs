//! Virtual dimmer actuator.

use hmbridge_domain::address::Address;
use hmbridge_domain::description::{ChannelDescription, ChannelMetadata, DeviceDescription};
use hmbridge_domain::error::ValidationError;
use hmbridge_domain::node::{DeviceProfile, NodeKind, NodeLocator};
use hmbridge_domain::value::{PARAMSET_MASTER, PARAMSET_VALUES};

use super::{
    READ_EVENT, READ_WRITE, READ_WRITE_EVENT, Seed, VirtualParamset, device_values,
    maintenance_channel, maintenance_values,
};

/// A simulated single-channel dimmer; `LEVEL` ranges from `0.0` to `1.0`.
pub struct VirtualDimmer {
    address: Address,
}

impl Default for VirtualDimmer {
    fn default() -> Self {
        Self::new("VDM0000001")
    }
}

impl VirtualDimmer {
    pub const DEVICE_TYPE: &'static str = "HM-LC-Dim1T-Pl";

    #[must_use]
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Produce the description record.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<DeviceDescription, ValidationError> {
        DeviceDescription::builder()
            .address(self.address.clone())
            .device_type(Self::DEVICE_TYPE)
            .family("rf")
            .version(2)
            .firmware("2.3")
            .paramset(PARAMSET_MASTER)
            .paramset(PARAMSET_VALUES)
            .channel(maintenance_channel())
            .channel(
                ChannelDescription::builder()
                    .index(1)
                    .device_type("DIMMER")
                    .paramset(PARAMSET_MASTER)
                    .paramset(PARAMSET_VALUES)
                    .metadata(ChannelMetadata {
                        direction: Some(2),
                        parent_type: Some(Self::DEVICE_TYPE.to_string()),
                        ..ChannelMetadata::default()
                    }),
            )
            .build()
    }

    /// Catalog profile for [`Self::DEVICE_TYPE`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn profile() -> Result<DeviceProfile, ValidationError> {
        DeviceProfile::builder()
            .node(NodeKind::Sensor, "LEVEL", NodeLocator::Fixed(1))
            .node(NodeKind::Write, "LEVEL", NodeLocator::Fixed(1))
            .node(NodeKind::Attribute, "WORKING", NodeLocator::Fixed(1))
            .build()
    }

    pub(crate) fn seeds(&self) -> Vec<Seed> {
        let channel = self.address.channel(1);
        vec![
            device_values(&self.address, -58),
            Seed::new(
                self.address.clone(),
                PARAMSET_MASTER,
                VirtualParamset::default().param("LOCAL_RESET_DISABLE", false, READ_WRITE),
            ),
            maintenance_values(&self.address),
            Seed::new(
                self.address.channel(0),
                PARAMSET_MASTER,
                VirtualParamset::default().param("TRANSMIT_TRY_MAX", 6, READ_WRITE),
            ),
            Seed::new(
                channel.clone(),
                PARAMSET_VALUES,
                VirtualParamset::default()
                    .param("LEVEL", 0.0, READ_WRITE_EVENT)
                    .param("WORKING", false, READ_EVENT)
                    .param("DIRECTION", 0, READ_EVENT),
            ),
            Seed::new(
                channel,
                PARAMSET_MASTER,
                VirtualParamset::default()
                    .param("RAMP_TIME", 0.5, READ_WRITE)
                    .param("ON_LEVEL", 1.0, READ_WRITE),
            ),
        ]
    }
}
