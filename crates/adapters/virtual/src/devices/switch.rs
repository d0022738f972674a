//! Virtual two-channel switch actuator.

use hmbridge_domain::address::Address;
use hmbridge_domain::description::{ChannelDescription, ChannelMetadata, DeviceDescription};
use hmbridge_domain::error::ValidationError;
use hmbridge_domain::node::{DeviceProfile, NodeKind, NodeLocator};
use hmbridge_domain::value::{PARAMSET_MASTER, PARAMSET_VALUES};

use super::{
    READ_EVENT, READ_WRITE, READ_WRITE_EVENT, Seed, VirtualParamset, device_values, maintenance_channel,
    maintenance_values,
};

const RELAYS: [u32; 2] = [1, 2];

/// A simulated actuator with two independent relays on channels 1 and 2.
///
/// `STATE` is resolved dynamically, so the caller picks the relay.
pub struct VirtualSwitch {
    address: Address,
}

impl Default for VirtualSwitch {
    fn default() -> Self {
        Self::new("VSW0000001")
    }
}

impl VirtualSwitch {
    pub const DEVICE_TYPE: &'static str = "HM-LC-Sw2-FM";

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
        let receiver = ChannelMetadata {
            direction: Some(2),
            parent_type: Some(Self::DEVICE_TYPE.to_string()),
            ..ChannelMetadata::default()
        };
        RELAYS
            .iter()
            .fold(
                DeviceDescription::builder()
                    .address(self.address.clone())
                    .device_type(Self::DEVICE_TYPE)
                    .family("rf")
                    .version(1)
                    .firmware("2.8")
                    .paramset(PARAMSET_MASTER)
                    .paramset(PARAMSET_VALUES)
                    .channel(maintenance_channel()),
                |builder, index| {
                    builder.channel(
                        ChannelDescription::builder()
                            .index(*index)
                            .device_type("SWITCH")
                            .paramset(PARAMSET_MASTER)
                            .paramset(PARAMSET_VALUES)
                            .metadata(receiver.clone()),
                    )
                },
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
            .element_count(2)
            .node(NodeKind::Binary, "STATE", NodeLocator::Dynamic)
            .node(NodeKind::Write, "STATE", NodeLocator::Dynamic)
            .node(NodeKind::Attribute, "WORKING", NodeLocator::Dynamic)
            .build()
    }

    pub(crate) fn seeds(&self) -> Vec<Seed> {
        let mut seeds = vec![
            device_values(&self.address, -65),
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
        ];
        for index in RELAYS {
            let channel = self.address.channel(index);
            seeds.push(Seed::new(
                channel.clone(),
                PARAMSET_VALUES,
                VirtualParamset::default()
                    .param("STATE", false, READ_WRITE_EVENT)
                    .param("WORKING", false, READ_EVENT),
            ));
            seeds.push(Seed::new(
                channel,
                PARAMSET_MASTER,
                VirtualParamset::default().param("POWERUP_ACTION", 0, READ_WRITE),
            ));
        }
        seeds
    }
}
