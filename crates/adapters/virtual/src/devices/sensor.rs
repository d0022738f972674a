//! Virtual temperature/humidity sensor.

use hmbridge_domain::address::Address;
use hmbridge_domain::description::{ChannelDescription, ChannelMetadata, DeviceDescription};
use hmbridge_domain::error::ValidationError;
use hmbridge_domain::node::{DeviceProfile, NodeKind, NodeLocator};
use hmbridge_domain::value::{PARAMSET_MASTER, PARAMSET_VALUES};

use super::{
    READ_EVENT, READ_WRITE, Seed, VirtualParamset, device_values, maintenance_channel,
    maintenance_values,
};

/// A simulated climate sensor reporting on channel 1.
///
/// Sensors accept no writes on their readings; new values arrive through
/// [`VirtualCoordinator::simulate`](crate::VirtualCoordinator::simulate).
pub struct VirtualSensor {
    address: Address,
}

impl Default for VirtualSensor {
    fn default() -> Self {
        Self::new("VTH0000001")
    }
}

impl VirtualSensor {
    pub const DEVICE_TYPE: &'static str = "HM-WDS40-TH-I";

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
            .version(1)
            .firmware("1.4")
            .paramset(PARAMSET_MASTER)
            .paramset(PARAMSET_VALUES)
            .channel(maintenance_channel())
            .channel(
                ChannelDescription::builder()
                    .index(1)
                    .device_type("WEATHER")
                    .paramset(PARAMSET_VALUES)
                    .metadata(ChannelMetadata {
                        direction: Some(1),
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
            .node(NodeKind::Sensor, "TEMPERATURE", NodeLocator::Fixed(1))
            .node(NodeKind::Sensor, "HUMIDITY", NodeLocator::Fixed(1))
            .build()
    }

    pub(crate) fn seeds(&self) -> Vec<Seed> {
        vec![
            device_values(&self.address, -72),
            Seed::new(
                self.address.clone(),
                PARAMSET_MASTER,
                VirtualParamset::default().param("BURST_RX", false, READ_WRITE),
            ),
            maintenance_values(&self.address),
            Seed::new(
                self.address.channel(0),
                PARAMSET_MASTER,
                VirtualParamset::default().param("TRANSMIT_TRY_MAX", 6, READ_WRITE),
            ),
            Seed::new(
                self.address.channel(1),
                PARAMSET_VALUES,
                VirtualParamset::default()
                    .param("TEMPERATURE", 21.5, READ_EVENT)
                    .param("HUMIDITY", 48, READ_EVENT),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmbridge_domain::description::Direction;

    #[test]
    fn should_report_on_fixed_channel() {
        let profile = VirtualSensor::profile().unwrap();
        assert_eq!(profile.element_count, 1);
        assert_eq!(
            profile.nodes.locate(NodeKind::Sensor, "TEMPERATURE"),
            Some(NodeLocator::Fixed(1))
        );
    }

    #[test]
    fn should_describe_sender_channel() {
        let description = VirtualSensor::default().describe().unwrap();
        assert_eq!(description.common.device_type, "HM-WDS40-TH-I");
        assert_eq!(description.channels[1].metadata.direction(), Direction::Sender);
    }

    #[test]
    fn should_seed_readings_as_read_only() {
        let seeds = VirtualSensor::default().seeds();
        let weather = seeds
            .iter()
            .find(|seed| seed.address == "VTH0000001:1")
            .unwrap();
        let temperature = &weather.data.descriptions["TEMPERATURE"];
        assert!(temperature.is_readable());
        assert!(!temperature.is_writable());
        assert_eq!(temperature.kind, "FLOAT");
    }
}
