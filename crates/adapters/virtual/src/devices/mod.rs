//! Virtual device implementations: switch, sensor, dimmer.
//!
//! Each virtual device knows its description record, the catalog profile of
//! its type, and the initial paramsets of every address it owns.

mod dimmer;
mod sensor;
mod switch;

pub use dimmer::VirtualDimmer;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use hmbridge_domain::address::Address;
use hmbridge_domain::description::{ChannelDescription, ChannelDescriptionBuilder, DeviceDescription};
use hmbridge_domain::error::ValidationError;
use hmbridge_domain::node::DeviceProfile;
use hmbridge_domain::parameter::{
    OPERATION_EVENT, OPERATION_READ, OPERATION_WRITE, ParameterDescription, ParamsetDescription,
};
use hmbridge_domain::value::{PARAM_RSSI_DEVICE, PARAM_UNREACH, PARAMSET_VALUES, ParamValue, Paramset};

pub(crate) const READ_EVENT: u8 = OPERATION_READ | OPERATION_EVENT;
pub(crate) const READ_WRITE_EVENT: u8 = OPERATION_READ | OPERATION_WRITE | OPERATION_EVENT;
pub(crate) const READ_WRITE: u8 = OPERATION_READ | OPERATION_WRITE;

/// Values and descriptions of one simulated paramset.
#[derive(Debug, Clone, Default)]
pub(crate) struct VirtualParamset {
    pub values: Paramset,
    pub descriptions: ParamsetDescription,
}

impl VirtualParamset {
    pub(crate) fn param(mut self, name: &str, value: impl Into<ParamValue>, operations: u8) -> Self {
        let value = value.into();
        self.descriptions.insert(
            name.to_string(),
            ParameterDescription {
                kind: value.type_name().to_string(),
                operations,
                default: Some(value.clone()),
                ..ParameterDescription::default()
            },
        );
        self.values.insert(name.to_string(), value);
        self
    }
}

/// Initial paramset of one address.
pub(crate) struct Seed {
    pub address: Address,
    pub paramset: &'static str,
    pub data: VirtualParamset,
}

impl Seed {
    pub(crate) fn new(address: Address, paramset: &'static str, data: VirtualParamset) -> Self {
        Self {
            address,
            paramset,
            data,
        }
    }
}

/// `VALUES` of the device address itself.
pub(crate) fn device_values(address: &Address, rssi: i64) -> Seed {
    Seed::new(
        address.clone(),
        PARAMSET_VALUES,
        VirtualParamset::default()
            .param(PARAM_RSSI_DEVICE, rssi, READ_EVENT)
            .param("CONFIG_PENDING", false, READ_EVENT),
    )
}

/// `VALUES` of the maintenance channel, index 0.
pub(crate) fn maintenance_values(address: &Address) -> Seed {
    Seed::new(
        address.channel(0),
        PARAMSET_VALUES,
        VirtualParamset::default()
            .param(PARAM_UNREACH, false, READ_EVENT)
            .param("STICKY_UNREACH", false, READ_WRITE_EVENT)
            .param("LOWBAT", false, READ_EVENT),
    )
}

pub(crate) fn maintenance_channel() -> ChannelDescriptionBuilder {
    ChannelDescription::builder()
        .index(0)
        .device_type("MAINTENANCE")
        .paramset("MASTER")
        .paramset(PARAMSET_VALUES)
}

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Switch(VirtualSwitch),
    Sensor(VirtualSensor),
    Dimmer(VirtualDimmer),
}

impl VirtualDevice {
    /// One device of every simulated type, at its default address.
    #[must_use]
    pub fn demo() -> Vec<Self> {
        vec![
            Self::Switch(VirtualSwitch::default()),
            Self::Sensor(VirtualSensor::default()),
            Self::Dimmer(VirtualDimmer::default()),
        ]
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        match self {
            Self::Switch(d) => d.address(),
            Self::Sensor(d) => d.address(),
            Self::Dimmer(d) => d.address(),
        }
    }

    #[must_use]
    pub fn device_type(&self) -> &'static str {
        match self {
            Self::Switch(_) => VirtualSwitch::DEVICE_TYPE,
            Self::Sensor(_) => VirtualSensor::DEVICE_TYPE,
            Self::Dimmer(_) => VirtualDimmer::DEVICE_TYPE,
        }
    }

    /// Description record as the coordinator would report it.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<DeviceDescription, ValidationError> {
        match self {
            Self::Switch(d) => d.describe(),
            Self::Sensor(d) => d.describe(),
            Self::Dimmer(d) => d.describe(),
        }
    }

    /// Catalog profile of this device type.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn profile(&self) -> Result<DeviceProfile, ValidationError> {
        match self {
            Self::Switch(_) => VirtualSwitch::profile(),
            Self::Sensor(_) => VirtualSensor::profile(),
            Self::Dimmer(_) => VirtualDimmer::profile(),
        }
    }

    pub(crate) fn seeds(&self) -> Vec<Seed> {
        match self {
            Self::Switch(d) => d.seeds(),
            Self::Sensor(d) => d.seeds(),
            Self::Dimmer(d) => d.seeds(),
        }
    }
}
