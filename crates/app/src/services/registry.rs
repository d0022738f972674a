//! Device registry: owns every constructed device and routes coordinator
//! events to the entity they are addressed to.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hmbridge_domain::address::Address;
use hmbridge_domain::catalog::DeviceCatalog;
use hmbridge_domain::description::DeviceDescription;
use hmbridge_domain::error::{HmError, NotFoundError};
use hmbridge_domain::value::ParamValue;

use crate::entity::{Device, Entity, EntityContext, EventCallback, Registration};

/// Devices keyed by address, with an index of every channel address.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<Address, Arc<Device>>,
    channels: HashMap<Address, Address>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a device for every description, using the catalog profile
    /// of its `TYPE`.
    ///
    /// A description that fails validation is logged and skipped so one bad
    /// record does not keep the rest of the installation from loading.
    #[tracing::instrument(skip_all)]
    pub fn build(
        descriptions: impl IntoIterator<Item = DeviceDescription>,
        catalog: &DeviceCatalog,
        ctx: &EntityContext,
    ) -> Self {
        let mut registry = Self::new();
        for description in descriptions {
            let address = description.common.address.clone();
            let profile = catalog.profile_for(&description.common.device_type);
            match Device::new(description, &profile, ctx) {
                Ok(device) => {
                    registry.insert(device);
                }
                Err(err) => tracing::warn!(%address, error = %err, "skipping device"),
            }
        }
        tracing::info!(devices = registry.len(), "device registry built");
        registry
    }

    /// Add `device`, replacing any device with the same address.
    pub fn insert(&mut self, device: Device) -> Arc<Device> {
        let device = Arc::new(device);
        let address = device.address().clone();
        if let Some(previous) = self.devices.remove(&address) {
            for channel in previous.channels() {
                self.channels.remove(channel.address());
            }
        }
        for channel in device.channels() {
            self.channels
                .insert(channel.address().clone(), address.clone());
        }
        self.devices.insert(address, Arc::clone(&device));
        device
    }

    #[must_use]
    pub fn device(&self, address: &Address) -> Option<Arc<Device>> {
        self.devices.get(address).cloned()
    }

    /// Device or channel with `address`.
    #[must_use]
    pub fn entity(&self, address: &Address) -> Option<&dyn Entity> {
        if let Some(device) = self.devices.get(address) {
            return Some(&**device);
        }
        let owner = self.channels.get(address)?;
        self.devices.get(owner)?.entity(address)
    }

    /// Devices in address order.
    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Deliver a coordinator event to the entity with `address`.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::NotFound`] when no device or channel has `address`.
    pub fn on_event(
        &self,
        address: &Address,
        interface_id: &str,
        key: &str,
        value: ParamValue,
    ) -> Result<(), HmError> {
        let Some(entity) = self.entity(address) else {
            tracing::debug!(%address, key, "event for unknown address");
            return Err(NotFoundError {
                entity: "Entity",
                address: address.clone(),
            }
            .into());
        };
        entity.event(interface_id, key, value);
        Ok(())
    }

    /// Bequeath `callback` to every device and all of its channels.
    ///
    /// Returns the number of entities the callback was registered on.
    pub fn register_event_callback(&self, callback: &EventCallback) -> usize {
        self.devices
            .values()
            .map(|device| device.register_event_callback(Arc::clone(callback), Registration::Bequeath))
            .sum()
    }
}
