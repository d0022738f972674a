//! # hmbridge-adapter-virtual
//!
//! Virtual coordinator that serves simulated devices through the
//! [`Proxy`] port, for testing and demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Address | Type | Behaviour |
//! |--------|---------|------|-----------|
//! | Virtual Switch | `VSW0000001` | `HM-LC-Sw2-FM` | Two relays, `STATE` on channels 1 and 2 |
//! | Virtual Sensor | `VTH0000001` | `HM-WDS40-TH-I` | `TEMPERATURE` / `HUMIDITY` on channel 1 |
//! | Virtual Dimmer | `VDM0000001` | `HM-LC-Dim1T-Pl` | `LEVEL` on channel 1 |
//!
//! Writes to event-capable `VALUES` parameters are echoed as coordinator
//! events on [`VirtualCoordinator::subscribe`]. Reachability changes and
//! sensor readings can be injected with [`VirtualCoordinator::simulate`].
//!
//! ## Dependency rule
//!
//! Depends on `hmbridge-app` (port traits) and `hmbridge-domain` only.

mod devices;
mod error;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use hmbridge_app::ports::Proxy;
use hmbridge_domain::address::Address;
use hmbridge_domain::catalog::DeviceCatalog;
use hmbridge_domain::description::DeviceDescription;
use hmbridge_domain::error::{TransportError, ValidationError};
use hmbridge_domain::event::EntityEvent;
use hmbridge_domain::parameter::ParamsetDescription;
use hmbridge_domain::value::{PARAM_UNREACH, PARAMSET_VALUES, ParamValue, Paramset};
use tokio::sync::broadcast;

use devices::VirtualParamset;
pub use devices::{VirtualDevice, VirtualDimmer, VirtualSensor, VirtualSwitch};
pub use error::VirtualFault;

/// Interface id stamped on events emitted by the default coordinator.
pub const INTERFACE_ID: &str = "virtual";

const EVENT_CAPACITY: usize = 64;

type Store = HashMap<Address, HashMap<String, VirtualParamset>>;

/// In-memory coordinator holding the paramsets of every simulated address.
pub struct VirtualCoordinator {
    interface_id: String,
    devices: Vec<VirtualDevice>,
    store: Mutex<Store>,
    offline: AtomicBool,
    events: broadcast::Sender<EntityEvent>,
}

impl Default for VirtualCoordinator {
    fn default() -> Self {
        Self::new(INTERFACE_ID, VirtualDevice::demo())
    }
}

impl VirtualCoordinator {
    /// Create a coordinator serving `devices`, emitting events under
    /// `interface_id`.
    #[must_use]
    pub fn new(interface_id: impl Into<String>, devices: Vec<VirtualDevice>) -> Self {
        let mut store = Store::new();
        for seed in devices.iter().flat_map(VirtualDevice::seeds) {
            store
                .entry(seed.address)
                .or_default()
                .insert(seed.paramset.to_string(), seed.data);
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            interface_id: interface_id.into(),
            devices,
            store: Mutex::new(store),
            offline: AtomicBool::new(false),
            events,
        }
    }

    #[must_use]
    pub fn interface_id(&self) -> &str {
        &self.interface_id
    }

    /// Description records of every simulated device.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a record cannot be built.
    pub fn descriptions(&self) -> Result<Vec<DeviceDescription>, ValidationError> {
        self.devices.iter().map(VirtualDevice::describe).collect()
    }

    /// Profiles of the simulated device types.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a profile cannot be built.
    pub fn catalog(&self) -> Result<DeviceCatalog, ValidationError> {
        let mut catalog = DeviceCatalog::new();
        for device in &self.devices {
            catalog.insert(device.device_type(), device.profile()?);
        }
        Ok(catalog)
    }

    /// Subscribe to coordinator events.
    ///
    /// Returns a receiver that will get all events emitted *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent> {
        self.events.subscribe()
    }

    /// Make every proxy call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        tracing::info!(offline, "virtual coordinator connectivity changed");
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Report `address` as (un)reachable and emit the matching event.
    ///
    /// # Errors
    ///
    /// Returns a [`VirtualFault`] when `address` has no `UNREACH` parameter.
    pub fn set_unreachable(&self, address: &Address, unreachable: bool) -> Result<(), VirtualFault> {
        self.simulate(address, PARAM_UNREACH, unreachable.into())
    }

    /// Simulate a change on the device side: update a `VALUES` parameter and
    /// emit an event for it, whether or not the proxy is offline.
    ///
    /// # Errors
    ///
    /// Returns a [`VirtualFault`] when `address` or `key` is unknown, or the
    /// value type does not match.
    pub fn simulate(&self, address: &Address, key: &str, value: ParamValue) -> Result<(), VirtualFault> {
        let value = {
            let mut store = self.lock();
            let paramset = paramset_mut(&mut store, address, PARAMSET_VALUES)?;
            let current = paramset
                .values
                .get_mut(key)
                .ok_or_else(|| VirtualFault::UnknownParameter {
                    address: address.clone(),
                    key: key.to_string(),
                })?;
            *current = coerce(current, value, key)?;
            current.clone()
        };
        self.emit(address, key, value);
        Ok(())
    }

    /// Current value held by the simulation, bypassing the offline switch.
    #[must_use]
    pub fn value(&self, address: &Address, paramset: &str, key: &str) -> Option<ParamValue> {
        self.lock()
            .get(address)
            .and_then(|paramsets| paramsets.get(paramset))
            .and_then(|paramset| paramset.values.get(key))
            .cloned()
    }

    fn emit(&self, address: &Address, key: &str, value: ParamValue) {
        tracing::trace!(%address, key, %value, "emitting event");
        let event = EntityEvent::new(address.clone(), self.interface_id.as_str(), key, value);
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    fn check_online(&self) -> Result<(), VirtualFault> {
        if self.is_offline() {
            return Err(VirtualFault::Offline);
        }
        Ok(())
    }

    /// Apply `data` to `paramset` atomically, returning the values that
    /// should be echoed as events.
    fn write(
        &self,
        address: &Address,
        paramset: &str,
        data: &Paramset,
    ) -> Result<Vec<(String, ParamValue)>, VirtualFault> {
        self.check_online()?;
        let mut store = self.lock();
        let target = paramset_mut(&mut store, address, paramset)?;

        let mut accepted = Vec::with_capacity(data.len());
        for (key, value) in data {
            let description = target
                .descriptions
                .get(key)
                .ok_or_else(|| VirtualFault::UnknownParameter {
                    address: address.clone(),
                    key: key.clone(),
                })?;
            if !description.is_writable() {
                return Err(VirtualFault::ReadOnly {
                    address: address.clone(),
                    key: key.clone(),
                });
            }
            let current = target.values.get(key).ok_or_else(|| VirtualFault::UnknownParameter {
                address: address.clone(),
                key: key.clone(),
            })?;
            let value = coerce(current, value.clone(), key)?;
            accepted.push((key.clone(), value, description.emits_events()));
        }

        let mut echoed = Vec::new();
        for (key, value, emits) in accepted {
            if emits && paramset == PARAMSET_VALUES {
                echoed.push((key.clone(), value.clone()));
            }
            target.values.insert(key, value);
        }
        Ok(echoed)
    }

    fn read(&self, address: &Address, paramset: &str) -> Result<VirtualParamset, VirtualFault> {
        self.check_online()?;
        let store = self.lock();
        store
            .get(address)
            .ok_or_else(|| VirtualFault::UnknownAddress(address.clone()))?
            .get(paramset)
            .cloned()
            .ok_or_else(|| VirtualFault::UnknownParamset {
                address: address.clone(),
                paramset: paramset.to_string(),
            })
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Proxy for VirtualCoordinator {
    fn get_value(&self, address: &Address, key: &str) -> Result<ParamValue, TransportError> {
        self.read(address, PARAMSET_VALUES)
            .and_then(|paramset| {
                paramset
                    .values
                    .get(key)
                    .cloned()
                    .ok_or_else(|| VirtualFault::UnknownParameter {
                        address: address.clone(),
                        key: key.to_string(),
                    })
            })
            .map_err(|fault| fault.into_transport("getValue", address))
    }

    fn set_value(&self, address: &Address, key: &str, value: ParamValue) -> Result<(), TransportError> {
        let data = Paramset::from([(key.to_string(), value)]);
        let echoed = self
            .write(address, PARAMSET_VALUES, &data)
            .map_err(|fault| fault.into_transport("setValue", address))?;
        tracing::debug!(%address, key, "value written");
        for (key, value) in echoed {
            self.emit(address, &key, value);
        }
        Ok(())
    }

    fn get_paramset(&self, address: &Address, paramset: &str) -> Result<Paramset, TransportError> {
        self.read(address, paramset)
            .map(|paramset| paramset.values)
            .map_err(|fault| fault.into_transport("getParamset", address))
    }

    fn put_paramset(&self, address: &Address, paramset: &str, data: &Paramset) -> Result<(), TransportError> {
        let echoed = self
            .write(address, paramset, data)
            .map_err(|fault| fault.into_transport("putParamset", address))?;
        tracing::debug!(%address, paramset, parameters = data.len(), "paramset written");
        for (key, value) in echoed {
            self.emit(address, &key, value);
        }
        Ok(())
    }

    fn get_paramset_description(
        &self,
        address: &Address,
        paramset: &str,
    ) -> Result<ParamsetDescription, TransportError> {
        self.read(address, paramset)
            .map(|paramset| paramset.descriptions)
            .map_err(|fault| fault.into_transport("getParamsetDescription", address))
    }
}

fn paramset_mut<'a>(
    store: &'a mut Store,
    address: &Address,
    paramset: &str,
) -> Result<&'a mut VirtualParamset, VirtualFault> {
    store
        .get_mut(address)
        .ok_or_else(|| VirtualFault::UnknownAddress(address.clone()))?
        .get_mut(paramset)
        .ok_or_else(|| VirtualFault::UnknownParamset {
            address: address.clone(),
            paramset: paramset.to_string(),
        })
}

/// Accept `value` if it has the type of `current`; integers widen to floats.
#[allow(clippy::cast_precision_loss)]
fn coerce(current: &ParamValue, value: ParamValue, key: &str) -> Result<ParamValue, VirtualFault> {
    match (current, value) {
        (ParamValue::Float(_), value @ ParamValue::Int(_)) => Ok(value.as_f64().map_or(value, ParamValue::Float)),
        (current, value) if current.type_name() == value.type_name() => Ok(value),
        (current, value) => Err(VirtualFault::TypeMismatch {
            key: key.to_string(),
            expected: current.type_name(),
            actual: value.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmbridge_domain::value::PARAMSET_MASTER;

    fn address(value: &str) -> Address {
        Address::from(value)
    }

    #[test]
    fn should_describe_three_devices() {
        let coordinator = VirtualCoordinator::default();
        let descriptions = coordinator.descriptions().unwrap();
        assert_eq!(descriptions.len(), 3);
        let catalog = coordinator.catalog().unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.profile_for(VirtualSwitch::DEVICE_TYPE).element_count, 2);
    }

    #[test]
    fn should_serve_every_declared_paramset() {
        let coordinator = VirtualCoordinator::default();
        for description in coordinator.descriptions().unwrap() {
            for name in &description.common.paramsets {
                assert!(coordinator.get_paramset(&description.common.address, name).is_ok());
            }
            for channel in &description.channels {
                for name in &channel.common.paramsets {
                    assert!(
                        coordinator.get_paramset(&channel.common.address, name).is_ok(),
                        "{} {name}",
                        channel.common.address
                    );
                }
            }
        }
    }

    #[test]
    fn should_read_and_write_values() {
        let coordinator = VirtualCoordinator::default();
        let relay = address("VSW0000001:2");

        coordinator.set_value(&relay, "STATE", true.into()).unwrap();

        assert_eq!(coordinator.get_value(&relay, "STATE").unwrap(), true.into());
        assert_eq!(coordinator.get_value(&address("VSW0000001:1"), "STATE").unwrap(), false.into());
    }

    #[test]
    fn should_echo_writes_as_events() {
        let coordinator = VirtualCoordinator::default();
        let mut events = coordinator.subscribe();
        let relay = address("VSW0000001:1");

        coordinator.set_value(&relay, "STATE", true.into()).unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(event.address, relay);
        assert_eq!(event.interface_id, INTERFACE_ID);
        assert_eq!(event.key, "STATE");
        assert_eq!(event.value, true.into());
    }

    #[test]
    fn should_not_echo_master_writes() {
        let coordinator = VirtualCoordinator::default();
        let mut events = coordinator.subscribe();
        let data = Paramset::from([("POWERUP_ACTION".to_string(), 1.into())]);

        coordinator
            .put_paramset(&address("VSW0000001:1"), PARAMSET_MASTER, &data)
            .unwrap();

        assert!(events.try_recv().is_err());
        assert_eq!(
            coordinator.value(&address("VSW0000001:1"), PARAMSET_MASTER, "POWERUP_ACTION"),
            Some(1.into())
        );
    }

    #[test]
    fn should_reject_writes_to_read_only_parameters() {
        let coordinator = VirtualCoordinator::default();
        let err = coordinator
            .set_value(&address("VTH0000001:1"), "TEMPERATURE", 30.0.into())
            .unwrap_err();
        assert_eq!(err.method, "setValue");
        assert!(err.source.to_string().contains("read-only"));
    }

    #[test]
    fn should_apply_put_paramset_atomically() {
        let coordinator = VirtualCoordinator::default();
        let dimmer = address("VDM0000001:1");
        let data = Paramset::from([
            ("LEVEL".to_string(), 0.5.into()),
            ("WORKING".to_string(), true.into()),
        ]);

        assert!(coordinator.put_paramset(&dimmer, PARAMSET_VALUES, &data).is_err());
        assert_eq!(coordinator.value(&dimmer, PARAMSET_VALUES, "LEVEL"), Some(0.0.into()));
    }

    #[test]
    fn should_widen_integers_to_floats() {
        let coordinator = VirtualCoordinator::default();
        let dimmer = address("VDM0000001:1");
        coordinator.set_value(&dimmer, "LEVEL", 1.into()).unwrap();
        assert_eq!(coordinator.value(&dimmer, PARAMSET_VALUES, "LEVEL"), Some(1.0.into()));
    }

    #[test]
    fn should_reject_mismatched_types() {
        let coordinator = VirtualCoordinator::default();
        let result = coordinator.set_value(&address("VSW0000001:1"), "STATE", "on".into());
        assert!(result.unwrap_err().source.to_string().contains("expects BOOL"));
    }

    #[test]
    fn should_fail_every_call_while_offline() {
        let coordinator = VirtualCoordinator::default();
        coordinator.set_offline(true);
        let relay = address("VSW0000001:1");
        assert!(coordinator.get_value(&relay, "STATE").is_err());
        assert!(coordinator.get_paramset(&relay, PARAMSET_VALUES).is_err());
        assert!(coordinator.get_paramset_description(&relay, PARAMSET_VALUES).is_err());

        coordinator.set_offline(false);
        assert!(coordinator.get_value(&relay, "STATE").is_ok());
    }

    #[test]
    fn should_report_unknown_address() {
        let coordinator = VirtualCoordinator::default();
        let err = coordinator.get_paramset(&address("NOPE"), PARAMSET_VALUES).unwrap_err();
        assert_eq!(err.address, "NOPE");
        assert!(err.source.to_string().contains("unknown address"));
    }

    #[test]
    fn should_emit_unreach_events() {
        let coordinator = VirtualCoordinator::default();
        let mut events = coordinator.subscribe();
        let maintenance = address("VTH0000001:0");

        coordinator.set_unreachable(&maintenance, true).unwrap();

        let event = events.try_recv().unwrap();
        assert!(event.is_unreach());
        assert_eq!(event.value, true.into());
        assert_eq!(coordinator.get_value(&maintenance, PARAM_UNREACH).unwrap(), true.into());
    }

    #[test]
    fn should_simulate_readings_while_offline() {
        let coordinator = VirtualCoordinator::default();
        let mut events = coordinator.subscribe();
        coordinator.set_offline(true);

        coordinator
            .simulate(&address("VTH0000001:1"), "TEMPERATURE", 19.0.into())
            .unwrap();

        assert_eq!(events.try_recv().unwrap().value, 19.0.into());
    }

    #[test]
    fn should_describe_parameters_from_values() {
        let coordinator = VirtualCoordinator::default();
        let description = coordinator
            .get_paramset_description(&address("VDM0000001:1"), PARAMSET_VALUES)
            .unwrap();
        assert_eq!(description["LEVEL"].kind, "FLOAT");
        assert!(description["LEVEL"].is_writable());
        assert!(!description["WORKING"].is_writable());
    }

    #[tokio::test]
    async fn should_deliver_events_to_async_subscribers() {
        let coordinator = VirtualCoordinator::default();
        let mut events = coordinator.subscribe();

        coordinator
            .set_value(&address("VDM0000001:1"), "LEVEL", 0.75.into())
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.key, "LEVEL");
        assert_eq!(event.value, 0.75.into());
    }
}
