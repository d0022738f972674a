//! Device: the root entity owning a set of channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use hmbridge_domain::address::Address;
use hmbridge_domain::description::{DeviceDescription, DeviceMetadata};
use hmbridge_domain::error::HmError;
use hmbridge_domain::node::{DeviceProfile, NodeKind, NodeLocator, NodeTables};
use hmbridge_domain::reachability::Reachability;
use hmbridge_domain::value::{PARAM_RSSI_DEVICE, ParamValue};

use super::{Channel, Entity, EntityContext, EntityCore, EventCallback};

/// Channel used by node accessors when the caller has no preference.
pub const DEFAULT_CHANNEL: u32 = 1;

/// Entity a node lookup resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTarget {
    Device,
    Channel(u32),
}

/// Where [`Device::register_event_callback`] stores a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Registration {
    /// On the device and, independently, on every channel.
    #[default]
    Bequeath,
    /// On the device only.
    Device,
    /// On one channel only; nothing happens if it does not exist.
    Channel(u32),
}

impl Registration {
    /// Map the coordinator-style `(bequeath, channel)` pair.
    #[must_use]
    pub fn from_args(bequeath: bool, channel: u32) -> Self {
        match (bequeath, channel) {
            (true, _) => Self::Bequeath,
            (false, 0) => Self::Device,
            (false, index) => Self::Channel(index),
        }
    }
}

/// A physical device: its own entity plus the channels it exclusively owns.
///
/// Named data points are located through the node tables of the device's
/// [`DeviceProfile`]: a data point is served by the device itself, by a
/// channel chosen by the caller, or by one fixed channel.
pub struct Device {
    core: EntityCore,
    metadata: DeviceMetadata,
    children: BTreeMap<u32, Channel>,
    element_count: u32,
    nodes: NodeTables,
}

impl Device {
    /// Build a device and all of its channels from a description record.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::Validation`] if the description or the profile is
    /// invalid.
    pub fn new(
        description: DeviceDescription,
        profile: &DeviceProfile,
        ctx: &EntityContext,
    ) -> Result<Self, HmError> {
        description.validate()?;
        profile.validate()?;

        let DeviceDescription {
            common,
            metadata,
            channels,
        } = description;
        let core = EntityCore::new(common, ctx);
        let channel_ctx = ctx.clone().with_span(core.span().clone());
        let children: BTreeMap<u32, Channel> = channels
            .into_iter()
            .map(|channel| (channel.index, Channel::new(channel, &channel_ctx)))
            .collect();

        {
            let _enter = core.span().enter();
            tracing::debug!(
                channels = children.len(),
                element_count = profile.element_count,
                "device created"
            );
        }

        Ok(Self {
            core,
            metadata,
            children,
            element_count: profile.element_count,
            nodes: profile.effective_nodes(),
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &DeviceMetadata {
        &self.metadata
    }

    /// Number of structurally equivalent sibling functions.
    #[must_use]
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    #[must_use]
    pub fn nodes(&self) -> &NodeTables {
        &self.nodes
    }

    #[must_use]
    pub fn channel(&self, index: u32) -> Option<&Channel> {
        self.children.get(&index)
    }

    /// Channels in index order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.children.values()
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.children.len()
    }

    /// The device itself or the channel with `address`.
    #[must_use]
    pub fn entity(&self, address: &Address) -> Option<&dyn Entity> {
        if self.core.address() == address {
            return Some(self);
        }
        self.children
            .values()
            .find(|channel| channel.address() == address)
            .map(|channel| channel as &dyn Entity)
    }

    /// Live read of the device's signal strength.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::Transport`] when the proxy call fails.
    pub fn rssi_device(&self) -> Result<ParamValue, HmError> {
        self.core.get_value(PARAM_RSSI_DEVICE)
    }

    /// Resolve which entity serves `name` in the `kind` table.
    ///
    /// `channel` is only used by dynamic locators.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::ParameterNotMapped`] when `name` is not in the
    /// table, or [`HmError::InvalidChannelIndex`] when the resolved index is
    /// zero or names no channel of this device.
    pub fn locate(&self, kind: NodeKind, name: &str, channel: u32) -> Result<NodeTarget, HmError> {
        self.resolve(kind, name, channel).map(|(target, _)| target)
    }

    /// Read a sensor data point.
    ///
    /// # Errors
    ///
    /// See [`locate`](Self::locate); transport failures of the read itself
    /// are returned as [`HmError::Transport`].
    pub fn get_sensor_data(&self, name: &str, channel: u32) -> Result<ParamValue, HmError> {
        self.read_node(NodeKind::Sensor, name, channel)
    }

    /// Read a binary data point.
    ///
    /// # Errors
    ///
    /// See [`get_sensor_data`](Self::get_sensor_data).
    pub fn get_binary_data(&self, name: &str, channel: u32) -> Result<ParamValue, HmError> {
        self.read_node(NodeKind::Binary, name, channel)
    }

    /// Read an attribute data point.
    ///
    /// # Errors
    ///
    /// See [`get_sensor_data`](Self::get_sensor_data).
    pub fn get_attribute_data(&self, name: &str, channel: u32) -> Result<ParamValue, HmError> {
        self.read_node(NodeKind::Attribute, name, channel)
    }

    /// Read back a writable data point.
    ///
    /// # Errors
    ///
    /// See [`get_sensor_data`](Self::get_sensor_data).
    pub fn get_write_data(&self, name: &str, channel: u32) -> Result<ParamValue, HmError> {
        self.read_node(NodeKind::Write, name, channel)
    }

    /// Write a data point located through the write table.
    ///
    /// # Errors
    ///
    /// See [`locate`](Self::locate); transport failures of the write itself
    /// are returned as [`HmError::Transport`].
    pub fn write_node_data(&self, name: &str, value: ParamValue, channel: u32) -> Result<(), HmError> {
        let (_, target) = self.resolve_logged(NodeKind::Write, name, channel)?;
        target.set_value(name, value)
    }

    /// Register `callback` on the device, one channel, or the whole tree.
    ///
    /// A bequeathed callback is stored once per entity; each entity invokes
    /// it for its own events, with its own address. Entities are locked one
    /// at a time, so a concurrent event may reach the device before the
    /// callback lands on every channel.
    ///
    /// Returns the number of entities the callback was registered on.
    pub fn register_event_callback(&self, callback: EventCallback, registration: Registration) -> usize {
        match registration {
            Registration::Device => {
                self.core.register_event_callback(callback);
                1
            }
            Registration::Channel(index) => {
                if let Some(channel) = self.children.get(&index) {
                    channel.register_event_callback(callback);
                    1
                } else {
                    let _enter = self.core.span().enter();
                    tracing::debug!(index, "no such channel, callback not registered");
                    0
                }
            }
            Registration::Bequeath => {
                self.core.register_event_callback(Arc::clone(&callback));
                for channel in self.children.values() {
                    channel.register_event_callback(Arc::clone(&callback));
                }
                1 + self.children.len()
            }
        }
    }

    fn read_node(&self, kind: NodeKind, name: &str, channel: u32) -> Result<ParamValue, HmError> {
        let (_, target) = self.resolve_logged(kind, name, channel)?;
        target.get_value(name)
    }

    fn resolve_logged(
        &self,
        kind: NodeKind,
        name: &str,
        channel: u32,
    ) -> Result<(NodeTarget, &EntityCore), HmError> {
        self.resolve(kind, name, channel).inspect_err(|err| {
            let _enter = self.core.span().enter();
            tracing::error!(%kind, name, channel, error = %err, "node resolution failed");
        })
    }

    fn resolve(
        &self,
        kind: NodeKind,
        name: &str,
        channel: u32,
    ) -> Result<(NodeTarget, &EntityCore), HmError> {
        let locator = self
            .nodes
            .locate(kind, name)
            .ok_or_else(|| HmError::ParameterNotMapped {
                address: self.core.address().clone(),
                kind,
                name: name.to_string(),
            })?;
        let index = match locator {
            NodeLocator::Device => return Ok((NodeTarget::Device, &self.core)),
            NodeLocator::Dynamic => channel,
            NodeLocator::Fixed(index) => index,
        };
        self.children
            .get(&index)
            .filter(|_| index > 0)
            .map(|child| (NodeTarget::Channel(index), child.core()))
            .ok_or_else(|| HmError::InvalidChannelIndex {
                address: self.core.address().clone(),
                index,
            })
    }
}

impl Entity for Device {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    /// Unreachable when the device itself or any channel is; recomputed on
    /// every call.
    fn is_unreachable(&self) -> bool {
        self.core.is_unreachable() || self.children.values().any(|channel| channel.is_unreachable())
    }

    /// [`Reachability::Unreachable`] as soon as any channel is; the device's
    /// own state otherwise.
    fn reachability(&self) -> Reachability {
        if self.children.values().any(|channel| channel.is_unreachable()) {
            return Reachability::Unreachable;
        }
        self.core.reachability()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::entity::callback;
    use crate::test_support::{RecordingProxy, context, values};
    use hmbridge_domain::description::ChannelDescription;
    use hmbridge_domain::error::ValidationError;

    fn description() -> DeviceDescription {
        DeviceDescription::builder()
            .address("D001")
            .device_type("HM-TEST")
            .paramset("MASTER")
            .paramset("VALUES")
            .channel(ChannelDescription::builder().index(0).device_type("MAINTENANCE").paramset("VALUES"))
            .channel(ChannelDescription::builder().index(1).device_type("WEATHER").paramset("VALUES"))
            .channel(ChannelDescription::builder().index(2).device_type("WEATHER").paramset("VALUES"))
            .build()
            .unwrap()
    }

    fn profile() -> DeviceProfile {
        DeviceProfile::builder()
            .node(NodeKind::Sensor, "TEMPERATURE", NodeLocator::Dynamic)
            .node(NodeKind::Sensor, "HUMIDITY", NodeLocator::Fixed(1))
            .node(NodeKind::Binary, "LOWBAT", NodeLocator::Fixed(2))
            .node(NodeKind::Write, "STATE", NodeLocator::Dynamic)
            .node(NodeKind::Write, "INSTALL_TEST", NodeLocator::Device)
            .build()
            .unwrap()
    }

    fn device(proxy: &Arc<RecordingProxy>) -> Device {
        Device::new(description(), &profile(), &context(proxy)).unwrap()
    }

    fn seed(proxy: &RecordingProxy) {
        proxy.insert("D001", "VALUES", values(&[("RSSI_DEVICE", (-61).into())]));
        proxy.insert("D001:1", "VALUES", values(&[("TEMPERATURE", 21.5.into()), ("HUMIDITY", 40.into())]));
        proxy.insert("D001:2", "VALUES", values(&[("TEMPERATURE", 18.0.into()), ("LOWBAT", false.into())]));
    }

    #[test]
    fn should_create_channels_from_description() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        assert_eq!(device.channel_count(), 3);
        assert_eq!(device.channel(2).unwrap().address(), "D001:2");
        assert_eq!(device.channel(2).unwrap().parent_address(), "D001");
        let indices: Vec<u32> = device.channels().map(Channel::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn should_reject_invalid_description() {
        let proxy = RecordingProxy::shared();
        let mut description = description();
        description.channels[1].parent = Address::from("OTHER");
        let result = Device::new(description, &profile(), &context(&proxy));
        assert!(matches!(
            result,
            Err(HmError::Validation(ValidationError::ParentMismatch { .. }))
        ));
    }

    #[test]
    fn should_resolve_dynamic_locator_to_caller_channel() {
        let proxy = RecordingProxy::shared();
        seed(&proxy);
        let device = device(&proxy);

        let value = device.get_sensor_data("TEMPERATURE", 2).unwrap();

        assert_eq!(value, 18.0.into());
        assert_eq!(proxy.calls(), vec!["getValue D001:2 TEMPERATURE"]);
    }

    #[test]
    fn should_ignore_caller_channel_for_fixed_locator() {
        let proxy = RecordingProxy::shared();
        seed(&proxy);
        let device = device(&proxy);

        assert_eq!(device.locate(NodeKind::Sensor, "HUMIDITY", 2).unwrap(), NodeTarget::Channel(1));
        assert_eq!(device.get_sensor_data("HUMIDITY", 2).unwrap(), 40.into());
        assert_eq!(device.get_binary_data("LOWBAT", DEFAULT_CHANNEL).unwrap(), false.into());
    }

    #[test]
    fn should_read_device_attribute_without_touching_channels() {
        let proxy = RecordingProxy::shared();
        seed(&proxy);
        let device = device(&proxy);

        assert_eq!(device.locate(NodeKind::Attribute, "RSSI_DEVICE", 7).unwrap(), NodeTarget::Device);
        let value = device.get_attribute_data("RSSI_DEVICE", DEFAULT_CHANNEL).unwrap();

        assert_eq!(value, (-61).into());
        assert_eq!(proxy.calls(), vec!["getValue D001 RSSI_DEVICE"]);
        assert_eq!(device.rssi_device().unwrap(), (-61).into());
    }

    #[test]
    fn should_fail_for_unmapped_parameter_without_proxy_call() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let result = device.get_sensor_data("PRESSURE", 1);
        assert!(matches!(
            result,
            Err(HmError::ParameterNotMapped { kind: NodeKind::Sensor, ref name, .. }) if name == "PRESSURE"
        ));
        assert!(proxy.calls().is_empty());
    }

    #[test]
    fn should_look_up_the_selected_table_only() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let result = device.get_binary_data("TEMPERATURE", 1);
        assert!(matches!(result, Err(HmError::ParameterNotMapped { kind: NodeKind::Binary, .. })));
    }

    #[test]
    fn should_reject_missing_channel_index() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let result = device.get_sensor_data("TEMPERATURE", 5);
        assert!(matches!(result, Err(HmError::InvalidChannelIndex { index: 5, .. })));
        assert!(proxy.calls().is_empty());
    }

    #[test]
    fn should_reject_channel_zero_for_node_access() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let result = device.get_sensor_data("TEMPERATURE", 0);
        assert!(matches!(result, Err(HmError::InvalidChannelIndex { index: 0, .. })));
    }

    #[test]
    fn should_accept_channels_beyond_element_count() {
        let proxy = RecordingProxy::shared();
        seed(&proxy);
        let device = device(&proxy);
        assert_eq!(device.element_count(), 1);
        assert!(device.get_sensor_data("TEMPERATURE", 2).is_ok());
    }

    #[test]
    fn should_write_node_data_to_resolved_entity() {
        let proxy = RecordingProxy::shared();
        seed(&proxy);
        let device = device(&proxy);

        device.write_node_data("STATE", true.into(), 2).unwrap();
        device.write_node_data("INSTALL_TEST", true.into(), 2).unwrap();

        assert_eq!(proxy.calls(), vec!["setValue D001:2 STATE", "setValue D001 INSTALL_TEST"]);
        assert_eq!(device.get_write_data("STATE", 2).unwrap(), true.into());
    }

    #[test]
    fn should_fail_write_for_unmapped_parameter() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let result = device.write_node_data("TEMPERATURE", 20.into(), 1);
        assert!(matches!(result, Err(HmError::ParameterNotMapped { kind: NodeKind::Write, .. })));
        assert!(proxy.calls().is_empty());
    }

    #[test]
    fn should_aggregate_unreachability_over_channels() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        assert!(!device.is_unreachable());

        device.channel(2).unwrap().event("hm-rf", "UNREACH", true.into());
        assert!(device.is_unreachable());
        assert!(!device.core().is_unreachable());

        device.channel(2).unwrap().event("hm-rf", "UNREACH", false.into());
        assert!(!device.is_unreachable());

        device.event("hm-rf", "UNREACH", true.into());
        assert!(device.is_unreachable());
        assert!(!device.channel(1).unwrap().is_unreachable());
    }

    #[test]
    fn should_report_unreachable_state_when_a_channel_is() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        assert_eq!(device.reachability(), Reachability::Unknown);

        device.event("hm-rf", "UNREACH", false.into());
        device.channel(1).unwrap().event("hm-rf", "UNREACH", true.into());
        assert_eq!(device.core().reachability(), Reachability::Reachable);
        assert_eq!(device.reachability(), Reachability::Unreachable);

        device.channel(1).unwrap().event("hm-rf", "UNREACH", false.into());
        assert_eq!(device.reachability(), Reachability::Reachable);
    }

    #[test]
    fn should_bequeath_callback_to_every_channel() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let registered = device.register_event_callback(
            callback(move |event| {
                sink.lock().unwrap().push(event.address.to_string());
                Ok(())
            }),
            Registration::from_args(true, 0),
        );

        assert_eq!(registered, 4);
        assert_eq!(device.core().callback_count(), 1);
        assert!(device.channels().all(|c| c.core().callback_count() == 1));

        device.channel(1).unwrap().event("hm-rf", "TEMPERATURE", 20.5.into());
        device.event("hm-rf", "CONFIG_PENDING", false.into());
        assert_eq!(*seen.lock().unwrap(), vec!["D001:1", "D001"]);
    }

    #[test]
    fn should_bequeath_even_when_channel_given() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let registered = device.register_event_callback(callback(|_| Ok(())), Registration::from_args(true, 2));
        assert_eq!(registered, 4);
        assert_eq!(device.core().callback_count(), 1);
    }

    #[test]
    fn should_register_on_device_only() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let registered = device.register_event_callback(callback(|_| Ok(())), Registration::from_args(false, 0));
        assert_eq!(registered, 1);
        assert_eq!(device.core().callback_count(), 1);
        assert!(device.channels().all(|c| c.core().callback_count() == 0));
    }

    #[test]
    fn should_register_on_single_channel() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let registered = device.register_event_callback(callback(|_| Ok(())), Registration::Channel(2));
        assert_eq!(registered, 1);
        assert_eq!(device.core().callback_count(), 0);
        assert_eq!(device.channel(2).unwrap().core().callback_count(), 1);
        assert_eq!(device.channel(1).unwrap().core().callback_count(), 0);
    }

    #[test]
    fn should_ignore_registration_for_missing_channel() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        let registered = device.register_event_callback(callback(|_| Ok(())), Registration::Channel(9));
        assert_eq!(registered, 0);
        assert_eq!(device.core().callback_count(), 0);
    }

    #[test]
    fn should_find_device_and_channel_entities_by_address() {
        let proxy = RecordingProxy::shared();
        let device = device(&proxy);
        assert_eq!(device.entity(&Address::from("D001")).unwrap().address(), "D001");
        assert_eq!(device.entity(&Address::from("D001:1")).unwrap().address(), "D001:1");
        assert!(device.entity(&Address::from("D001:9")).is_none());
        assert!(device.entity(&Address::from("D002:1")).is_none());
    }

    #[test]
    fn should_pull_paramsets_of_whole_tree_when_requested() {
        let proxy = RecordingProxy::shared();
        seed(&proxy);
        proxy.insert("D001", "MASTER", values(&[("INTERVAL", 5.into())]));
        proxy.insert("D001:0", "VALUES", values(&[("UNREACH", true.into())]));
        let ctx = context(&proxy).resolve_paramsets(true);

        let device = Device::new(description(), &profile(), &ctx).unwrap();

        assert_eq!(device.core().cached_value("MASTER", "INTERVAL"), Some(5.into()));
        assert_eq!(device.channel(1).unwrap().core().cached_value("VALUES", "TEMPERATURE"), Some(21.5.into()));
        assert!(device.is_unreachable());
    }
}
