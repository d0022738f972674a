//! Channel: a functional sub-unit of a device.

use hmbridge_domain::address::Address;
use hmbridge_domain::description::{ChannelDescription, ChannelMetadata};

use super::{Entity, EntityContext, EntityCore, EventCallback};

/// One channel of a [`Device`](super::Device).
///
/// Channels are created by their device and live exactly as long as it does.
/// The parent is referenced by address only.
pub struct Channel {
    core: EntityCore,
    parent: Address,
    index: u32,
    metadata: ChannelMetadata,
}

impl Channel {
    pub(crate) fn new(description: ChannelDescription, ctx: &EntityContext) -> Self {
        let ChannelDescription {
            common,
            parent,
            index,
            metadata,
        } = description;
        Self {
            core: EntityCore::new(common, ctx),
            parent,
            index,
            metadata,
        }
    }

    /// Address of the owning device.
    #[must_use]
    pub fn parent_address(&self) -> &Address {
        &self.parent
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn metadata(&self) -> &ChannelMetadata {
        &self.metadata
    }

    /// Register `callback` for events raised by this channel only.
    pub fn register_event_callback(&self, callback: EventCallback) {
        self.core.register_event_callback(callback);
    }
}

impl Entity for Channel {
    fn core(&self) -> &EntityCore {
        &self.core
    }
}
