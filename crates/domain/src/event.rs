//! Events raised by the coordinator for a device or channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::value::{PARAM_UNREACH, ParamValue};

/// UTC timestamp attached to received events.
pub type Timestamp = DateTime<Utc>;

/// One asynchronous notification, as handed to every event callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvent {
    /// Address of the entity that raised the event.
    pub address: Address,
    /// Interface id under which the coordinator delivered the event.
    pub interface_id: String,
    pub key: String,
    pub value: ParamValue,
    pub received_at: Timestamp,
}

impl EntityEvent {
    #[must_use]
    pub fn new(
        address: Address,
        interface_id: impl Into<String>,
        key: impl Into<String>,
        value: ParamValue,
    ) -> Self {
        Self {
            address,
            interface_id: interface_id.into(),
            key: key.into(),
            value,
            received_at: Utc::now(),
        }
    }

    /// Whether this event reports a change in reachability.
    #[must_use]
    pub fn is_unreach(&self) -> bool {
        self.key == PARAM_UNREACH
    }
}
