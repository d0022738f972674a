//! Common error types used across the workspace.
//!
//! Every fallible operation of the entity model returns [`HmError`]. Faults
//! raised by a proxy are wrapped into a [`TransportError`] at the call site,
//! so callers see a typed failure cause instead of a raw transport error.

use crate::address::Address;
use crate::node::NodeKind;

/// Top-level error for the entity model.
#[derive(Debug, thiserror::Error)]
pub enum HmError {
    /// The proxy call failed (network fault, remote fault, unknown target).
    #[error("transport error")]
    Transport(#[from] TransportError),

    /// The parameter is not modeled in the selected node table.
    #[error("parameter {name} is not mapped in the {kind} node table of {address}")]
    ParameterNotMapped {
        address: Address,
        kind: NodeKind,
        name: String,
    },

    /// The resolved channel index does not name an existing channel.
    #[error("channel index {index} is not valid for device {address}")]
    InvalidChannelIndex { address: Address, index: u32 },

    /// A push targeted a paramset the entity does not declare.
    #[error("paramset {paramset} is not declared by {address}")]
    UnknownParamset { address: Address, paramset: String },

    /// A push was attempted with no parameters.
    #[error("refusing to push an empty payload to paramset {paramset} of {address}")]
    EmptyWritePayload { address: Address, paramset: String },

    /// The coordinator answered a paramset read with an empty mapping.
    #[error("paramset {paramset} of {address} came back empty")]
    EmptyParamset { address: Address, paramset: String },

    /// At least one paramset could not be refreshed.
    #[error("failed to refresh paramsets {} of {address}", .failed.join(", "))]
    RefreshIncomplete { address: Address, failed: Vec<String> },

    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),
}

impl HmError {
    /// Whether the failure was raised by the proxy rather than detected locally.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A failed proxy call.
#[derive(Debug, thiserror::Error)]
#[error("{method} on {address} failed")]
pub struct TransportError {
    /// Name of the proxy operation (`getValue`, `putParamset`, …).
    pub method: &'static str,
    pub address: Address,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(
        method: &'static str,
        address: Address,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            method,
            address,
            source: source.into(),
        }
    }
}

/// Invariant violations in description records and device profiles.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("address must not be empty")]
    EmptyAddress,

    #[error("device type of {0} must not be empty")]
    EmptyType(Address),

    #[error("channel {channel} names {parent} as parent, expected {expected}")]
    ParentMismatch {
        channel: Address,
        parent: Address,
        expected: Address,
    },

    #[error("channel index {0} is declared more than once")]
    DuplicateChannelIndex(u32),

    #[error("element count must be at least 1")]
    ZeroElementCount,

    #[error("parameter {0} is mapped to fixed channel 0")]
    FixedChannelZero(String),
}

/// Lookup of an entity by address failed.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {address} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub address: Address,
}
