//! Faults raised by the virtual coordinator.

use hmbridge_domain::address::Address;
use hmbridge_domain::error::TransportError;

/// Why a simulated proxy call was refused.
#[derive(Debug, thiserror::Error)]
pub enum VirtualFault {
    #[error("coordinator is offline")]
    Offline,

    #[error("unknown address {0}")]
    UnknownAddress(Address),

    #[error("unknown paramset {paramset} on {address}")]
    UnknownParamset { address: Address, paramset: String },

    #[error("unknown parameter {key} on {address}")]
    UnknownParameter { address: Address, key: String },

    #[error("parameter {key} on {address} is read-only")]
    ReadOnly { address: Address, key: String },

    #[error("parameter {key} expects {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl VirtualFault {
    pub(crate) fn into_transport(self, method: &'static str, address: &Address) -> TransportError {
        tracing::debug!(method, %address, fault = %self, "virtual proxy call refused");
        TransportError::new(method, address.clone(), self)
    }
}
