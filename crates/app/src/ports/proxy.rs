//! Proxy port: request/response access to the coordinator.
//!
//! The proxy is the only way the entity model talks to the coordinator.
//! Calls are synchronous and may block on the network; timeouts and retries
//! are the implementation's business, not the caller's.

use std::sync::Arc;

use hmbridge_domain::address::Address;
use hmbridge_domain::error::TransportError;
use hmbridge_domain::parameter::ParamsetDescription;
use hmbridge_domain::value::{ParamValue, Paramset};

/// Remote procedure calls offered by the coordinator, each addressed by a
/// device or channel address.
///
/// Implementations live in adapter crates (e.g. `adapter_virtual`).
pub trait Proxy: Send + Sync {
    /// Read a single parameter of the `VALUES` paramset.
    fn get_value(&self, address: &Address, key: &str) -> Result<ParamValue, TransportError>;

    /// Write a single parameter of the `VALUES` paramset.
    fn set_value(&self, address: &Address, key: &str, value: ParamValue)
    -> Result<(), TransportError>;

    /// Read a full paramset.
    fn get_paramset(&self, address: &Address, paramset: &str) -> Result<Paramset, TransportError>;

    /// Write a subset of a paramset's parameters.
    fn put_paramset(
        &self,
        address: &Address,
        paramset: &str,
        data: &Paramset,
    ) -> Result<(), TransportError>;

    /// Describe the parameters of a paramset.
    fn get_paramset_description(
        &self,
        address: &Address,
        paramset: &str,
    ) -> Result<ParamsetDescription, TransportError>;
}

impl<T: Proxy + ?Sized> Proxy for Arc<T> {
    fn get_value(&self, address: &Address, key: &str) -> Result<ParamValue, TransportError> {
        (**self).get_value(address, key)
    }

    fn set_value(
        &self,
        address: &Address,
        key: &str,
        value: ParamValue,
    ) -> Result<(), TransportError> {
        (**self).set_value(address, key, value)
    }

    fn get_paramset(&self, address: &Address, paramset: &str) -> Result<Paramset, TransportError> {
        (**self).get_paramset(address, paramset)
    }

    fn put_paramset(
        &self,
        address: &Address,
        paramset: &str,
        data: &Paramset,
    ) -> Result<(), TransportError> {
        (**self).put_paramset(address, paramset, data)
    }

    fn get_paramset_description(
        &self,
        address: &Address,
        paramset: &str,
    ) -> Result<ParamsetDescription, TransportError> {
        (**self).get_paramset_description(address, paramset)
    }
}
