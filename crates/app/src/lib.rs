//! # hmbridge-app
//!
//! Application layer: the **proxy port** and the device/channel entity model.
//!
//! ## Responsibilities
//! - Define the [`Proxy`](ports::Proxy) port trait that coordinator adapters
//!   implement (driven/outbound port)
//! - Model devices and channels ([`entity`]): paramset cache, node
//!   resolution, reachability and event-callback fan-out
//! - Route coordinator events by address ([`services::DeviceRegistry`])
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `hmbridge-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod entity;
pub mod event_bus;
pub mod ports;
pub mod services;

#[cfg(test)]
mod test_support;
