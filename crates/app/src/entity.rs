//! Device/channel entity model.
//!
//! A physical device is a [`Device`] owning zero or more [`Channel`]s. Both
//! are built around an [`EntityCore`] holding the identity, paramset cache,
//! callback list and reachability of one coordinator address. The shared
//! behaviour is exposed through the [`Entity`] trait.

mod base;
mod channel;
mod device;

use std::collections::HashMap;
use std::sync::Arc;

use hmbridge_domain::address::Address;
use hmbridge_domain::error::HmError;
use hmbridge_domain::event::EntityEvent;
use hmbridge_domain::parameter::ParamsetDescription;
use hmbridge_domain::reachability::Reachability;
use hmbridge_domain::value::{ParamValue, Paramset};
use tracing::Span;

use crate::ports::Proxy;

pub use base::EntityCore;
pub use channel::Channel;
pub use device::{DEFAULT_CHANNEL, Device, NodeTarget, Registration};

/// Error returned by an event callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Listener invoked for every event an entity raises.
pub type EventCallback = Arc<dyn Fn(&EntityEvent) -> Result<(), CallbackError> + Send + Sync>;

/// Wrap a closure into an [`EventCallback`].
pub fn callback<F>(f: F) -> EventCallback
where
    F: Fn(&EntityEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Collaborators handed to every entity at construction.
#[derive(Clone)]
pub struct EntityContext {
    proxy: Arc<dyn Proxy>,
    span: Span,
    resolve_paramsets: bool,
}

impl EntityContext {
    /// Create a context around `proxy`, logging under the current span.
    pub fn new(proxy: Arc<dyn Proxy>) -> Self {
        Self {
            proxy,
            span: Span::current(),
            resolve_paramsets: false,
        }
    }

    /// Parent span for every entity built with this context.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Pull every declared paramset while constructing entities.
    #[must_use]
    pub fn resolve_paramsets(mut self, resolve: bool) -> Self {
        self.resolve_paramsets = resolve;
        self
    }

    pub(crate) fn proxy(&self) -> Arc<dyn Proxy> {
        Arc::clone(&self.proxy)
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn should_resolve_paramsets(&self) -> bool {
        self.resolve_paramsets
    }
}

/// Behaviour shared by devices and channels.
///
/// Every method delegates to the entity's [`EntityCore`]; see there for the
/// cache and failure semantics.
pub trait Entity: Send + Sync {
    fn core(&self) -> &EntityCore;

    fn address(&self) -> &Address {
        self.core().address()
    }

    fn device_type(&self) -> &str {
        self.core().device_type()
    }

    fn display_name(&self) -> String {
        self.core().display_name()
    }

    fn set_display_name(&self, name: String) {
        self.core().set_display_name(name);
    }

    /// Whether the coordinator reports this entity as unreachable.
    fn is_unreachable(&self) -> bool {
        self.core().is_unreachable()
    }

    fn reachability(&self) -> Reachability {
        self.core().reachability()
    }

    /// Live write through the proxy; see [`EntityCore::set_value`].
    fn set_value(&self, key: &str, value: ParamValue) -> Result<(), HmError> {
        self.core().set_value(key, value)
    }

    /// Live read through the proxy; see [`EntityCore::get_value`].
    fn get_value(&self, key: &str) -> Result<ParamValue, HmError> {
        self.core().get_value(key)
    }

    fn fetch_paramset_description(&self, paramset: &str) -> Result<(), HmError> {
        self.core().fetch_paramset_description(paramset)
    }

    fn refresh_paramset(&self, paramset: &str) -> Result<(), HmError> {
        self.core().refresh_paramset(paramset)
    }

    fn refresh_all_paramsets(&self) -> Result<(), HmError> {
        self.core().refresh_all_paramsets()
    }

    fn push_paramset(&self, paramset: &str, data: Paramset) -> Result<(), HmError> {
        self.core().push_paramset(paramset, data)
    }

    fn paramset(&self, paramset: &str) -> Option<Paramset> {
        self.core().paramset(paramset)
    }

    fn paramsets(&self) -> HashMap<String, Paramset> {
        self.core().paramsets()
    }

    fn paramset_description(&self, paramset: &str) -> Option<ParamsetDescription> {
        self.core().paramset_description(paramset)
    }

    /// Deliver an event raised for this entity.
    fn event(&self, interface_id: &str, key: &str, value: ParamValue) {
        self.core().event(interface_id, key, value);
    }
}
