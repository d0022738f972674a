//! State and behaviour common to devices and channels.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hmbridge_domain::address::Address;
use hmbridge_domain::description::EntityDescription;
use hmbridge_domain::error::{HmError, TransportError};
use hmbridge_domain::event::EntityEvent;
use hmbridge_domain::parameter::ParamsetDescription;
use hmbridge_domain::reachability::Reachability;
use hmbridge_domain::value::{PARAM_UNREACH, PARAMSET_VALUES, ParamValue, Paramset};
use tracing::Span;

use super::{EntityContext, EventCallback};
use crate::ports::Proxy;

/// Mutable part of an entity, guarded by one lock per entity.
struct EntityState {
    display_name: String,
    paramsets: HashMap<String, Paramset>,
    paramset_descriptions: HashMap<String, ParamsetDescription>,
    callbacks: Vec<EventCallback>,
    reachability: Reachability,
}

/// One coordinator address: identity, paramset cache, callbacks and
/// reachability.
///
/// The paramset cache mirrors the coordinator and is never authoritative.
/// Proxy calls are made without holding the state lock; their results are
/// applied in a single critical section so readers never see a partially
/// refreshed paramset.
pub struct EntityCore {
    description: EntityDescription,
    proxy: Arc<dyn Proxy>,
    span: Span,
    state: Mutex<EntityState>,
}

impl EntityCore {
    pub(crate) fn new(description: EntityDescription, ctx: &EntityContext) -> Self {
        let span = tracing::info_span!(
            parent: ctx.span(),
            "entity",
            address = %description.address,
            device_type = %description.device_type,
        );
        let core = Self {
            state: Mutex::new(EntityState {
                display_name: description.address.to_string(),
                paramsets: HashMap::new(),
                paramset_descriptions: HashMap::new(),
                callbacks: Vec::new(),
                reachability: Reachability::Unknown,
            }),
            description,
            proxy: ctx.proxy(),
            span,
        };
        if ctx.should_resolve_paramsets() {
            // Failures are already logged; a partially populated cache is usable.
            let _ = core.refresh_all_paramsets();
        }
        core
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.description.address
    }

    #[must_use]
    pub fn device_type(&self) -> &str {
        &self.description.device_type
    }

    #[must_use]
    pub fn family(&self) -> Option<&str> {
        self.description.family.as_deref()
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        self.description.flags
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.description.id.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> Option<u32> {
        self.description.version
    }

    /// Names of the paramsets declared by the description record.
    #[must_use]
    pub fn paramset_names(&self) -> &[String] {
        &self.description.paramsets
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        self.lock().display_name.clone()
    }

    pub fn set_display_name(&self, name: String) {
        self.lock().display_name = name;
    }

    #[must_use]
    pub fn reachability(&self) -> Reachability {
        self.lock().reachability
    }

    /// This entity's own flag; `Unknown` counts as reachable.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.reachability().is_unreachable()
    }

    /// Snapshot of one cached paramset.
    #[must_use]
    pub fn paramset(&self, paramset: &str) -> Option<Paramset> {
        self.lock().paramsets.get(paramset).cloned()
    }

    /// Snapshot of every cached paramset.
    #[must_use]
    pub fn paramsets(&self) -> HashMap<String, Paramset> {
        self.lock().paramsets.clone()
    }

    /// Last cached value of `key` in `paramset`, without a proxy call.
    #[must_use]
    pub fn cached_value(&self, paramset: &str, key: &str) -> Option<ParamValue> {
        self.lock()
            .paramsets
            .get(paramset)
            .and_then(|values| values.get(key))
            .cloned()
    }

    #[must_use]
    pub fn paramset_description(&self, paramset: &str) -> Option<ParamsetDescription> {
        self.lock().paramset_descriptions.get(paramset).cloned()
    }

    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.lock().callbacks.len()
    }

    /// Write `key` through the proxy.
    ///
    /// The cache is left untouched; refresh the paramset when an immediately
    /// consistent view is required.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::Transport`] when the proxy call fails.
    pub fn set_value(&self, key: &str, value: ParamValue) -> Result<(), HmError> {
        let _enter = self.span.enter();
        self.proxy
            .set_value(self.address(), key, value)
            .map_err(|err| self.transport_failure(err, key))
    }

    /// Read `key` live through the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::Transport`] when the proxy call fails.
    pub fn get_value(&self, key: &str) -> Result<ParamValue, HmError> {
        let _enter = self.span.enter();
        self.proxy
            .get_value(self.address(), key)
            .map_err(|err| self.transport_failure(err, key))
    }

    /// Pull and cache the description of `paramset`.
    ///
    /// On failure the previously cached description, if any, is kept.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::Transport`] when the proxy call fails.
    pub fn fetch_paramset_description(&self, paramset: &str) -> Result<(), HmError> {
        let _enter = self.span.enter();
        let description = self
            .proxy
            .get_paramset_description(self.address(), paramset)
            .map_err(|err| self.transport_failure(err, paramset))?;
        self.lock()
            .paramset_descriptions
            .insert(paramset.to_string(), description);
        Ok(())
    }

    /// Pull `paramset` and replace its cached mapping.
    ///
    /// Refreshing `VALUES` also re-derives reachability from its `UNREACH`
    /// parameter (absent means unknown). Nothing is applied on failure.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::Transport`] when the proxy call fails, or
    /// [`HmError::EmptyParamset`] when the coordinator returned nothing.
    pub fn refresh_paramset(&self, paramset: &str) -> Result<(), HmError> {
        let _enter = self.span.enter();
        let fetched = self
            .proxy
            .get_paramset(self.address(), paramset)
            .map_err(|err| {
                tracing::debug!(paramset, error = %err, cause = %err.source, "paramset refresh failed");
                HmError::from(err)
            })?;
        if fetched.is_empty() {
            tracing::debug!(paramset, "coordinator returned an empty paramset");
            return Err(HmError::EmptyParamset {
                address: self.address().clone(),
                paramset: paramset.to_string(),
            });
        }

        let mut state = self.lock();
        if paramset == PARAMSET_VALUES {
            state.reachability = fetched
                .get(PARAM_UNREACH)
                .map_or(Reachability::Unknown, Reachability::from_unreach);
        }
        state.paramsets.insert(paramset.to_string(), fetched);
        Ok(())
    }

    /// Refresh every declared paramset.
    ///
    /// Every paramset is attempted even when an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::RefreshIncomplete`] naming each paramset that
    /// could not be refreshed.
    pub fn refresh_all_paramsets(&self) -> Result<(), HmError> {
        let failed: Vec<String> = self
            .description
            .paramsets
            .iter()
            .filter(|name| self.refresh_paramset(name).is_err())
            .cloned()
            .collect();
        if failed.is_empty() {
            return Ok(());
        }
        let _enter = self.span.enter();
        tracing::warn!(failed = ?failed, "paramsets could not be refreshed");
        Err(HmError::RefreshIncomplete {
            address: self.address().clone(),
            failed,
        })
    }

    /// Push a partial paramset, then reconcile the whole cache.
    ///
    /// A successful push always triggers [`refresh_all_paramsets`](Self::refresh_all_paramsets)
    /// before returning, since writes may touch other paramsets. If that
    /// reconciliation fails the push still counts as done; the cache is then
    /// only as fresh as the next event or refresh makes it.
    ///
    /// # Errors
    ///
    /// Returns [`HmError::EmptyWritePayload`] or [`HmError::UnknownParamset`]
    /// without contacting the proxy, or [`HmError::Transport`] when the push
    /// itself fails.
    pub fn push_paramset(&self, paramset: &str, data: Paramset) -> Result<(), HmError> {
        if data.is_empty() {
            return Err(HmError::EmptyWritePayload {
                address: self.address().clone(),
                paramset: paramset.to_string(),
            });
        }
        if !self.description.declares_paramset(paramset) {
            return Err(HmError::UnknownParamset {
                address: self.address().clone(),
                paramset: paramset.to_string(),
            });
        }

        {
            let _enter = self.span.enter();
            self.proxy
                .put_paramset(self.address(), paramset, &data)
                .map_err(|err| self.transport_failure(err, paramset))?;
        }

        if let Err(err) = self.refresh_all_paramsets() {
            let _enter = self.span.enter();
            tracing::warn!(paramset, error = %err, "cache reconciliation after push incomplete");
        }
        Ok(())
    }

    /// Deliver an event raised by the coordinator for this address.
    ///
    /// `UNREACH` updates reachability before any callback runs. Callbacks
    /// are invoked in registration order on a snapshot of the list, outside
    /// the lock, so a callback may safely call back into this entity. A
    /// callback that fails or panics is logged and skipped.
    pub fn event(&self, interface_id: &str, key: &str, value: ParamValue) {
        let _enter = self.span.enter();
        tracing::debug!(interface_id, key, %value, "event received");

        let callbacks = {
            let mut state = self.lock();
            if key == PARAM_UNREACH {
                state.reachability = Reachability::from_unreach(&value);
            }
            state.callbacks.clone()
        };

        let event = EntityEvent::new(self.address().clone(), interface_id, key, value);
        for (position, callback) in callbacks.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(position, key, error = %err, "event callback failed");
                }
                Err(_) => tracing::warn!(position, key, "event callback panicked"),
            }
        }
    }

    /// Append `callback`; callbacks run in registration order.
    pub fn register_event_callback(&self, callback: EventCallback) {
        self.lock().callbacks.push(callback);
    }

    fn transport_failure(&self, err: TransportError, target: &str) -> HmError {
        tracing::error!(
            method = err.method,
            target,
            cause = %err.source,
            "proxy call failed"
        );
        HmError::Transport(err)
    }

    fn lock(&self) -> MutexGuard<'_, EntityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
