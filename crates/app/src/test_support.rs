//! In-memory doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use hmbridge_domain::address::Address;
use hmbridge_domain::error::TransportError;
use hmbridge_domain::parameter::{
    OPERATION_EVENT, OPERATION_READ, OPERATION_WRITE, ParameterDescription, ParamsetDescription,
};
use hmbridge_domain::value::{PARAMSET_VALUES, ParamValue, Paramset};
use tracing_subscriber::fmt::MakeWriter;

use crate::entity::EntityContext;
use crate::ports::Proxy;

/// Proxy serving paramsets from memory and recording every call as
/// `"<method> <address> <target>"`.
#[derive(Default)]
pub struct RecordingProxy {
    store: Mutex<HashMap<Address, HashMap<String, Paramset>>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl RecordingProxy {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, address: &str, paramset: &str, values: Paramset) {
        self.store
            .lock()
            .unwrap()
            .entry(Address::from(address))
            .or_default()
            .insert(paramset.to_string(), values);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.split(' ').next() == Some(method))
            .count()
    }

    fn record(&self, method: &'static str, address: &Address, target: &str) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{method} {address} {target}"));
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::new(method, address.clone(), "coordinator offline"));
        }
        Ok(())
    }

    fn lookup(&self, method: &'static str, address: &Address, paramset: &str) -> Result<Paramset, TransportError> {
        self.store
            .lock()
            .unwrap()
            .get(address)
            .and_then(|paramsets| paramsets.get(paramset))
            .cloned()
            .ok_or_else(|| TransportError::new(method, address.clone(), format!("no paramset {paramset}")))
    }
}

impl Proxy for RecordingProxy {
    fn get_value(&self, address: &Address, key: &str) -> Result<ParamValue, TransportError> {
        self.record("getValue", address, key)?;
        self.lookup("getValue", address, PARAMSET_VALUES)?
            .remove(key)
            .ok_or_else(|| TransportError::new("getValue", address.clone(), format!("no parameter {key}")))
    }

    fn set_value(&self, address: &Address, key: &str, value: ParamValue) -> Result<(), TransportError> {
        self.record("setValue", address, key)?;
        self.store
            .lock()
            .unwrap()
            .entry(address.clone())
            .or_default()
            .entry(PARAMSET_VALUES.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get_paramset(&self, address: &Address, paramset: &str) -> Result<Paramset, TransportError> {
        self.record("getParamset", address, paramset)?;
        self.lookup("getParamset", address, paramset)
    }

    fn put_paramset(&self, address: &Address, paramset: &str, values: &Paramset) -> Result<(), TransportError> {
        self.record("putParamset", address, paramset)?;
        self.store
            .lock()
            .unwrap()
            .entry(address.clone())
            .or_default()
            .entry(paramset.to_string())
            .or_default()
            .extend(values.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }

    fn get_paramset_description(
        &self,
        address: &Address,
        paramset: &str,
    ) -> Result<ParamsetDescription, TransportError> {
        self.record("getParamsetDescription", address, paramset)?;
        let values = self.lookup("getParamsetDescription", address, paramset)?;
        Ok(values
            .into_iter()
            .map(|(key, value)| {
                let description = ParameterDescription {
                    kind: value.type_name().to_string(),
                    operations: OPERATION_READ | OPERATION_WRITE | OPERATION_EVENT,
                    ..ParameterDescription::default()
                };
                (key, description)
            })
            .collect())
    }
}

pub fn context(proxy: &Arc<RecordingProxy>) -> EntityContext {
    EntityContext::new(Arc::clone(proxy) as Arc<dyn Proxy>)
}

pub fn values(entries: &[(&str, ParamValue)]) -> Paramset {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

/// Log sink for asserting on what the entity model writes.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
