//! # hmbridged: hmbridge daemon
//!
//! Composition root that wires the coordinator adapter, the device registry
//! and the event bus together.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialise logging
//! - Construct the coordinator adapter and merge its catalog with the
//!   configured one
//! - Build every device from the coordinator's description records
//! - Pump coordinator events into the registry and log what comes out of
//!   the event bus
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use hmbridge_adapter_virtual::{VirtualCoordinator, VirtualDevice};
use hmbridge_app::entity::{Entity, EntityContext};
use hmbridge_app::event_bus::InProcessEventBus;
use hmbridge_app::ports::Proxy;
use hmbridge_app::services::DeviceRegistry;
use hmbridge_domain::event::EntityEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const EVENT_BUS_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    if !config.integrations.virtual_enabled {
        tracing::warn!("no coordinator integration enabled, nothing to do");
        return Ok(());
    }

    // Coordinator
    let coordinator = Arc::new(VirtualCoordinator::new(
        config.coordinator.interface_id.clone(),
        VirtualDevice::demo(),
    ));
    let mut catalog = coordinator.catalog().context("building virtual catalog")?;
    catalog.extend(config.catalog);

    // Devices
    let span = tracing::info_span!("coordinator", interface_id = %coordinator.interface_id());
    let ctx = EntityContext::new(Arc::clone(&coordinator) as Arc<dyn Proxy>)
        .with_span(span)
        .resolve_paramsets(config.coordinator.resolve_paramsets);
    let descriptions = coordinator
        .descriptions()
        .context("describing virtual devices")?;
    let registry = Arc::new(DeviceRegistry::build(descriptions, &catalog, &ctx));

    for device in registry.devices() {
        tracing::info!(
            address = %device.address(),
            device_type = device.device_type(),
            channels = device.channel_count(),
            unreachable = device.is_unreachable(),
            "device ready"
        );
    }

    // Event bus
    let event_bus = InProcessEventBus::new(EVENT_BUS_CAPACITY);
    registry.register_event_callback(&event_bus.callback());

    let pump = tokio::spawn(pump_events(coordinator.subscribe(), Arc::clone(&registry)));
    let logger = tokio::spawn(log_events(event_bus.subscribe()));

    tracing::info!(devices = registry.len(), "hmbridged running");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("shutting down");

    pump.abort();
    logger.abort();
    Ok(())
}

/// Deliver every coordinator event to the registry until the coordinator
/// goes away.
async fn pump_events(mut events: broadcast::Receiver<EntityEvent>, registry: Arc<DeviceRegistry>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(err) =
                    registry.on_event(&event.address, &event.interface_id, &event.key, event.value)
                {
                    tracing::warn!(address = %event.address, error = %err, "event not delivered");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event pump fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn log_events(mut events: broadcast::Receiver<EntityEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(
                address = %event.address,
                key = %event.key,
                value = %event.value,
                "entity event"
            ),
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "event log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}
