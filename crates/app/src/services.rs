//! Application services: use-cases built on top of the entity model.
//!
//! Services receive their collaborators (proxy, catalog, parent span) at
//! construction through an [`EntityContext`](crate::entity::EntityContext),
//! keeping this layer decoupled from concrete adapters.

pub mod registry;

pub use registry::DeviceRegistry;
