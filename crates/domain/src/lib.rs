//! # hmbridge-domain
//!
//! Pure domain model for hmbridge, a bridge to remote home-automation
//! devices exposed by a central coordinator.
//!
//! ## Responsibilities
//! - Foundational types: addresses, raw parameter values, error conventions
//! - Define **description records** for devices and their channels
//! - Define **reachability** as an explicit tri-state
//! - Define **node tables** and **device profiles** used to locate which
//!   entity serves a named data point
//! - Define **events** raised by the coordinator
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod address;
pub mod error;
pub mod value;

pub mod catalog;
pub mod description;
pub mod event;
pub mod node;
pub mod parameter;
pub mod reachability;
