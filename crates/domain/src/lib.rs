//! # domosync-domain
//!
//! Pure domain model for the domosync hub synchronizer.
//!
//! ## Responsibilities
//! - Foundational types: device keys, error taxonomy
//! - Define **Categories** (lights, relays, thermoregulation, analog inputs)
//! - Define **Records** (immutable, normalized device snapshots produced by a fetch)
//! - Define the **Climate** model (zone mode, season, HVAC intent, temperatures)
//! - Define **Hub commands** (the typed outbound requests)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod category;
pub mod climate;
pub mod command;
pub mod record;
