//! # homerules-domain
//!
//! Pure domain model for the homerules rule engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, time-of-day arithmetic
//! - Define **Devices** as seen by the engine (read-only snapshots, commands, state events)
//! - Define **Rules** (trigger → sequence) with their weekday mask
//! - Define **Sequences** (an owned tree of device / wait / if / if-else entries)
//! - Define **Conditions** (device state and circular time windows)
//! - Define **Sun times** (today's sunrise and sunset)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod rule;
pub mod sun;
