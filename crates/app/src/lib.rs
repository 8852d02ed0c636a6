//! # homerules-app
//!
//! Application layer: the rule engine use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceRegistry`: read device snapshots, send commands
//!   - `SunTimesSource`: fetch sunrise/sunset for a location and date
//!   - `Clock`: local wall-clock time
//!   - `DeviceEventPublisher`: publish device state changes
//! - Provide the engine components:
//!   - `AstronomicalTimeProvider`: today's sun times, refreshed daily
//!   - `TriggerScheduler`: one-shot timers for time/sunrise/sunset rules
//!   - `condition_evaluator`: `state` and `range` guards
//!   - `device_trigger`: reacts to device state changes
//!   - `SequenceExecutor`: runs entry trees with waits and branches
//!   - `RuleEngine`: the facade hosts drive
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `homerules-domain` only (plus `tokio` for tasks, timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod condition_evaluator;
pub mod device_trigger;
pub mod event_bus;
pub mod ports;
pub mod rule_engine;
pub mod scheduler;
pub mod sequence_executor;
pub mod sun_times;

#[cfg(test)]
pub(crate) mod testing;
