//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RuleEngineError`] via `#[from]` at the port boundaries.

/// Base error for the rule engine.
#[derive(Debug, thiserror::Error)]
pub enum RuleEngineError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced object does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A device adapter failed to carry out a command.
    #[error("device error")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyId,

    #[error("rule has no trigger")]
    MissingTrigger,

    #[error("rule sequence is empty")]
    EmptySequence,

    #[error("weekday mask must have 7 entries, got {0}")]
    WeekdayMask(usize),

    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("sun offset of {0}s is out of range")]
    InvalidOffset(i64),

    #[error("invalid time window {0:?}, expected START-END")]
    InvalidWindow(String),

    #[error("sequence entry {0:?} is referenced but not defined")]
    DanglingEntry(String),

    #[error("sequence entry {0:?} is reachable from more than one parent")]
    SharedEntry(String),

    #[error("sequence entry {0:?} references one of its ancestors")]
    CyclicEntry(String),

    #[error("sequence entry {id:?} has an unexpected kind, expected {expected}")]
    UnexpectedEntry { id: String, expected: &'static str },
}

/// A lookup failed.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
