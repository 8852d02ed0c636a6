//! Virtual device layer error types.

use homerules_domain::error::{NotFoundError, RuleEngineError};

/// Errors specific to the virtual device layer.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// No simulated device has this id.
    #[error("unknown virtual device {0}")]
    UnknownDevice(String),

    /// The device only reports state and does not accept commands.
    #[error("virtual device {0} is read-only")]
    ReadOnly(String),
}

impl VirtualError {
    /// Convert into a [`RuleEngineError`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> RuleEngineError {
        match self {
            Self::UnknownDevice(id) => NotFoundError {
                entity: "Device",
                id,
            }
            .into(),
            other => RuleEngineError::Device(Box::new(other)),
        }
    }
}

impl From<VirtualError> for RuleEngineError {
    fn from(err: VirtualError) -> Self {
        err.into_domain()
    }
}
