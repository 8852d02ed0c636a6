//! Sun times source port: fetches sunrise and sunset for a location.

use std::future::Future;

use chrono::NaiveDate;
use homerules_domain::sun::{Location, SunTimes};

/// Something that knows when the sun rises and sets.
pub trait SunTimesSource: Send + Sync + 'static {
    /// Fetch sun times of `date` at `location`.
    fn fetch(
        &self,
        location: Location,
        date: NaiveDate,
    ) -> impl Future<Output = Result<SunTimes, SunTimesError>> + Send;
}

/// Failure to obtain sun times. Never fatal: the engine keeps stale values.
#[derive(Debug, thiserror::Error)]
pub enum SunTimesError {
    /// The request could not be sent or its response not read.
    #[error("sun times request failed")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service answered with a non-success status.
    #[error("sun times service answered {0}")]
    Status(String),

    /// The response did not contain usable sun times.
    #[error("malformed sun times payload")]
    Payload(#[source] Box<dyn std::error::Error + Send + Sync>),
}
