//! Sunrise-sunset adapter error types.

use homerules_app::ports::SunTimesError;

/// Errors specific to the sunrise-sunset adapter.
#[derive(Debug, thiserror::Error)]
pub enum SunriseSunsetError {
    /// The HTTP request could not be built, sent or read.
    #[error("sunrise-sunset request failed")]
    Http(#[source] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("sunrise-sunset API answered HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    /// The API reported a failure in its `status` field.
    #[error("sunrise-sunset API returned status {0}")]
    Api(String),

    /// The body was not the expected JSON document.
    #[error("failed to parse sunrise-sunset payload")]
    PayloadParse(#[source] serde_json::Error),
}

impl SunriseSunsetError {
    /// Convert into a [`SunTimesError`] for propagation across the port
    /// boundary.
    pub fn into_domain(self) -> SunTimesError {
        match self {
            Self::HttpStatus(status) => SunTimesError::Status(status.to_string()),
            Self::Api(status) => SunTimesError::Status(status),
            Self::PayloadParse(err) => SunTimesError::Payload(Box::new(err)),
            other @ Self::Http(_) => SunTimesError::Request(Box::new(other)),
        }
    }
}

impl From<SunriseSunsetError> for SunTimesError {
    fn from(err: SunriseSunsetError) -> Self {
        err.into_domain()
    }
}
