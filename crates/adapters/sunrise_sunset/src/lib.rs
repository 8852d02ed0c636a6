//! # homerules-adapter-sunrise-sunset
//!
//! [`SunTimesSource`] backed by the public <https://sunrise-sunset.org> API.
//!
//! One `GET {api_url}?lat=..&lng=..&date=YYYY-MM-DD&formatted=0` per refresh;
//! `formatted=0` makes the API answer with RFC 3339 UTC timestamps.
//!
//! ## Dependency rule
//!
//! Depends on `homerules-app` (port traits) and `homerules-domain` only.

mod config;
mod error;
mod payload;

pub use config::{DEFAULT_API_URL, SunriseSunsetConfig};
pub use error::SunriseSunsetError;

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use homerules_app::ports::{SunTimesError, SunTimesSource};
use homerules_domain::sun::{Location, SunTimes};
use tracing::debug;

/// HTTP client for the sunrise-sunset API.
#[derive(Debug, Clone)]
pub struct SunriseSunsetClient {
    client: reqwest::Client,
    api_url: String,
}

impl SunriseSunsetClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SunriseSunsetError::Http`] if the HTTP client cannot be
    /// initialised (TLS backend failure).
    pub fn new(config: &SunriseSunsetConfig) -> Result<Self, SunriseSunsetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SunriseSunsetError::Http)?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// Fetch sun times of `date` at `location`.
    ///
    /// # Errors
    ///
    /// Returns a [`SunriseSunsetError`] for transport failures, non-success
    /// HTTP or API statuses and malformed bodies.
    #[tracing::instrument(skip(self), fields(url = %self.api_url))]
    pub async fn sun_times(
        &self,
        location: Location,
        date: NaiveDate,
    ) -> Result<SunTimes, SunriseSunsetError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lng", location.longitude.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("formatted", "0".to_string()),
            ])
            .send()
            .await
            .map_err(SunriseSunsetError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SunriseSunsetError::HttpStatus(status));
        }

        let body = response.text().await.map_err(SunriseSunsetError::Http)?;
        debug!(bytes = body.len(), "sunrise-sunset response received");
        payload::parse(&body)
    }
}

impl SunTimesSource for SunriseSunsetClient {
    fn fetch(
        &self,
        location: Location,
        date: NaiveDate,
    ) -> impl Future<Output = Result<SunTimes, SunTimesError>> + Send {
        async move {
            self.sun_times(location, date)
                .await
                .map_err(SunriseSunsetError::into_domain)
        }
    }
}
