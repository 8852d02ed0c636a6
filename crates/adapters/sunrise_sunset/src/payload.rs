//! Response document of the sunrise-sunset API (`formatted=0`).

use chrono::{DateTime, Utc};
use homerules_domain::sun::SunTimes;
use serde::Deserialize;

use crate::error::SunriseSunsetError;

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Results {
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
}

/// Decode a response body into [`SunTimes`].
///
/// The `status` field is checked before `results`, which is not an object
/// when the request was rejected.
pub(crate) fn parse(body: &str) -> Result<SunTimes, SunriseSunsetError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(SunriseSunsetError::PayloadParse)?;
    if envelope.status != "OK" {
        return Err(SunriseSunsetError::Api(envelope.status));
    }
    let results: Results =
        serde_json::from_value(envelope.results).map_err(SunriseSunsetError::PayloadParse)?;
    Ok(SunTimes {
        sunrise: results.sunrise,
        sunset: results.sunset,
    })
}
