//! Astronomical time provider: today's sunrise and sunset, refreshed daily.
//!
//! A failed refresh is never fatal: the last good value is kept and the
//! scheduler carries on with it until the next refresh.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use homerules_domain::sun::{Location, SunTimes};
use tracing::{info, warn};

use crate::ports::SunTimesSource;

/// Shared, cloneable cell holding the latest known sun times.
#[derive(Debug, Clone, Default)]
pub struct SharedSunTimes(Arc<RwLock<Option<SunTimes>>>);

impl SharedSunTimes {
    /// Cell pre-filled with `times`.
    #[must_use]
    pub fn with(times: SunTimes) -> Self {
        Self(Arc::new(RwLock::new(Some(times))))
    }

    #[must_use]
    pub fn get(&self) -> Option<SunTimes> {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, times: SunTimes) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(times);
    }
}

/// Fetches sun times for a fixed location and caches the last good value.
pub struct AstronomicalTimeProvider<S> {
    source: S,
    location: Location,
    current: SharedSunTimes,
}

impl<S: SunTimesSource> AstronomicalTimeProvider<S> {
    /// Create a provider with an empty cache.
    pub fn new(source: S, location: Location) -> Self {
        Self {
            source,
            location,
            current: SharedSunTimes::default(),
        }
    }

    /// Handle on the cache, shared with the scheduler and evaluators.
    #[must_use]
    pub fn shared(&self) -> SharedSunTimes {
        self.current.clone()
    }

    /// Latest known sun times, `None` until the first successful refresh.
    #[must_use]
    pub fn current(&self) -> Option<SunTimes> {
        self.current.get()
    }

    /// Fetch sun times for `date` and cache them.
    ///
    /// On failure the error is logged and the previous value is kept and
    /// returned.
    #[tracing::instrument(skip(self), fields(latitude = self.location.latitude, longitude = self.location.longitude))]
    pub async fn refresh(&self, date: NaiveDate) -> Option<SunTimes> {
        match self.source.fetch(self.location, date).await {
            Ok(times) => {
                info!(sunrise = %times.sunrise, sunset = %times.sunset, "sun times updated");
                self.current.set(times);
                Some(times)
            }
            Err(err) => {
                let stale = self.current.get();
                warn!(error = %err, has_previous = stale.is_some(), "sun times refresh failed, keeping previous value");
                stale
            }
        }
    }
}

/// The first local midnight strictly after `now`.
///
/// Computed from the calendar rather than by adding 24 hours, so 23 and
/// 25 hour days around DST transitions land on the right instant. When a
/// transition skips midnight itself, the first existing minute after it is
/// used.
#[must_use]
pub fn next_local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return now.clone() + TimeDelta::days(1);
    };
    let midnight = tomorrow.and_time(NaiveTime::MIN);
    (0..=180)
        .find_map(|minutes| {
            tz.from_local_datetime(&(midnight + TimeDelta::minutes(minutes)))
                .earliest()
        })
        .unwrap_or_else(|| now.clone() + TimeDelta::days(1))
}
