//! Sun times: today's sunrise and sunset as UTC instants.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Sunrise and sunset for the configured location.
///
/// Refreshed once a day; a failed refresh keeps the previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: Timestamp,
    pub sunset: Timestamp,
}

/// Coordinates the sun times are computed for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Whether both coordinates are within their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Which solar event a trigger is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl SunTimes {
    /// Instant of the given event.
    #[must_use]
    pub fn at(&self, event: SunEvent) -> Timestamp {
        match event {
            SunEvent::Sunrise => self.sunrise,
            SunEvent::Sunset => self.sunset,
        }
    }
}

impl std::fmt::Display for SunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sunrise => f.write_str("sunrise"),
            Self::Sunset => f.write_str("sunset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pick_requested_event() {
        let sun = SunTimes {
            sunrise: "2024-06-12T09:02:11Z".parse().unwrap(),
            sunset: "2024-06-13T00:41:05Z".parse().unwrap(),
        };
        assert_eq!(sun.at(SunEvent::Sunrise), sun.sunrise);
        assert_eq!(sun.at(SunEvent::Sunset), sun.sunset);
    }

    #[test]
    fn should_validate_coordinates() {
        assert!(Location { latitude: 46.11, longitude: -64.85 }.is_valid());
        assert!(!Location { latitude: 91.0, longitude: 0.0 }.is_valid());
        assert!(!Location { latitude: 0.0, longitude: -181.0 }.is_valid());
    }
}
