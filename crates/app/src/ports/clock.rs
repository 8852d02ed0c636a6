//! Clock port: wall-clock time in the local, DST-aware time zone.

use chrono::{DateTime, Local};

/// Source of "now" for scheduling and time-window checks.
pub trait Clock: Send + Sync + 'static {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
