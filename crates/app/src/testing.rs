//! In-memory port fakes shared by the unit tests of this crate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone};
use homerules_domain::device::{Command, Device};
use homerules_domain::error::RuleEngineError;
use homerules_domain::id::DeviceId;
use homerules_domain::sun::{Location, SunTimes};
use tokio::time::Instant;

use crate::ports::{Clock, DeviceRegistry, SunTimesError, SunTimesSource};

// ── Clock ──────────────────────────────────────────────────────────

/// Local time that advances with tokio's (pausable) clock.
pub struct TestClock {
    base: DateTime<Local>,
    started: Instant,
}

impl TestClock {
    pub fn at(base: DateTime<Local>) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Local> {
        self.base + TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::zero())
    }
}

pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(y, m, d, h, min, s)
        .earliest()
        .expect("valid local time")
}

/// Wednesday 2024-06-12 at `h:min` local time.
pub fn wednesday(h: u32, min: u32) -> DateTime<Local> {
    local(2024, 6, 12, h, min, 0)
}

pub fn sun_times(sunrise: &str, sunset: &str) -> SunTimes {
    SunTimes {
        sunrise: sunrise.parse().unwrap(),
        sunset: sunset.parse().unwrap(),
    }
}

/// Sun times at the given local wall-clock times on 2024-06-12.
pub fn local_sun_times(sunrise: (u32, u32), sunset: (u32, u32)) -> SunTimes {
    SunTimes {
        sunrise: wednesday(sunrise.0, sunrise.1).to_utc(),
        sunset: wednesday(sunset.0, sunset.1).to_utc(),
    }
}

// ── Devices ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub device: DeviceId,
    pub command: Command,
    /// Time since the registry was created.
    pub at: Duration,
}

pub struct InMemoryDevices {
    store: Mutex<HashMap<DeviceId, Device>>,
    dispatched: Mutex<Vec<Dispatch>>,
    started: Instant,
}

impl InMemoryDevices {
    pub fn with(devices: Vec<Device>) -> Self {
        Self {
            store: Mutex::new(devices.into_iter().map(|d| (d.id.clone(), d)).collect()),
            dispatched: Mutex::new(Vec::new()),
            started: Instant::now(),
        }
    }

    pub fn switches(ids: &[(&str, bool)]) -> Arc<Self> {
        Arc::new(Self::with(
            ids.iter().map(|(id, state)| Device::switch(*id, *state)).collect(),
        ))
    }

    pub fn dispatched(&self) -> Vec<Dispatch> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatched_ids(&self) -> Vec<String> {
        self.dispatched()
            .into_iter()
            .map(|d| d.device.to_string())
            .collect()
    }
}

impl DeviceRegistry for InMemoryDevices {
    fn get_device(&self, id: &DeviceId) -> Option<Device> {
        self.store.lock().unwrap().get(id).cloned()
    }

    fn command(
        &self,
        id: &DeviceId,
        command: &Command,
    ) -> impl Future<Output = Result<(), RuleEngineError>> + Send {
        if let Some(device) = self.store.lock().unwrap().get_mut(id) {
            command.apply_to(device);
        }
        self.dispatched.lock().unwrap().push(Dispatch {
            device: id.clone(),
            command: command.clone(),
            at: self.started.elapsed(),
        });
        async { Ok(()) }
    }
}

// ── Sun times ──────────────────────────────────────────────────────

#[derive(Default)]
struct StubState {
    times: Option<SunTimes>,
    fail_next: bool,
    calls: usize,
    last_request: Option<(Location, NaiveDate)>,
}

#[derive(Clone, Default)]
pub struct StubSunSource(Arc<Mutex<StubState>>);

impl StubSunSource {
    pub fn succeeding(times: SunTimes) -> Self {
        let source = Self::default();
        source.0.lock().unwrap().times = Some(times);
        source
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.0.lock().unwrap().fail_next = true;
    }

    pub fn calls(&self) -> usize {
        self.0.lock().unwrap().calls
    }

    pub fn last_request(&self) -> Option<(Location, NaiveDate)> {
        self.0.lock().unwrap().last_request
    }
}

impl SunTimesSource for StubSunSource {
    fn fetch(
        &self,
        location: Location,
        date: NaiveDate,
    ) -> impl Future<Output = Result<SunTimes, SunTimesError>> + Send {
        let mut state = self.0.lock().unwrap();
        state.calls += 1;
        state.last_request = Some((location, date));
        let fail = std::mem::take(&mut state.fail_next);
        let result = match state.times {
            Some(times) if !fail => Ok(times),
            _ => Err(SunTimesError::Status("503 Service Unavailable".to_string())),
        };
        async move { result }
    }
}
