//! Rule engine: the facade a host drives.
//!
//! Wires the astronomical time provider, the trigger scheduler and the
//! device-trigger check together, and owns the daily resync task that
//! refreshes sun times and re-arms the timers at every local midnight.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::{DateTime, Local, NaiveDate};

use homerules_domain::device::DeviceEvent;
use homerules_domain::id::RuleId;
use homerules_domain::rule::Rule;
use homerules_domain::sun::{Location, SunTimes};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device_trigger;
use crate::ports::{Clock, DeviceRegistry, SunTimesSource};
use crate::scheduler::{TimerInfo, TriggerScheduler};
use crate::sun_times::{AstronomicalTimeProvider, next_local_midnight};

struct Inner<D, S, C> {
    clock: Arc<C>,
    provider: AstronomicalTimeProvider<S>,
    scheduler: TriggerScheduler<D, C>,
    daily: Mutex<Option<JoinHandle<()>>>,
}

impl<D: DeviceRegistry, S: SunTimesSource, C: Clock> Inner<D, S, C> {
    async fn resync(&self, date: NaiveDate) -> usize {
        self.provider.refresh(date).await;
        self.scheduler.rebuild()
    }
}

/// Home automation rule engine.
///
/// Cheap to clone; clones share the same state.
pub struct RuleEngine<D, S, C> {
    inner: Arc<Inner<D, S, C>>,
}

impl<D, S, C> Clone for RuleEngine<D, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D, S, C> RuleEngine<D, S, C>
where
    D: DeviceRegistry,
    S: SunTimesSource,
    C: Clock,
{
    /// Create an engine with no rules. Nothing runs until [`start`](Self::start).
    pub fn new(devices: Arc<D>, source: S, clock: C, location: Location) -> Self {
        let clock = Arc::new(clock);
        let provider = AstronomicalTimeProvider::new(source, location);
        let scheduler = TriggerScheduler::new(devices, Arc::clone(&clock), provider.shared());
        Self {
            inner: Arc::new(Inner {
                clock,
                provider,
                scheduler,
                daily: Mutex::new(None),
            }),
        }
    }

    /// Replace the active rule set and device registry, then re-arm timers.
    ///
    /// Returns the number of timers armed.
    pub fn set_active_rules(&self, rules: Vec<Rule>, devices: Arc<D>) -> usize {
        self.inner.scheduler.set_active_rules(rules, devices)
    }

    /// Start every device-triggered rule matching `event`.
    ///
    /// Returns the ids of the rules whose sequence was started.
    #[tracing::instrument(skip_all, fields(device = %event.device_id, state = event.state))]
    pub fn on_device_state_changed(&self, event: &DeviceEvent) -> Vec<RuleId> {
        let active = self.inner.scheduler.active();
        let now = self.inner.clock.now();
        let sun = self.inner.provider.current();
        let started = device_trigger::on_device_state_changed(&active, event, &now, sun.as_ref());
        debug!(started = started.len(), "device event handled");
        started
    }

    /// Refresh sun times, arm today's timers and start the daily resync.
    ///
    /// Returns the number of timers armed. Calling it again restarts the
    /// daily task.
    pub async fn start(&self) -> usize {
        let armed = self.resync().await;
        let first = next_local_midnight(&self.inner.clock.now());
        let handle = tokio::spawn(daily_resync(Arc::downgrade(&self.inner), first));
        if let Some(previous) = self
            .inner
            .daily
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
        info!(armed, next_resync = %first, "rule engine started");
        armed
    }

    /// Refresh sun times for today and rebuild every timer.
    #[tracing::instrument(skip(self))]
    pub async fn resync(&self) -> usize {
        let today = self.inner.clock.now().date_naive();
        self.inner.resync(today).await
    }

    /// Stop the daily resync and cancel every armed timer.
    ///
    /// Sequences already running are left to finish.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .inner
            .daily
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.inner.scheduler.clear();
        info!("rule engine stopped");
    }

    /// Timers armed for the rest of today.
    #[must_use]
    pub fn armed(&self) -> Vec<TimerInfo> {
        self.inner.scheduler.armed()
    }

    /// Latest known sun times.
    #[must_use]
    pub fn sun_times(&self) -> Option<SunTimes> {
        self.inner.provider.current()
    }

    /// Forward every event received on `receiver` to
    /// [`on_device_state_changed`](Self::on_device_state_changed).
    ///
    /// The task ends when the channel closes.
    pub fn listen(&self, mut receiver: broadcast::Receiver<DeviceEvent>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        engine.on_device_state_changed(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "device event listener lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("device event channel closed");
                        break;
                    }
                }
            }
        })
    }
}

/// Sleep until each local midnight, then refresh and rebuild.
///
/// Holds a weak handle so a dropped engine ends the loop.
async fn daily_resync<D, S, C>(weak: Weak<Inner<D, S, C>>, mut target: DateTime<Local>)
where
    D: DeviceRegistry,
    S: SunTimesSource,
    C: Clock,
{
    loop {
        if !wait_for_wall_clock(&weak, &target).await {
            break;
        }
        let Some(inner) = weak.upgrade() else { break };
        let armed = inner.resync(target.date_naive()).await;
        info!(armed, midnight = %target, "daily resync done");
        target = next_local_midnight(&inner.clock.now());
    }
}

/// Sleep until the engine's clock reads `target` or later.
///
/// Timers run on the monotonic clock, which may run ahead of the wall clock,
/// so one sleep is not enough to be past midnight. Returns `false` once the
/// engine is dropped.
async fn wait_for_wall_clock<D, S, C>(
    weak: &Weak<Inner<D, S, C>>,
    target: &DateTime<Local>,
) -> bool
where
    C: Clock,
{
    loop {
        let remaining = {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            *target - inner.clock.now()
        };
        match remaining.to_std() {
            Ok(delay) if !delay.is_zero() => tokio::time::sleep(delay).await,
            _ => return true,
        }
    }
}
