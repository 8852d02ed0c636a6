//! Trigger scheduler: arms one timer per time, sunrise and sunset rule.
//!
//! Timers are one-shot and only cover the rest of the current day: a rule
//! whose firing time has already passed is simply not armed, and the daily
//! resync arms it again tomorrow. Every rebuild swaps the whole timer set
//! under one lock; the replaced set aborts its tasks when dropped, so
//! overlapping rebuilds never leave stale timers behind.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use homerules_domain::id::RuleId;
use homerules_domain::rule::{Rule, Schedule};
use homerules_domain::sun::SunTimes;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ports::{Clock, DeviceRegistry};
use crate::sequence_executor::SequenceExecutor;
use crate::sun_times::SharedSunTimes;

/// The enabled rules currently in force, with the executor that runs them.
pub struct ActiveRules<D, C> {
    pub rules: Vec<Arc<Rule>>,
    pub executor: SequenceExecutor<D, C>,
}

/// Snapshot of an armed timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerInfo {
    pub rule_id: RuleId,
    pub fires_at: DateTime<Local>,
    /// Delay the timer was armed with.
    pub delay: Duration,
}

struct ArmedTimer {
    info: TimerInfo,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerSet(Vec<ArmedTimer>);

impl Drop for TimerSet {
    fn drop(&mut self) {
        for timer in &self.0 {
            timer.handle.abort();
        }
    }
}

/// Owns the active rule set and its armed timers.
pub struct TriggerScheduler<D, C> {
    clock: Arc<C>,
    sun: SharedSunTimes,
    active: RwLock<Arc<ActiveRules<D, C>>>,
    timers: Mutex<TimerSet>,
}

impl<D: DeviceRegistry, C: Clock> TriggerScheduler<D, C> {
    /// Scheduler with no rules and nothing armed.
    pub fn new(devices: Arc<D>, clock: Arc<C>, sun: SharedSunTimes) -> Self {
        let executor = SequenceExecutor::new(devices, Arc::clone(&clock), sun.clone());
        Self {
            clock,
            sun,
            active: RwLock::new(Arc::new(ActiveRules {
                rules: Vec::new(),
                executor,
            })),
            timers: Mutex::new(TimerSet::default()),
        }
    }

    /// The rule set in force. Cheap, lock held only for the clone.
    #[must_use]
    pub fn active(&self) -> Arc<ActiveRules<D, C>> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the rule set and device registry, then rebuild the timers.
    ///
    /// Disabled rules are dropped here and never looked at again. Returns the
    /// number of timers armed.
    #[tracing::instrument(skip_all, fields(rules = rules.len()))]
    pub fn set_active_rules(&self, rules: Vec<Rule>, devices: Arc<D>) -> usize {
        let rules: Vec<Arc<Rule>> = rules
            .into_iter()
            .filter(|rule| {
                if !rule.enabled {
                    debug!(rule = %rule.id, "ignoring disabled rule");
                }
                rule.enabled
            })
            .map(Arc::new)
            .collect();
        info!(enabled = rules.len(), "activating rules");
        let executor = SequenceExecutor::new(devices, Arc::clone(&self.clock), self.sun.clone());
        *self.active.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(ActiveRules { rules, executor });
        self.rebuild()
    }

    /// Cancel every timer and arm fresh ones for the rest of today.
    ///
    /// Returns the number of timers armed.
    #[tracing::instrument(skip(self))]
    pub fn rebuild(&self) -> usize {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let active = self.active();
        let now = self.clock.now();
        let sun = self.sun.get();

        let mut armed = Vec::new();
        for rule in &active.rules {
            if !rule.applies_on(&now) {
                debug!(rule = %rule.id, weekday = %now.format("%a"), "rule not scheduled today");
                continue;
            }
            let schedule = match rule.trigger.schedule() {
                Ok(Some(schedule)) => schedule,
                Ok(None) => continue,
                Err(err) => {
                    warn!(rule = %rule.id, trigger = %rule.trigger, error = %err, "skipping rule with malformed trigger");
                    continue;
                }
            };
            let Some(fires_at) = firing_time(schedule, &now, sun.as_ref()) else {
                debug!(rule = %rule.id, trigger = %rule.trigger, "no firing time today");
                continue;
            };
            let delay = match (fires_at - now).to_std() {
                Ok(delay) if !delay.is_zero() => delay,
                _ => {
                    debug!(rule = %rule.id, fires_at = %fires_at, "firing time already passed");
                    continue;
                }
            };

            let executor = active.executor.clone();
            let fired = Arc::clone(rule);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                info!(rule = %fired.id, trigger = %fired.trigger, "timer fired");
                executor.execute(&fired.id, &fired.sequence);
            });
            debug!(rule = %rule.id, fires_at = %fires_at, delay_secs = delay.as_secs(), "timer armed");
            armed.push(ArmedTimer {
                info: TimerInfo {
                    rule_id: rule.id.clone(),
                    fires_at,
                    delay,
                },
                handle,
            });
        }

        let count = armed.len();
        *timers = TimerSet(armed);
        info!(armed = count, "timers rebuilt");
        count
    }

    /// Timers that have not fired yet.
    #[must_use]
    pub fn armed(&self) -> Vec<TimerInfo> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .0
            .iter()
            .filter(|timer| !timer.handle.is_finished())
            .map(|timer| timer.info.clone())
            .collect()
    }

    /// Cancel every armed timer.
    pub fn clear(&self) {
        *self.timers.lock().unwrap_or_else(PoisonError::into_inner) = TimerSet::default();
    }
}

/// Today's firing instant of `schedule`, in `now`'s time zone.
///
/// `None` for a sun schedule while no sun times are known or when its offset
/// overflows, and for a wall-clock time skipped by a DST transition.
fn firing_time<Tz: TimeZone>(
    schedule: Schedule,
    now: &DateTime<Tz>,
    sun: Option<&SunTimes>,
) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    match schedule {
        Schedule::At(time) => tz
            .from_local_datetime(&now.date_naive().and_time(time))
            .earliest(),
        Schedule::Sun { event, offset } => sun.and_then(|times| {
            let fires_at = times
                .at(event)
                .with_timezone(&tz)
                .checked_add_signed(offset);
            if fires_at.is_none() {
                warn!(offset_secs = offset.num_seconds(), "sun offset out of range, not arming");
            }
            fires_at
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryDevices, TestClock, local, local_sun_times, wednesday};
    use chrono::{TimeDelta, Weekday};
    use homerules_domain::device::Command;
    use homerules_domain::rule::{Entry, Trigger, Weekdays};

    fn scheduler(
        hour: u32,
        minute: u32,
        sun: SharedSunTimes,
    ) -> (TriggerScheduler<InMemoryDevices, TestClock>, Arc<InMemoryDevices>) {
        let devices = InMemoryDevices::switches(&[("lamp", false)]);
        let clock = Arc::new(TestClock::at(wednesday(hour, minute)));
        (
            TriggerScheduler::new(Arc::clone(&devices), clock, sun),
            devices,
        )
    }

    fn rule(id: &str, trigger: Trigger) -> Rule {
        Rule::builder()
            .id(id)
            .trigger(trigger)
            .entry(Entry::device(["lamp"], Command::turn_on()))
            .build()
            .unwrap()
    }

    fn rule_on(id: &str, device: &str, trigger: Trigger) -> Rule {
        Rule::builder()
            .id(id)
            .trigger(trigger)
            .entry(Entry::device([device], Command::turn_on()))
            .build()
            .unwrap()
    }

    fn at(time: &str) -> Trigger {
        Trigger::Time {
            time: time.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_arm_one_timer_for_future_time_rule() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        let armed = scheduler.set_active_rules(vec![rule("evening", at("18:30"))], devices);

        assert_eq!(armed, 1);
        let timers = scheduler.armed();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].rule_id.as_str(), "evening");
        assert_eq!(timers[0].delay, Duration::from_secs(6 * 3600 + 30 * 60));
        assert_eq!(timers[0].fires_at, wednesday(18, 30));
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_arm_past_time_rule() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        let armed = scheduler.set_active_rules(
            vec![rule("morning", at("07:00")), rule("noon", at("12:00"))],
            devices,
        );
        assert_eq!(armed, 0);
        assert!(scheduler.armed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_replace_timers_on_consecutive_updates() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        scheduler.set_active_rules(vec![rule("a", at("13:00"))], Arc::clone(&devices));
        scheduler.set_active_rules(vec![rule("a", at("13:00"))], Arc::clone(&devices));

        assert_eq!(scheduler.armed().len(), 1);

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert_eq!(devices.dispatched_ids(), vec!["lamp"]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_cancel_timers_of_replaced_rules() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        scheduler.set_active_rules(vec![rule("a", at("13:00"))], Arc::clone(&devices));
        scheduler.set_active_rules(Vec::new(), Arc::clone(&devices));

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert!(devices.dispatched().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_sequence_when_timer_fires() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        scheduler.set_active_rules(vec![rule("a", at("12:01"))], Arc::clone(&devices));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(devices.dispatched().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let dispatched = devices.dispatched();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].at, Duration::from_secs(60));
        assert!(scheduler.armed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_apply_offset_to_sun_events() {
        let sun = SharedSunTimes::with(local_sun_times((5, 30), (21, 10)));
        let (scheduler, devices) = scheduler(12, 0, sun);
        scheduler.set_active_rules(
            vec![
                rule("dusk", Trigger::Sunset { offset: -600 }),
                rule("dawn", Trigger::Sunrise { offset: 1800 }),
            ],
            devices,
        );

        let timers = scheduler.armed();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].rule_id.as_str(), "dusk");
        assert_eq!(timers[0].fires_at, wednesday(21, 0));
        assert_eq!(timers[0].delay, Duration::from_secs(9 * 3600));
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_sun_rules_without_sun_times() {
        let (scheduler, devices) = scheduler(4, 0, SharedSunTimes::default());
        let armed = scheduler.set_active_rules(
            vec![
                rule("dawn", Trigger::Sunrise { offset: 0 }),
                rule("later", at("05:00")),
            ],
            devices,
        );
        assert_eq!(armed, 1);
        assert_eq!(scheduler.armed()[0].rule_id.as_str(), "later");
    }

    #[tokio::test(start_paused = true)]
    async fn should_respect_weekday_mask() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        let mut weekend = rule("weekend", at("18:00"));
        weekend.weekdays = Weekdays::only(&[Weekday::Sat, Weekday::Sun]);
        let mut midweek = rule("midweek", at("18:00"));
        midweek.weekdays = Weekdays::only(&[Weekday::Wed]);

        scheduler.set_active_rules(vec![weekend, midweek], devices);

        let timers = scheduler.armed();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].rule_id.as_str(), "midweek");
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_disabled_rules() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        let mut disabled = rule("off", at("18:00"));
        disabled.enabled = false;

        assert_eq!(scheduler.set_active_rules(vec![disabled], devices), 0);
        assert!(scheduler.active().rules.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_malformed_rule_and_keep_others() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        let mut broken = rule("broken", at("20:00"));
        broken.trigger = at("25:99");
        let armed = scheduler.set_active_rules(vec![broken, rule("fine", at("20:00"))], devices);
        assert_eq!(armed, 1);
        assert_eq!(scheduler.armed()[0].rule_id.as_str(), "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_arm_device_rules() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        let trigger = Trigger::Device {
            device: "lamp".into(),
            state: true,
            time: None,
        };
        assert_eq!(scheduler.set_active_rules(vec![rule("d", trigger)], devices), 0);
        assert_eq!(scheduler.active().rules.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_drop_all_timers_on_clear() {
        let (scheduler, devices) = scheduler(12, 0, SharedSunTimes::default());
        scheduler.set_active_rules(vec![rule("a", at("13:00"))], Arc::clone(&devices));
        scheduler.clear();

        assert!(scheduler.armed().is_empty());
        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert!(devices.dispatched().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_sun_rule_with_out_of_range_offset() {
        let sun = SharedSunTimes::with(local_sun_times((5, 30), (21, 10)));
        let (scheduler, devices) = scheduler(12, 0, sun);
        let mut far = rule("far", Trigger::Sunset { offset: 0 });
        far.trigger = Trigger::Sunset {
            offset: 9_000_000_000_000_000,
        };
        let armed = scheduler.set_active_rules(
            vec![far, rule("dusk", Trigger::Sunset { offset: 0 })],
            devices,
        );
        assert_eq!(armed, 1);
        assert_eq!(scheduler.armed()[0].rule_id.as_str(), "dusk");
    }

    #[test]
    fn should_not_overflow_when_offset_exceeds_calendar() {
        let sun = local_sun_times((5, 30), (21, 10));
        let schedule = Schedule::Sun {
            event: homerules_domain::sun::SunEvent::Sunset,
            offset: TimeDelta::try_seconds(i64::MAX / 1000).unwrap(),
        };
        assert_eq!(firing_time(schedule, &wednesday(1, 0), Some(&sun)), None);
    }

    #[test]
    fn should_not_fire_time_skipped_by_spring_forward() {
        use chrono_tz::America::Moncton;

        let now = Moncton.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap();
        let skipped = Schedule::At(chrono::NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(firing_time(skipped, &now, None), None);

        let after = Schedule::At(chrono::NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        let fires_at = firing_time(after, &now, None).unwrap();
        assert_eq!(fires_at - now, TimeDelta::hours(2));
    }

    #[test]
    fn should_fire_repeated_fall_back_time_at_first_occurrence() {
        use chrono_tz::America::Moncton;

        let now = Moncton.with_ymd_and_hms(2024, 11, 3, 0, 0, 0).unwrap();
        let repeated = Schedule::At(chrono::NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        let fires_at = firing_time(repeated, &now, None).unwrap();
        assert_eq!(fires_at - now, TimeDelta::minutes(90));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_arm_each_rule_once_under_concurrent_rebuilds() {
        let devices = InMemoryDevices::switches(&[("lamp", false), ("fan", false)]);
        let clock = Arc::new(TestClock::at(local(2024, 6, 12, 12, 0, 58)));
        let scheduler = Arc::new(TriggerScheduler::new(
            Arc::clone(&devices),
            clock,
            SharedSunTimes::default(),
        ));
        let rules = vec![
            rule_on("a", "lamp", at("12:01")),
            rule_on("b", "fan", at("12:01")),
        ];

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let scheduler = Arc::clone(&scheduler);
                let devices = Arc::clone(&devices);
                let rules = rules.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        scheduler.set_active_rules(rules, devices);
                    } else {
                        scheduler.rebuild();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut armed: Vec<_> = scheduler
            .armed()
            .into_iter()
            .map(|timer| timer.rule_id.to_string())
            .collect();
        armed.sort();
        assert_eq!(armed, vec!["a", "b"]);

        tokio::time::sleep(Duration::from_secs(4)).await;
        let mut dispatched = devices.dispatched_ids();
        dispatched.sort();
        assert_eq!(dispatched, vec!["fan", "lamp"]);
    }

    #[test]
    fn should_compute_sun_firing_time_with_offset() {
        let sun = local_sun_times((5, 30), (21, 10));
        let schedule = Schedule::Sun {
            event: homerules_domain::sun::SunEvent::Sunrise,
            offset: TimeDelta::minutes(-30),
        };
        assert_eq!(
            firing_time(schedule, &wednesday(1, 0), Some(&sun)),
            Some(wednesday(5, 0))
        );
    }
}
