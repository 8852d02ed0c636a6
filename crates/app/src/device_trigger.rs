//! Device-trigger check: starts rules reacting to a device state change.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use homerules_domain::device::DeviceEvent;
use homerules_domain::id::RuleId;
use homerules_domain::rule::Rule;
use homerules_domain::sun::SunTimes;
use tracing::{debug, info, warn};

use crate::ports::{Clock, DeviceRegistry};
use crate::scheduler::ActiveRules;

/// Rules whose device trigger matches `event` at `now`.
///
/// A rule matches when it runs on `now`'s weekday, its trigger names the
/// event's device and state, and `now` falls inside the trigger window.
/// Rules with a malformed window are skipped with a warning.
pub fn matching_rules<Tz: TimeZone>(
    rules: &[Arc<Rule>],
    event: &DeviceEvent,
    now: &DateTime<Tz>,
    sun: Option<&SunTimes>,
) -> Vec<Arc<Rule>> {
    rules
        .iter()
        .filter(|rule| rule.trigger.matches_device(&event.device_id, event.state))
        .filter(|rule| rule.applies_on(now))
        .filter(|rule| match rule.trigger.window() {
            Ok(window) => {
                let inside = window.contains(now, sun);
                if !inside {
                    debug!(rule = %rule.id, window = %window, "device change outside trigger window");
                }
                inside
            }
            Err(err) => {
                warn!(rule = %rule.id, trigger = %rule.trigger, error = %err, "skipping rule with malformed window");
                false
            }
        })
        .cloned()
        .collect()
}

/// Start the sequence of every rule matching `event` and return their ids.
///
/// Synchronous: sequences are spawned and run in the background.
pub fn on_device_state_changed<D, C>(
    active: &ActiveRules<D, C>,
    event: &DeviceEvent,
    now: &DateTime<chrono::Local>,
    sun: Option<&SunTimes>,
) -> Vec<RuleId>
where
    D: DeviceRegistry,
    C: Clock,
{
    matching_rules(&active.rules, event, now, sun)
        .into_iter()
        .map(|rule| {
            info!(rule = %rule.id, device = %event.device_id, state = event.state, "device trigger matched");
            active.executor.execute(&rule.id, &rule.sequence);
            rule.id.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{local_sun_times, wednesday};
    use chrono::Weekday;
    use homerules_domain::device::Command;
    use homerules_domain::rule::{Entry, Trigger, Weekdays};

    fn rule(id: &str, device: &str, state: bool, time: Option<&str>) -> Arc<Rule> {
        Arc::new(
            Rule::builder()
                .id(id)
                .trigger(Trigger::Device {
                    device: device.into(),
                    state,
                    time: time.map(str::to_string),
                })
                .entry(Entry::device(["lamp"], Command::turn_on()))
                .build()
                .unwrap(),
        )
    }

    fn event(device: &str, state: bool) -> DeviceEvent {
        DeviceEvent {
            device_id: device.into(),
            state,
            brightness: None,
        }
    }

    fn ids(rules: &[Arc<Rule>]) -> Vec<&str> {
        rules.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn should_gate_on_trigger_window() {
        let rules = vec![rule("r", "sensor", true, Some("08:00-20:00"))];
        let matched = matching_rules(&rules, &event("sensor", true), &wednesday(9, 0), None);
        assert_eq!(ids(&matched), vec!["r"]);

        let matched = matching_rules(&rules, &event("sensor", true), &wednesday(21, 0), None);
        assert!(matched.is_empty());
    }

    #[test]
    fn should_match_whole_day_without_window() {
        let rules = vec![rule("r", "sensor", true, None)];
        for (hour, minute) in [(0, 0), (12, 0), (23, 59)] {
            let matched =
                matching_rules(&rules, &event("sensor", true), &wednesday(hour, minute), None);
            assert_eq!(matched.len(), 1, "at {hour}:{minute:02}");
        }
    }

    #[test]
    fn should_require_same_device_and_state() {
        let rules = vec![
            rule("on", "sensor", true, None),
            rule("off", "sensor", false, None),
            rule("other", "door", true, None),
        ];
        let matched = matching_rules(&rules, &event("sensor", false), &wednesday(9, 0), None);
        assert_eq!(ids(&matched), vec!["off"]);
    }

    #[test]
    fn should_respect_weekday_mask() {
        let mut weekend = (*rule("weekend", "sensor", true, None)).clone();
        weekend.weekdays = Weekdays::only(&[Weekday::Sat, Weekday::Sun]);
        let rules = vec![Arc::new(weekend)];
        assert!(matching_rules(&rules, &event("sensor", true), &wednesday(9, 0), None).is_empty());
    }

    #[test]
    fn should_match_overnight_window() {
        let rules = vec![rule("night", "sensor", true, Some("22:00 - 06:00"))];
        let trigger = |h| matching_rules(&rules, &event("sensor", true), &wednesday(h, 0), None);
        assert_eq!(trigger(23).len(), 1);
        assert_eq!(trigger(3).len(), 1);
        assert!(trigger(12).is_empty());
    }

    #[test]
    fn should_resolve_sun_keywords_in_window() {
        let rules = vec![rule("dark", "sensor", true, Some("sunset-sunrise"))];
        let sun = local_sun_times((5, 30), (21, 10));
        let at = |h| matching_rules(&rules, &event("sensor", true), &wednesday(h, 0), Some(&sun));
        assert_eq!(at(22).len(), 1);
        assert!(at(12).is_empty());
    }

    #[test]
    fn should_skip_malformed_window() {
        let mut broken = (*rule("broken", "sensor", true, None)).clone();
        broken.trigger = Trigger::Device {
            device: "sensor".into(),
            state: true,
            time: Some("morning".to_string()),
        };
        let rules = vec![Arc::new(broken), rule("fine", "sensor", true, None)];
        let matched = matching_rules(&rules, &event("sensor", true), &wednesday(9, 0), None);
        assert_eq!(ids(&matched), vec!["fine"]);
    }
}
