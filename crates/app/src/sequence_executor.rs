//! Sequence executor: runs a rule's entry tree.
//!
//! Entries run in order until the first `wait`; the remainder of that
//! branch continues in a task that sleeps first. Branches of `if` and
//! `ifElse` run the same way, so a `wait` inside a branch only delays that
//! branch and the parent carries on with its next entry immediately.
//! Device commands are fire-and-forget: each one is its own task and a
//! failure is only logged.

use std::sync::Arc;
use std::time::Duration;

use homerules_domain::device::Command;
use homerules_domain::id::{DeviceId, RuleId};
use homerules_domain::rule::{Condition, Entry, Sequence};
use tracing::{debug, info, warn};

use crate::condition_evaluator;
use crate::ports::{Clock, DeviceRegistry};
use crate::sun_times::SharedSunTimes;

/// Runs sequences against a device registry.
pub struct SequenceExecutor<D, C> {
    devices: Arc<D>,
    clock: Arc<C>,
    sun: SharedSunTimes,
}

impl<D, C> Clone for SequenceExecutor<D, C> {
    fn clone(&self) -> Self {
        Self {
            devices: Arc::clone(&self.devices),
            clock: Arc::clone(&self.clock),
            sun: self.sun.clone(),
        }
    }
}

impl<D: DeviceRegistry, C: Clock> SequenceExecutor<D, C> {
    pub fn new(devices: Arc<D>, clock: Arc<C>, sun: SharedSunTimes) -> Self {
        Self {
            devices,
            clock,
            sun,
        }
    }

    /// Start running `sequence` in the background and return immediately.
    ///
    /// Nothing cancels a running sequence; it runs to its last entry even if
    /// the rule set is replaced in the meantime.
    pub fn execute(&self, rule: &RuleId, sequence: &Sequence) {
        info!(rule = %rule, entries = sequence.node_count(), "running sequence");
        let executor = self.clone();
        let rule = rule.clone();
        let entries = sequence.entries().to_vec();
        tokio::spawn(async move { executor.walk(&rule, &entries) });
    }

    fn walk(&self, rule: &RuleId, entries: &[Entry]) {
        for (index, entry) in entries.iter().enumerate() {
            match entry {
                Entry::Device { devices, command } => self.dispatch(rule, devices, command),
                Entry::Wait { seconds } => {
                    debug!(rule = %rule, seconds, "waiting");
                    let executor = self.clone();
                    let rule = rule.clone();
                    let rest = entries[index + 1..].to_vec();
                    let delay = Duration::from_secs(*seconds);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        executor.walk(&rule, &rest);
                    });
                    return;
                }
                Entry::If { conditions, then } => {
                    if self.check(rule, conditions) {
                        self.walk(rule, then.entries());
                    }
                }
                Entry::IfElse {
                    conditions,
                    then,
                    otherwise,
                } => {
                    if self.check(rule, conditions) {
                        self.walk(rule, then.entries());
                    } else {
                        self.walk(rule, otherwise.entries());
                    }
                }
            }
        }
    }

    fn check(&self, rule: &RuleId, conditions: &[Condition]) -> bool {
        let sun = self.sun.get();
        let passed = condition_evaluator::evaluate(
            conditions,
            self.devices.as_ref(),
            &self.clock.now(),
            sun.as_ref(),
        );
        debug!(rule = %rule, conditions = conditions.len(), passed, "conditions evaluated");
        passed
    }

    fn dispatch(&self, rule: &RuleId, ids: &[DeviceId], command: &Command) {
        for id in ids {
            if self.devices.get_device(id).is_none() {
                debug!(rule = %rule, device = %id, "skipping unknown device");
                continue;
            }
            let devices = Arc::clone(&self.devices);
            let rule = rule.clone();
            let id = id.clone();
            let command = command.clone();
            tokio::spawn(async move {
                match devices.command(&id, &command).await {
                    Ok(()) => debug!(rule = %rule, device = %id, command = %command, "command sent"),
                    Err(err) => {
                        warn!(rule = %rule, device = %id, command = %command, error = %err, "command failed");
                    }
                }
            });
        }
    }
}
