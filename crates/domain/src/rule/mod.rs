//! Rule: trigger → sequence, gated by a weekday mask.
//!
//! A [`Rule`] has exactly one [`Trigger`] deciding *when* it fires and one
//! root [`Sequence`] deciding *what happens*. Rules arrive wholesale from
//! an external settings update; the active set is replaced, never edited
//! in place.

mod condition;
mod flat;
mod sequence;
mod trigger;

pub use condition::Condition;
pub use flat::{FlatEntry, FlatSequence};
pub use sequence::{Entry, Sequence};
pub use trigger::{Schedule, Trigger};

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{RuleEngineError, ValidationError};
use crate::id::RuleId;

/// A rule that fires a sequence when its trigger matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub weekdays: Weekdays,
    pub trigger: Trigger,
    /// Accepts the flat, id-linked form too; always serialized as a tree.
    #[serde(deserialize_with = "flat::deserialize_sequence")]
    pub sequence: Sequence,
}

fn enabled_by_default() -> bool {
    true
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Validation`] when:
    /// - the sequence is empty ([`ValidationError::EmptySequence`])
    /// - a trigger time or window does not parse
    /// - a `range` condition anywhere in the tree does not parse
    pub fn validate(&self) -> Result<(), RuleEngineError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if self.sequence.is_empty() {
            return Err(ValidationError::EmptySequence.into());
        }
        self.trigger.validate()?;
        validate_conditions(&self.sequence)?;
        Ok(())
    }

    /// Whether the weekday mask lets this rule run on `date`'s weekday.
    #[must_use]
    pub fn applies_on<D: Datelike>(&self, date: &D) -> bool {
        self.weekdays.contains(date.weekday())
    }
}

fn validate_conditions(sequence: &Sequence) -> Result<(), ValidationError> {
    for entry in sequence {
        match entry {
            Entry::Device { .. } | Entry::Wait { .. } => {}
            Entry::If { conditions, then } => {
                conditions.iter().try_for_each(|c| c.window().map(drop))?;
                validate_conditions(then)?;
            }
            Entry::IfElse {
                conditions,
                then,
                otherwise,
            } => {
                conditions.iter().try_for_each(|c| c.window().map(drop))?;
                validate_conditions(then)?;
                validate_conditions(otherwise)?;
            }
        }
    }
    Ok(())
}

/// Seven-day eligibility mask, index 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<bool>", into = "Vec<bool>")]
pub struct Weekdays([bool; 7]);

impl Weekdays {
    pub const EVERY_DAY: Self = Self([true; 7]);

    #[must_use]
    pub fn new(mask: [bool; 7]) -> Self {
        Self(mask)
    }

    /// Mask enabling only the listed days.
    #[must_use]
    pub fn only(days: &[Weekday]) -> Self {
        let mut mask = [false; 7];
        for day in days {
            mask[day.num_days_from_sunday() as usize] = true;
        }
        Self(mask)
    }

    #[must_use]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_sunday() as usize]
    }
}

impl Default for Weekdays {
    fn default() -> Self {
        Self::EVERY_DAY
    }
}

impl TryFrom<Vec<bool>> for Weekdays {
    type Error = ValidationError;

    fn try_from(value: Vec<bool>) -> Result<Self, Self::Error> {
        let len = value.len();
        value
            .try_into()
            .map(Self)
            .map_err(|_| ValidationError::WeekdayMask(len))
    }
}

impl From<Weekdays> for Vec<bool> {
    fn from(value: Weekdays) -> Self {
        value.0.to_vec()
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    enabled: Option<bool>,
    weekdays: Option<Weekdays>,
    trigger: Option<Trigger>,
    entries: Vec<Entry>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<RuleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn weekdays(mut self, weekdays: Weekdays) -> Self {
        self.weekdays = Some(weekdays);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.entries.extend(sequence.entries().iter().cloned());
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`RuleEngineError::Validation`] if the trigger is missing or
    /// any invariant checked by [`Rule::validate`] fails.
    pub fn build(self) -> Result<Rule, RuleEngineError> {
        let rule = Rule {
            id: self.id.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            weekdays: self.weekdays.unwrap_or_default(),
            trigger: self.trigger.ok_or(ValidationError::MissingTrigger)?,
            sequence: Sequence::new(self.entries),
        };
        rule.validate()?;
        Ok(rule)
    }
}

/// A rule from a settings payload that could not be accepted.
#[derive(Debug)]
pub struct RejectedRule {
    /// Position in the payload.
    pub index: usize,
    /// The `id` field, when one could be read.
    pub id: Option<String>,
    pub reason: RejectReason,
}

/// Why a rule was rejected.
#[derive(Debug, thiserror::Error)]
pub enum RejectReason {
    #[error("malformed rule")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid rule")]
    Invalid(#[source] RuleEngineError),
}

/// Rules decoded from a settings payload, plus the ones that were skipped.
#[derive(Debug, Default)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub rejected: Vec<RejectedRule>,
}

impl RuleSet {
    /// Decode a JSON array of rules, one rule at a time.
    ///
    /// A malformed or invalid rule is recorded in [`rejected`](Self::rejected)
    /// and never prevents the other rules from loading. A payload that is
    /// not an array yields a single rejection.
    #[must_use]
    pub fn from_json(payload: serde_json::Value) -> Self {
        let items = match payload {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        let mut set = Self::default();
        for (index, item) in items.into_iter().enumerate() {
            let id = item
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            let reason = match serde_json::from_value::<Rule>(item) {
                Ok(rule) => match rule.validate() {
                    Ok(()) => {
                        set.rules.push(rule);
                        continue;
                    }
                    Err(err) => RejectReason::Invalid(err),
                },
                Err(err) => RejectReason::Malformed(err),
            };
            set.rejected.push(RejectedRule { index, id, reason });
        }
        set
    }
}
