//! Flat, id-indexed sequence form.
//!
//! Settings payloads store a sequence as a map of entries linked by id:
//! `parent` entries list their `children`, `if`/`ifElse` entries point to
//! the `parent` entry holding each branch. [`FlatSequence::to_tree`] turns
//! that into an owned [`Sequence`] once, so execution never has to chase
//! links.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::device::Command;
use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::rule::{Condition, Entry, Sequence};

/// Entries keyed by their id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatSequence(HashMap<String, FlatEntry>);

/// One linked entry. `id` and `parentId` fields of the payload are ignored:
/// the map key is the id and parenthood is derived from `children`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlatEntry {
    Parent {
        #[serde(default)]
        children: Vec<String>,
    },
    Device {
        device: Vec<DeviceId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        brightness: Option<u16>,
    },
    Wait {
        wait: u64,
    },
    If {
        #[serde(default)]
        conditions: Vec<Condition>,
        #[serde(rename = "thenSeq")]
        then_seq: String,
    },
    IfElse {
        #[serde(default)]
        conditions: Vec<Condition>,
        #[serde(rename = "thenSeq")]
        then_seq: String,
        #[serde(rename = "elseSeq")]
        else_seq: String,
    },
}

impl FlatSequence {
    pub fn insert(&mut self, id: impl Into<String>, entry: FlatEntry) {
        self.0.insert(id.into(), entry);
    }

    /// Build the owned tree rooted at the `parent` entry `root`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DanglingEntry`] for a reference to an unknown id
    /// - [`ValidationError::CyclicEntry`] when an entry references an ancestor
    /// - [`ValidationError::SharedEntry`] when an entry has two parents
    /// - [`ValidationError::UnexpectedEntry`] when a branch does not point to a `parent`
    pub fn to_tree(&self, root: &str) -> Result<Sequence, ValidationError> {
        TreeBuilder {
            entries: &self.0,
            ancestors: Vec::new(),
            visited: HashSet::new(),
        }
        .sequence(root)
    }
}

/// Deserialize a rule sequence written either as a tree (a JSON array) or
/// in flat form, `{"root": "<parent id>", "entries": {..}}`.
pub(crate) fn deserialize_sequence<'de, D>(deserializer: D) -> Result<Sequence, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Form {
        Tree(Sequence),
        Flat { root: String, entries: FlatSequence },
    }

    match Form::deserialize(deserializer)? {
        Form::Tree(sequence) => Ok(sequence),
        Form::Flat { root, entries } => entries.to_tree(&root).map_err(serde::de::Error::custom),
    }
}

struct TreeBuilder<'a> {
    entries: &'a HashMap<String, FlatEntry>,
    ancestors: Vec<&'a str>,
    visited: HashSet<&'a str>,
}

impl<'a> TreeBuilder<'a> {
    fn lookup(&self, id: &str) -> Result<(&'a str, &'a FlatEntry), ValidationError> {
        self.entries
            .get_key_value(id)
            .map(|(key, entry)| (key.as_str(), entry))
            .ok_or_else(|| ValidationError::DanglingEntry(id.to_string()))
    }

    fn enter(&mut self, id: &'a str) -> Result<(), ValidationError> {
        if self.ancestors.contains(&id) {
            return Err(ValidationError::CyclicEntry(id.to_string()));
        }
        if !self.visited.insert(id) {
            return Err(ValidationError::SharedEntry(id.to_string()));
        }
        self.ancestors.push(id);
        Ok(())
    }

    fn sequence(&mut self, id: &str) -> Result<Sequence, ValidationError> {
        let (id, entry) = self.lookup(id)?;
        let FlatEntry::Parent { children } = entry else {
            return Err(ValidationError::UnexpectedEntry {
                id: id.to_string(),
                expected: "parent",
            });
        };
        self.enter(id)?;
        let sequence = children
            .iter()
            .map(|child| self.entry(child))
            .collect::<Result<Sequence, _>>()?;
        self.ancestors.pop();
        Ok(sequence)
    }

    fn entry(&mut self, id: &str) -> Result<Entry, ValidationError> {
        let (id, entry) = self.lookup(id)?;
        self.enter(id)?;
        let built = match entry {
            // nested parents are only reachable through if/ifElse
            FlatEntry::Parent { .. } => {
                return Err(ValidationError::UnexpectedEntry {
                    id: id.to_string(),
                    expected: "device, wait, if or ifElse",
                });
            }
            FlatEntry::Device {
                device,
                state,
                brightness,
            } => Entry::Device {
                devices: device.clone(),
                command: Command {
                    state: *state,
                    brightness: *brightness,
                },
            },
            FlatEntry::Wait { wait } => Entry::Wait { seconds: *wait },
            FlatEntry::If {
                conditions,
                then_seq,
            } => Entry::If {
                conditions: conditions.clone(),
                then: self.sequence(then_seq)?,
            },
            FlatEntry::IfElse {
                conditions,
                then_seq,
                else_seq,
            } => Entry::IfElse {
                conditions: conditions.clone(),
                then: self.sequence(then_seq)?,
                otherwise: self.sequence(else_seq)?,
            },
        };
        self.ancestors.pop();
        Ok(built)
    }
}
