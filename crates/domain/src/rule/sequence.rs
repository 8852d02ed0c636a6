//! Sequence: the owned tree of entries a rule runs when it fires.

use serde::{Deserialize, Serialize};

use crate::device::Command;
use crate::id::DeviceId;
use crate::rule::Condition;

/// Ordered list of [`Entry`] nodes. Branch entries own their sub-sequences,
/// so the tree is finite and acyclic by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(Vec<Entry>);

/// One node of a [`Sequence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entry {
    /// Send `command` to every listed device.
    Device {
        #[serde(rename = "device")]
        devices: Vec<DeviceId>,
        command: Command,
    },
    /// Pause the current branch.
    Wait {
        #[serde(rename = "wait")]
        seconds: u64,
    },
    /// Run `then` when every condition holds.
    If {
        #[serde(default)]
        conditions: Vec<Condition>,
        then: Sequence,
    },
    /// Run `then` when every condition holds, `otherwise` if not.
    IfElse {
        #[serde(default)]
        conditions: Vec<Condition>,
        then: Sequence,
        #[serde(rename = "else")]
        otherwise: Sequence,
    },
}

impl Sequence {
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        Self(entries)
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.0.iter()
    }

    /// Number of entries in the whole tree, branches included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.0
            .iter()
            .map(|entry| match entry {
                Entry::Device { .. } | Entry::Wait { .. } => 1,
                Entry::If { then, .. } => 1 + then.node_count(),
                Entry::IfElse {
                    then, otherwise, ..
                } => 1 + then.node_count() + otherwise.node_count(),
            })
            .sum()
    }
}

impl FromIterator<Entry> for Sequence {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Entry {
    /// Command `devices`.
    #[must_use]
    pub fn device<I, D>(devices: I, command: Command) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceId>,
    {
        Self::Device {
            devices: devices.into_iter().map(Into::into).collect(),
            command,
        }
    }

    #[must_use]
    pub fn wait(seconds: u64) -> Self {
        Self::Wait { seconds }
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device { devices, command } => {
                write!(f, "device([")?;
                for (i, id) in devices.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{id}")?;
                }
                write!(f, "], {command})")
            }
            Self::Wait { seconds } => write!(f, "wait({seconds}s)"),
            Self::If { conditions, then } => {
                write!(f, "if({} conditions, {} entries)", conditions.len(), then.len())
            }
            Self::IfElse {
                conditions,
                then,
                otherwise,
            } => write!(
                f,
                "if_else({} conditions, {} / {} entries)",
                conditions.len(),
                then.len(),
                otherwise.len()
            ),
        }
    }
}
