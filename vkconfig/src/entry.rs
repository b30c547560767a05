//! Keys and values of the in-memory settings map.

use compact_str::CompactString;
use std::collections::BTreeMap;
use std::fmt;

/// `(group, key)` identity of a setting. Field order gives group-major
/// ordering, which is the order entries are written back in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    pub group: CompactString,
    pub key: CompactString,
}

impl EntryKey {
    pub fn new(group: impl Into<CompactString>, key: impl Into<CompactString>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.group, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryData {
    pub value: String,
    /// Written this session and not yet flushed.
    pub dirty: bool,
}

impl EntryData {
    pub fn clean(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            dirty: false,
        }
    }

    pub fn dirty(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            dirty: true,
        }
    }
}

pub type EntryMap = BTreeMap<EntryKey, EntryData>;
