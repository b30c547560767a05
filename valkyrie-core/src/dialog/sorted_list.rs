//! src/dialog/sorted_list.rs
//! ============================================================================
//! # SortedEntryList
//!
//! The dialog's in-memory listing. Entries are appended in arrival order and
//! re-sorted on demand with a stable sort, so equal keys keep arrival order.
//!
//! Ordering, in priority:
//! 1. `..` before everything,
//! 2. directories before files,
//! 3. the sort key, reversed when descending.

use crate::fs::url_info::UrlInfo;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Date,
    Unsorted,
}

impl SortKey {
    /// Sort key for a detail-view header column.
    pub fn for_column(column: usize) -> Self {
        match column {
            1 => SortKey::Size,
            3 => SortKey::Date,
            _ => SortKey::Name,
        }
    }

    /// Header column showing this key.
    pub fn column(self) -> usize {
        match self {
            SortKey::Size => 1,
            SortKey::Date => 3,
            SortKey::Name | SortKey::Unsorted => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Size => "size",
            SortKey::Date => "date",
            SortKey::Unsorted => "unsorted",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "size" => SortKey::Size,
            "date" => SortKey::Date,
            "unsorted" => SortKey::Unsorted,
            _ => SortKey::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            ascending: true,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, ascending: bool) -> Self {
        Self { key, ascending }
    }
}

/// Total order used for every listing.
pub fn compare_entries(a: &UrlInfo, b: &UrlInfo, spec: SortSpec) -> Ordering {
    match (a.is_parent_entry(), b.is_parent_entry()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match (a.is_dir, b.is_dir) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let ord = match spec.key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Date => a.modified.cmp(&b.modified),
        SortKey::Unsorted => Ordering::Equal,
    };

    if spec.ascending { ord } else { ord.reverse() }
}

#[derive(Debug, Clone, Default)]
pub struct SortedEntryList {
    entries: Vec<UrlInfo>,
}

impl SortedEntryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: UrlInfo) {
        self.entries.push(info);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&UrlInfo> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UrlInfo> {
        self.entries.iter()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&UrlInfo> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<UrlInfo> {
        let pos = self.position(name)?;
        Some(self.entries.remove(pos))
    }

    /// Renames an entry in place; `false` when `old` is not listed.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.name == old) {
            Some(entry) => {
                entry.name = new.into();
                true
            }
            None => false,
        }
    }

    pub fn sort(&mut self, spec: SortSpec) {
        self.entries.sort_by(|a, b| compare_entries(a, b, spec));
    }
}
