//! src/dialog/projection.rs
//! ============================================================================
//! # ViewProjection: detail and compact views over one listing
//!
//! Both views hold lightweight items pointing into the `SortedEntryList`
//! (by index) and at their twin in the other view. Selection is written
//! through both sides at once, so the two views can never disagree about
//! what is selected. The projection is rebuilt whenever the listing is
//! re-sorted; indices are only valid until then.

use crate::dialog::sorted_list::SortedEntryList;
use crate::fs::url_info::UrlInfo;

/// Which of the two views an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    Detail,
    #[default]
    Compact,
}

impl ViewKind {
    pub fn other(self) -> Self {
        match self {
            ViewKind::Detail => ViewKind::Compact,
            ViewKind::Compact => ViewKind::Detail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailItem {
    /// Index into the sorted listing.
    pub entry: usize,
    /// Row of the twin item in the compact view.
    pub compact: usize,
    pub selectable: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactItem {
    pub entry: usize,
    /// Row of the twin item in the detail view.
    pub detail: usize,
    pub selectable: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ViewProjection {
    detail: Vec<DetailItem>,
    compact: Vec<CompactItem>,
    /// Current row, in detail-view coordinates.
    current: Option<usize>,
    multi: bool,
}

impl ViewProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extended (multi) selection instead of single selection.
    pub fn set_multi_selection(&mut self, multi: bool) {
        self.multi = multi;
        if !multi {
            let keep = self.selected_rows().first().copied();
            self.clear_selection();
            if let Some(row) = keep {
                self.write_selected(row, true);
            }
        }
    }

    pub fn is_multi_selection(&self) -> bool {
        self.multi
    }

    pub fn clear(&mut self) {
        self.detail.clear();
        self.compact.clear();
        self.current = None;
    }

    /// Recreates both views from the listing.
    pub fn rebuild<F>(&mut self, list: &SortedEntryList, selectable: F)
    where
        F: Fn(&UrlInfo) -> bool,
    {
        self.clear();
        for (index, info) in list.iter().enumerate() {
            self.append(index, selectable(info));
        }
    }

    /// Adds one listing entry at the end of both views.
    pub fn append(&mut self, entry: usize, selectable: bool) {
        let detail_row = self.detail.len();
        let compact_row = self.compact.len();
        self.detail.push(DetailItem {
            entry,
            compact: compact_row,
            selectable,
            selected: false,
        });
        self.compact.push(CompactItem {
            entry,
            detail: detail_row,
            selectable,
            selected: false,
        });
    }

    pub fn len(&self) -> usize {
        self.detail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detail.is_empty()
    }

    pub fn detail(&self) -> &[DetailItem] {
        &self.detail
    }

    pub fn compact(&self) -> &[CompactItem] {
        &self.compact
    }

    /// Detail row for a row of `view`.
    pub fn to_detail_row(&self, view: ViewKind, row: usize) -> Option<usize> {
        match view {
            ViewKind::Detail => (row < self.detail.len()).then_some(row),
            ViewKind::Compact => self.compact.get(row).map(|item| item.detail),
        }
    }

    /// Row in `view` for a detail row.
    pub fn from_detail_row(&self, view: ViewKind, row: usize) -> Option<usize> {
        match view {
            ViewKind::Detail => (row < self.detail.len()).then_some(row),
            ViewKind::Compact => self.detail.get(row).map(|item| item.compact),
        }
    }

    /// Listing index behind a row of `view`.
    pub fn entry_at(&self, view: ViewKind, row: usize) -> Option<usize> {
        let row = self.to_detail_row(view, row)?;
        self.detail.get(row).map(|item| item.entry)
    }

    pub fn row_for_entry(&self, entry: usize) -> Option<usize> {
        self.detail.iter().position(|item| item.entry == entry)
    }

    pub fn is_selectable(&self, view: ViewKind, row: usize) -> bool {
        self.to_detail_row(view, row)
            .and_then(|r| self.detail.get(r))
            .is_some_and(|item| item.selectable)
    }

    pub fn is_selected(&self, view: ViewKind, row: usize) -> bool {
        match view {
            ViewKind::Detail => self.detail.get(row).is_some_and(|item| item.selected),
            ViewKind::Compact => self.compact.get(row).is_some_and(|item| item.selected),
        }
    }

    // --------------------------------------------------------
    // Current item
    // --------------------------------------------------------

    pub fn set_current(&mut self, view: ViewKind, row: usize) -> bool {
        match self.to_detail_row(view, row) {
            Some(detail_row) => {
                self.current = Some(detail_row);
                true
            }
            None => false,
        }
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Current row as seen by `view`.
    pub fn current(&self, view: ViewKind) -> Option<usize> {
        self.current
            .and_then(|row| self.from_detail_row(view, row))
    }

    pub fn current_entry(&self) -> Option<usize> {
        self.current
            .and_then(|row| self.detail.get(row))
            .map(|item| item.entry)
    }

    // --------------------------------------------------------
    // Selection
    // --------------------------------------------------------

    /// Selects or deselects a row. Unselectable rows are never selected;
    /// in single-selection mode selecting a row deselects every other one.
    pub fn set_selected(&mut self, view: ViewKind, row: usize, on: bool) -> bool {
        let Some(detail_row) = self.to_detail_row(view, row) else {
            return false;
        };
        if on && !self.detail[detail_row].selectable {
            return false;
        }
        if on && !self.multi {
            self.clear_selection();
        }
        self.write_selected(detail_row, on);
        true
    }

    pub fn toggle_selected(&mut self, view: ViewKind, row: usize) -> bool {
        let on = !self.is_selected(view, row);
        self.set_selected(view, row, on)
    }

    pub fn clear_selection(&mut self) {
        for item in &mut self.detail {
            item.selected = false;
        }
        for item in &mut self.compact {
            item.selected = false;
        }
    }

    /// Selects or deselects every selectable row (multi-selection only).
    pub fn select_all(&mut self, on: bool) {
        if !self.multi {
            return;
        }
        for row in 0..self.detail.len() {
            if !on || self.detail[row].selectable {
                self.write_selected(row, on);
            }
        }
    }

    /// Selected rows in detail order.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.detail
            .iter()
            .enumerate()
            .filter(|(_, item)| item.selected)
            .map(|(row, _)| row)
            .collect()
    }

    /// Listing indices of the selected rows in detail order.
    pub fn selected_entries(&self) -> Vec<usize> {
        self.detail
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.entry)
            .collect()
    }

    fn write_selected(&mut self, detail_row: usize, on: bool) {
        let twin = self.detail[detail_row].compact;
        self.detail[detail_row].selected = on;
        if let Some(item) = self.compact.get_mut(twin) {
            item.selected = on;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn listing() -> SortedEntryList {
        let mut list = SortedEntryList::new();
        list.push(UrlInfo::parent_entry());
        list.push(UrlInfo::dir("src"));
        list.push(UrlInfo::file("a.txt", 1));
        list.push(UrlInfo::file("b.txt", 2));
        list
    }

    fn files_only(info: &UrlInfo) -> bool {
        !info.is_dir
    }

    #[test]
    fn back_references_point_at_twins() {
        let mut views = ViewProjection::new();
        views.rebuild(&listing(), files_only);

        assert_eq!(views.len(), 4);
        for (row, item) in views.detail().iter().enumerate() {
            let twin = views.compact()[item.compact];
            assert_eq!(twin.detail, row);
            assert_eq!(twin.entry, item.entry);
        }
    }

    #[test]
    fn selection_is_mirrored_in_both_views() {
        let mut views = ViewProjection::new();
        views.rebuild(&listing(), files_only);

        assert!(views.set_selected(ViewKind::Compact, 2, true));
        assert!(views.is_selected(ViewKind::Detail, 2));

        assert!(views.set_selected(ViewKind::Detail, 3, true));
        assert!(!views.is_selected(ViewKind::Compact, 2), "single selection");
        assert!(views.is_selected(ViewKind::Compact, 3));
    }

    #[test]
    fn unselectable_rows_stay_unselected() {
        let mut views = ViewProjection::new();
        views.rebuild(&listing(), files_only);

        assert!(!views.set_selected(ViewKind::Detail, 1, true));
        assert!(!views.is_selected(ViewKind::Compact, 1));
        assert!(views.set_current(ViewKind::Detail, 1));
        assert_eq!(views.current_entry(), Some(1));
    }

    #[test]
    fn multi_selection_and_select_all() {
        let mut views = ViewProjection::new();
        views.rebuild(&listing(), files_only);
        views.set_multi_selection(true);

        views.select_all(true);
        assert_eq!(views.selected_entries(), vec![2, 3]);

        views.toggle_selected(ViewKind::Compact, 2);
        assert_eq!(views.selected_rows(), vec![3]);

        views.select_all(false);
        assert!(views.selected_rows().is_empty());
    }

    #[test]
    fn leaving_multi_selection_keeps_one_row() {
        let mut views = ViewProjection::new();
        views.rebuild(&listing(), files_only);
        views.set_multi_selection(true);
        views.select_all(true);

        views.set_multi_selection(false);
        assert_eq!(views.selected_rows(), vec![2]);
    }
}
