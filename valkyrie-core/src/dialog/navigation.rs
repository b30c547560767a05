//! src/dialog/navigation.rs
//! ============================================================================
//! # NavigationState
//!
//! Current and previous location, the back history and the directories
//! visited so far (the path bar's drop-down). The previous location is what
//! a failed listing rolls back to.

use crate::dialog::backend::ListingToken;
use crate::dialog::url::DialogUrl;
use std::collections::VecDeque;
use tracing::debug;

/// Entries kept in the back history.
pub const HISTORY_CAPACITY: usize = 64;

/// Distinct locations kept in the visited list; the oldest goes first.
pub const VISITED_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct NavigationState {
    current: DialogUrl,
    previous: DialogUrl,
    history: VecDeque<DialogUrl>,
    visited: Vec<DialogUrl>,
    in_flight: Option<ListingToken>,
}

impl NavigationState {
    pub fn new(start: DialogUrl) -> Self {
        Self {
            previous: start.clone(),
            current: start,
            history: VecDeque::new(),
            visited: Vec::new(),
            in_flight: None,
        }
    }

    pub fn current(&self) -> &DialogUrl {
        &self.current
    }

    pub fn previous(&self) -> &DialogUrl {
        &self.previous
    }

    /// Remembers the current location as the rollback target.
    pub fn mark_previous(&mut self) {
        self.previous = self.current.clone();
    }

    /// Switches location without touching the rollback target.
    pub fn set_current(&mut self, url: DialogUrl) {
        self.current = url;
    }

    /// Returns to the previous location. `false` when it equals the current one.
    pub fn roll_back(&mut self) -> bool {
        if self.current == self.previous {
            return false;
        }
        debug!(from = %self.current, to = %self.previous, "Rolling back location");
        let failed = std::mem::replace(&mut self.current, self.previous.clone());
        if self.history.back() == Some(&failed) {
            self.history.pop_back();
        }
        true
    }

    /// Records the current location as entered: appended to the history when
    /// it differs from the last entry, and added to the visited list.
    pub fn record_visit(&mut self) {
        if self.history.back() != Some(&self.current) {
            if self.history.len() == HISTORY_CAPACITY {
                self.history.pop_front();
            }
            self.history.push_back(self.current.clone());
        }
        if !self.visited.contains(&self.current) {
            if self.visited.len() == VISITED_CAPACITY {
                self.visited.remove(0);
            }
            self.visited.push(self.current.clone());
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    /// Drops the newest history entry and returns the one before it.
    pub fn pop_back(&mut self) -> Option<DialogUrl> {
        if !self.can_go_back() {
            return None;
        }
        self.history.pop_back();
        self.history.back().cloned()
    }

    pub fn history(&self) -> impl Iterator<Item = &DialogUrl> {
        self.history.iter()
    }

    pub fn visited(&self) -> &[DialogUrl] {
        &self.visited
    }

    // --------------------------------------------------------
    // In-flight listing
    // --------------------------------------------------------

    pub fn begin_listing(&mut self, token: ListingToken) {
        self.in_flight = Some(token);
    }

    pub fn end_listing(&mut self) {
        self.in_flight = None;
    }

    pub fn in_flight(&self) -> Option<ListingToken> {
        self.in_flight
    }

    /// Whether results for `token` belong to the listing being shown.
    pub fn is_current(&self, token: ListingToken) -> bool {
        self.in_flight == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(p: &str) -> DialogUrl {
        DialogUrl::local(p)
    }

    #[test]
    fn history_appends_only_on_change() {
        let mut nav = NavigationState::new(url("/a"));
        nav.record_visit();
        nav.record_visit();
        nav.set_current(url("/b"));
        nav.record_visit();
        assert_eq!(nav.history().count(), 2);
        assert_eq!(nav.visited().len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut nav = NavigationState::new(url("/"));
        for i in 0..(HISTORY_CAPACITY + 10) {
            nav.set_current(url(&format!("/d{i}")));
            nav.record_visit();
        }
        assert_eq!(nav.history().count(), HISTORY_CAPACITY);
        assert_eq!(nav.history().next(), Some(&url("/d10")));
    }

    #[test]
    fn visited_list_is_bounded() {
        let mut nav = NavigationState::new(url("/"));
        for i in 0..(VISITED_CAPACITY + 3) {
            nav.set_current(url(&format!("/v{i}")));
            nav.record_visit();
        }
        assert_eq!(nav.visited().len(), VISITED_CAPACITY);
        assert_eq!(nav.visited().first(), Some(&url("/v3")));
        assert_eq!(
            nav.visited().last(),
            Some(&url(&format!("/v{}", VISITED_CAPACITY + 2)))
        );
    }

    #[test]
    fn back_returns_previous_entry() {
        let mut nav = NavigationState::new(url("/a"));
        nav.record_visit();
        assert_eq!(nav.pop_back(), None);

        nav.set_current(url("/b"));
        nav.record_visit();
        assert_eq!(nav.pop_back(), Some(url("/a")));
        assert!(!nav.can_go_back());
    }

    #[test]
    fn roll_back_restores_previous_and_forgets_failed_entry() {
        let mut nav = NavigationState::new(url("/a"));
        nav.record_visit();
        nav.mark_previous();
        nav.set_current(url("/missing"));
        nav.record_visit();

        assert!(nav.roll_back());
        assert_eq!(nav.current(), &url("/a"));
        assert_eq!(nav.history().count(), 1);
        assert!(!nav.roll_back());
    }

    #[test]
    fn token_tracking() {
        let mut nav = NavigationState::new(url("/"));
        nav.begin_listing(ListingToken(1));
        nav.begin_listing(ListingToken(2));
        assert!(!nav.is_current(ListingToken(1)));
        assert!(nav.is_current(ListingToken(2)));
        nav.end_listing();
        assert!(!nav.is_current(ListingToken(2)));
    }
}
