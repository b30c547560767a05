//! src/dialog/session.rs
//! ============================================================================
//! # DialogSession: preferences shared by every dialog of a process
//!
//! Created once by the application and handed to each dialog as a
//! [`SharedSession`]. A dialog reads the preferences when it opens and writes
//! back what the user changed (hidden files, sorting, view, working
//! directory) when it closes.
//!
//! Persistence goes through [`DialogSettings`] so the engine does not depend
//! on any particular settings store.

use crate::dialog::sorted_list::{SortKey, SortSpec};
use crate::dialog::url::DialogUrl;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

pub type SharedSession = Rc<RefCell<DialogSession>>;

pub const DEFAULT_DOUBLE_CLICK: Duration = Duration::from_millis(400);

/// Key/value access to wherever the preferences are persisted.
pub trait DialogSettings {
    fn setting(&self, key: &str) -> Option<String>;
    fn store_setting(&mut self, key: &str, value: &str);
}

mod keys {
    pub const WORKING_DIR: &str = "working-dir";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const SHOW_HIDDEN: &str = "show-hidden";
    pub const SORT_BY: &str = "sort-by";
    pub const SORT_ASCENDING: &str = "sort-ascending";
    pub const DETAIL_VIEW: &str = "detail-view";
    pub const DOUBLE_CLICK_MS: &str = "double-click-ms";
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogSession {
    pub working_dir: Option<DialogUrl>,
    pub last_size: Option<(u16, u16)>,
    pub show_hidden: bool,
    pub sort: SortSpec,
    pub detail_view: bool,
    pub double_click_interval: Duration,
}

impl Default for DialogSession {
    fn default() -> Self {
        Self {
            working_dir: None,
            last_size: None,
            show_hidden: false,
            sort: SortSpec::default(),
            detail_view: false,
            double_click_interval: DEFAULT_DOUBLE_CLICK,
        }
    }
}

impl DialogSession {
    pub fn shared(self) -> SharedSession {
        Rc::new(RefCell::new(self))
    }

    /// Session seeded from persisted settings; missing or malformed values
    /// keep their defaults.
    pub fn load<S: DialogSettings + ?Sized>(settings: &S) -> Self {
        let mut session = Self::default();

        if let Some(dir) = settings.setting(keys::WORKING_DIR).filter(|d| !d.is_empty()) {
            match DialogUrl::parse(&dir) {
                Ok(url) => session.working_dir = Some(url),
                Err(e) => debug!(%dir, error = %e, "Ignoring stored working directory"),
            }
        }

        let width = settings.setting(keys::WIDTH).and_then(|v| v.parse().ok());
        let height = settings.setting(keys::HEIGHT).and_then(|v| v.parse().ok());
        session.last_size = width.zip(height);

        if let Some(v) = settings.setting(keys::SHOW_HIDDEN) {
            session.show_hidden = parse_flag(&v);
        }
        if let Some(v) = settings.setting(keys::SORT_BY) {
            session.sort.key = SortKey::from_str_lossy(&v);
        }
        if let Some(v) = settings.setting(keys::SORT_ASCENDING) {
            session.sort.ascending = parse_flag(&v);
        }
        if let Some(v) = settings.setting(keys::DETAIL_VIEW) {
            session.detail_view = parse_flag(&v);
        }
        if let Some(ms) = settings
            .setting(keys::DOUBLE_CLICK_MS)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            session.double_click_interval = Duration::from_millis(ms);
        }

        session
    }

    pub fn save<S: DialogSettings + ?Sized>(&self, settings: &mut S) {
        let dir = self
            .working_dir
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        settings.store_setting(keys::WORKING_DIR, &dir);
        if let Some((w, h)) = self.last_size {
            settings.store_setting(keys::WIDTH, &w.to_string());
            settings.store_setting(keys::HEIGHT, &h.to_string());
        }
        settings.store_setting(keys::SHOW_HIDDEN, flag(self.show_hidden));
        settings.store_setting(keys::SORT_BY, self.sort.key.as_str());
        settings.store_setting(keys::SORT_ASCENDING, flag(self.sort.ascending));
        settings.store_setting(keys::DETAIL_VIEW, flag(self.detail_view));
        settings.store_setting(
            keys::DOUBLE_CLICK_MS,
            &self.double_click_interval.as_millis().to_string(),
        );
    }
}

fn flag(on: bool) -> &'static str {
    if on { "true" } else { "false" }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim(), "true" | "on" | "yes" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySettings(HashMap<String, String>);

    impl DialogSettings for MemorySettings {
        fn setting(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn store_setting(&mut self, key: &str, value: &str) {
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    #[test]
    fn empty_settings_give_defaults() {
        let session = DialogSession::load(&MemorySettings::default());
        assert_eq!(session, DialogSession::default());
    }

    #[test]
    fn save_then_load_restores_preferences() {
        let session = DialogSession {
            working_dir: Some(DialogUrl::local("/home/u/src")),
            last_size: Some((120, 40)),
            show_hidden: true,
            sort: SortSpec::new(SortKey::Date, false),
            detail_view: true,
            double_click_interval: Duration::from_millis(250),
        };
        let mut store = MemorySettings::default();
        session.save(&mut store);

        assert_eq!(DialogSession::load(&store), session);
    }

    #[test]
    fn malformed_values_fall_back() {
        let mut store = MemorySettings::default();
        store.store_setting("working-dir", "not a url");
        store.store_setting("double-click-ms", "0");
        store.store_setting("width", "80");

        let session = DialogSession::load(&store);
        assert_eq!(session.working_dir, None);
        assert_eq!(session.double_click_interval, DEFAULT_DOUBLE_CLICK);
        assert_eq!(session.last_size, None);
    }
}
