//! src/app_settings.rs
//! ============================================================================
//! # Dialog preferences in the rc file
//!
//! The dialog session reads and writes its preferences through
//! [`DialogSettings`]; here that maps onto the `[FileDialog]` group of the
//! Valkyrie configuration store.

use crate::dialog::session::DialogSettings;
use vkconfig::VkConfig;

pub const DIALOG_GROUP: &str = "FileDialog";

impl DialogSettings for VkConfig {
    fn setting(&self, key: &str) -> Option<String> {
        self.read(key, DIALOG_GROUP).map(str::to_string)
    }

    fn store_setting(&mut self, key: &str, value: &str) {
        if self.read(key, DIALOG_GROUP) != Some(value) {
            self.write(value, key, DIALOG_GROUP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::session::DialogSession;
    use crate::dialog::sorted_list::SortKey;
    use crate::dialog::url::DialogUrl;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;
    use vkconfig::{Identity, InstallPaths, ObjectRegistry, StoreOptions};

    fn open(home: &TempDir) -> VkConfig {
        VkConfig::open_with(StoreOptions {
            home: Some(home.path().to_path_buf()),
            identity: Identity::with_version("1.1.0"),
            install: InstallPaths {
                vg_exec: PathBuf::from("/usr/bin/valgrind"),
                vg_supp_dir: home.path().join("supps"),
                ..InstallPaths::default()
            },
            objects: ObjectRegistry::builtin(),
        })
        .expect("open config")
    }

    #[test]
    fn session_survives_a_restart() {
        let home = TempDir::new().expect("tempdir");
        {
            let mut config = open(&home);
            let session = DialogSession {
                working_dir: Some(DialogUrl::local("/srv/data")),
                last_size: Some((120, 40)),
                show_hidden: true,
                detail_view: true,
                double_click_interval: Duration::from_millis(250),
                ..DialogSession::default()
            };
            session.save(&mut config);
            assert!(config.is_dirty());
            config.sync().expect("sync");
        }

        let config = open(&home);
        assert_eq!(config.read("show-hidden", DIALOG_GROUP), Some("true"));
        let session = DialogSession::load(&config);
        assert_eq!(session.working_dir, Some(DialogUrl::local("/srv/data")));
        assert_eq!(session.last_size, Some((120, 40)));
        assert!(session.show_hidden);
        assert!(session.detail_view);
        assert_eq!(session.sort.key, SortKey::default());
        assert_eq!(session.double_click_interval, Duration::from_millis(250));
    }

    #[test]
    fn unchanged_values_leave_store_clean() {
        let home = TempDir::new().expect("tempdir");
        let mut config = open(&home);
        config.write("false", "show-hidden", DIALOG_GROUP);
        config.sync().expect("sync");

        config.store_setting("show-hidden", "false");
        assert!(!config.is_dirty());
        config.store_setting("show-hidden", "true");
        assert!(config.is_dirty());
    }

    #[test]
    fn missing_group_gives_defaults() {
        let home = TempDir::new().expect("tempdir");
        let config = open(&home);
        assert_eq!(DialogSession::load(&config), DialogSession::default());
    }
}
