//! Product identity, install locations and the per-user rc tree.
//!
//! ```text
//! ~/.valkyrie-<version>/
//!     valkyrierc
//!     dbase/
//!     logs/
//!     suppressions/
//! ```

use crate::error::{ConfigError, ConfigResult};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Names and version the rc tree and file header are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Lower-case name used for paths (`valkyrie`).
    pub name: &'static str,
    /// Display name used in headers (`Valkyrie`).
    pub display_name: &'static str,
    pub version: String,
    pub copyright: &'static str,
    pub author: &'static str,
    pub email: &'static str,
    pub vg_copyright: &'static str,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "valkyrie",
            display_name: "Valkyrie",
            version: env!("CARGO_PKG_VERSION").to_string(),
            copyright: "Copyright (c) 2003-2005, OpenWorks LLP",
            author: "Donna Robinson",
            email: "donna@valgrind.org",
            vg_copyright: "Copyright (c) 2000-2005, and GNU GPL'd, by Julian Seward et al.",
        }
    }
}

impl Identity {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

/// Locations fixed at build time. `VK_PREFIX`, `VG_EXEC_PATH` and
/// `VG_SUPP_DIR` override the defaults when set at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub prefix: PathBuf,
    pub vg_exec: PathBuf,
    pub vg_supp_dir: PathBuf,
    pub vk_doc_dir: PathBuf,
    pub vg_doc_dir: PathBuf,
}

impl Default for InstallPaths {
    fn default() -> Self {
        let prefix = PathBuf::from(option_env!("VK_PREFIX").unwrap_or("/usr/local"));
        Self {
            vg_exec: PathBuf::from(option_env!("VG_EXEC_PATH").unwrap_or("/usr/bin/valgrind")),
            vg_supp_dir: PathBuf::from(option_env!("VG_SUPP_DIR").unwrap_or("/usr/lib/valgrind")),
            vk_doc_dir: prefix.join("share/doc/valkyrie"),
            vg_doc_dir: prefix.join("share/doc/valgrind"),
            prefix,
        }
    }
}

/// The fixed sub-directories of the rc tree, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubDir {
    Dbase,
    Logs,
    Suppressions,
}

impl SubDir {
    pub const ALL: [SubDir; 3] = [SubDir::Dbase, SubDir::Logs, SubDir::Suppressions];

    pub fn dir_name(self) -> &'static str {
        match self {
            SubDir::Dbase => "dbase",
            SubDir::Logs => "logs",
            SubDir::Suppressions => "suppressions",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<SubDir> {
        Self::ALL.into_iter().find(|s| s.dir_name() == name)
    }

    /// The sub-directory created after this one, if any.
    pub fn next(self) -> Option<SubDir> {
        match self {
            SubDir::Dbase => Some(SubDir::Logs),
            SubDir::Logs => Some(SubDir::Suppressions),
            SubDir::Suppressions => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcPaths {
    pub rc_dir: PathBuf,
    pub rc_file: PathBuf,
}

impl RcPaths {
    /// Resolves the rc tree under `home`.
    pub fn under(home: &Path, identity: &Identity) -> Self {
        let rc_dir = home.join(format!(".{}-{}", identity.name, identity.version));
        let rc_file = rc_dir.join(format!("{}rc", identity.name));
        Self { rc_dir, rc_file }
    }

    /// Resolves the rc tree under the current user's home directory.
    pub fn for_current_user(identity: &Identity) -> ConfigResult<Self> {
        let dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::under(dirs.home_dir(), identity))
    }

    pub fn sub_dir(&self, sub: SubDir) -> PathBuf {
        self.rc_dir.join(sub.dir_name())
    }

    pub fn dbase_dir(&self) -> PathBuf {
        self.sub_dir(SubDir::Dbase)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.sub_dir(SubDir::Logs)
    }

    pub fn supp_dir(&self) -> PathBuf {
        self.sub_dir(SubDir::Suppressions)
    }

    pub fn rc_file_name(&self) -> Option<&str> {
        self.rc_file.file_name().and_then(|n| n.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_tree_layout() {
        let identity = Identity::with_version("2.0.0");
        let paths = RcPaths::under(Path::new("/home/someone"), &identity);

        assert_eq!(paths.rc_dir, Path::new("/home/someone/.valkyrie-2.0.0"));
        assert_eq!(paths.rc_file, Path::new("/home/someone/.valkyrie-2.0.0/valkyrierc"));
        assert_eq!(paths.logs_dir(), Path::new("/home/someone/.valkyrie-2.0.0/logs"));
        assert_eq!(paths.rc_file_name(), Some("valkyrierc"));
    }

    #[test]
    fn sub_dir_chain() {
        assert_eq!(SubDir::Dbase.next(), Some(SubDir::Logs));
        assert_eq!(SubDir::Logs.next(), Some(SubDir::Suppressions));
        assert_eq!(SubDir::Suppressions.next(), None);
        assert_eq!(SubDir::from_dir_name("logs"), Some(SubDir::Logs));
        assert_eq!(SubDir::from_dir_name("cache"), None);
    }
}
