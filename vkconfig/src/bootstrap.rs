//! Startup checks for the rc tree and the rc file.
//!
//! Two explicit state machines:
//!
//! * [`DirState`] verifies `~/.valkyrie-<version>/` and its fixed
//!   sub-directories, creating whatever is missing.
//! * [`AccessState`] classifies the rc file; the store drives the retry loop
//!   around it.

use crate::error::{ConfigError, ConfigResult};
use crate::objects::ObjectRegistry;
use crate::parser::{self, HEADER_DATE_FORMAT};
use crate::paths::{Identity, RcPaths, SubDir};
use chrono::Local;
use std::fs;
use std::io::{BufRead, BufReader};
use tracing::{debug, info, warn};

const DEFAULT_COLORS: &str = "[Colors]\n\
background=214,205,187\n\
base=255,255,255\n\
dkgray=128,128,128\n\
editColor=254,222,190\n\
highlight=147,40,40\n\
nullColor=239,227,211\n\
text=0,0,0\n\n";

const DEFAULT_MAINWIN: &str = "[MainWin]\n\
height=600\n\
width=550\n\
x-pos=400\n\
y-pos=0\n\n";

const DEFAULT_DATABASE: &str = "[Database]\n\
user=root\n\
host=localhost\n\
pword=Poniarl7\n\
dbase=valkyrie\n\
logging=true\n\
logfile=\n\n";

/// Directory bootstrap states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirState {
    CheckDir,
    CheckSubDirs,
    MakeTopDir,
    MakeSubDir(SubDir),
    Done,
    GiveUp(String),
}

impl DirState {
    /// Performs the work of this state and returns the next one.
    pub fn step(self, paths: &RcPaths) -> DirState {
        match self {
            DirState::CheckDir => {
                if paths.rc_dir.is_dir() {
                    DirState::CheckSubDirs
                } else if paths.rc_dir.exists() {
                    DirState::GiveUp("path exists but is not a directory".into())
                } else {
                    DirState::MakeTopDir
                }
            }

            DirState::CheckSubDirs => check_sub_dirs(paths),

            DirState::MakeTopDir => match fs::create_dir_all(&paths.rc_dir) {
                Ok(()) => {
                    info!(dir = %paths.rc_dir.display(), "Created configuration directory");
                    DirState::MakeSubDir(SubDir::Dbase)
                }
                Err(e) => DirState::GiveUp(format!("cannot create directory: {e}")),
            },

            DirState::MakeSubDir(sub) => {
                let dir = paths.sub_dir(sub);
                match fs::create_dir(&dir) {
                    Ok(()) => {
                        debug!(dir = %dir.display(), "Created configuration sub-directory");
                        next_missing(paths, sub.next())
                    }
                    Err(e) => DirState::GiveUp(format!("cannot create {}: {e}", sub.dir_name())),
                }
            }

            terminal @ (DirState::Done | DirState::GiveUp(_)) => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DirState::Done | DirState::GiveUp(_))
    }
}

/// First sub-directory from `from` onwards that does not exist yet.
fn next_missing(paths: &RcPaths, mut from: Option<SubDir>) -> DirState {
    while let Some(sub) = from {
        if !paths.sub_dir(sub).is_dir() {
            return DirState::MakeSubDir(sub);
        }
        from = sub.next();
    }
    DirState::Done
}

fn check_sub_dirs(paths: &RcPaths) -> DirState {
    let entries = match fs::read_dir(&paths.rc_dir) {
        Ok(entries) => entries,
        Err(e) => return DirState::GiveUp(format!("cannot read directory: {e}")),
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if SubDir::from_dir_name(&name).is_none() {
            return DirState::GiveUp(format!("unexpected sub-directory '{name}'"));
        }
    }

    next_missing(paths, Some(SubDir::Dbase))
}

/// Runs the directory state machine to completion.
pub fn check_dirs(paths: &RcPaths) -> ConfigResult<()> {
    let mut state = DirState::CheckDir;
    while !state.is_terminal() {
        debug!(?state, "Directory bootstrap");
        state = state.step(paths);
    }

    match state {
        DirState::GiveUp(reason) => {
            warn!(dir = %paths.rc_dir.display(), %reason, "Directory bootstrap failed");
            Err(ConfigError::directory_tree(&paths.rc_dir, reason))
        }
        _ => Ok(()),
    }
}

/// Why an rc file cannot be used at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessFault {
    BadFilename,
    NoDirectory,
}

/// Classification of the rc file at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    Okay,
    BadVersion { found: String },
    MustCreate,
    NoPermission,
    Unrecoverable(AccessFault),
}

/// Classifies the rc file for startup.
///
/// Read and write access is judged from the permission bits alone
/// (`Permissions::readonly`), not from the current user's effective rights.
/// An rc tree owned by another user with write bits set therefore passes
/// here and fails later, when it is read or written.
pub fn check_access(paths: &RcPaths, version: &str) -> AccessState {
    if paths.rc_file_name().is_none_or(str::is_empty) {
        debug!("rc filename is empty");
        return AccessState::Unrecoverable(AccessFault::BadFilename);
    }

    let dir_meta = match fs::metadata(&paths.rc_dir) {
        Ok(meta) if meta.is_dir() => meta,
        _ => {
            debug!(dir = %paths.rc_dir.display(), "rc directory does not exist");
            return AccessState::Unrecoverable(AccessFault::NoDirectory);
        }
    };
    if dir_meta.permissions().readonly() {
        return AccessState::NoPermission;
    }

    let file_meta = match fs::metadata(&paths.rc_file) {
        Ok(meta) => meta,
        Err(_) => return AccessState::MustCreate,
    };
    if file_meta.permissions().readonly() || !file_meta.is_file() {
        warn!(file = %paths.rc_file.display(), "rc file seems to be corrupted, re-creating it");
        return AccessState::MustCreate;
    }

    let first_line = match fs::File::open(&paths.rc_file) {
        Ok(file) => {
            let mut line = String::new();
            if BufReader::new(file).read_line(&mut line).is_err() {
                return AccessState::MustCreate;
            }
            line
        }
        Err(_) => return AccessState::MustCreate,
    };

    let found = parser::version_token(&first_line);
    if found != version {
        return AccessState::BadVersion {
            found: found.to_string(),
        };
    }

    AccessState::Okay
}

/// Text of a freshly created rc file.
pub fn default_file_text(identity: &Identity, objects: &ObjectRegistry) -> String {
    let mut text = format!(
        "# {} {} configuration file\n# {}\n\n",
        identity.display_name,
        identity.version,
        Local::now().format(HEADER_DATE_FORMAT)
    );
    text.push_str(DEFAULT_COLORS);
    text.push_str(DEFAULT_MAINWIN);
    text.push_str(DEFAULT_DATABASE);
    text.push_str(&objects.default_entries());
    text
}

/// Writes the default rc file, removing an existing one first when
/// `remove_existing` is set.
pub fn make_config_file(
    paths: &RcPaths,
    identity: &Identity,
    objects: &ObjectRegistry,
    remove_existing: bool,
) -> ConfigResult<()> {
    if remove_existing && paths.rc_file.exists() {
        fs::remove_file(&paths.rc_file).map_err(|e| ConfigError::remove(&paths.rc_file, e))?;
    }

    fs::write(&paths.rc_file, default_file_text(identity, objects))
        .map_err(|e| ConfigError::write(&paths.rc_file, e))?;

    info!(file = %paths.rc_file.display(), "Created default configuration file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(version: &str) -> (TempDir, RcPaths, Identity) {
        let home = TempDir::new().expect("tempdir");
        let identity = Identity::with_version(version);
        let paths = RcPaths::under(home.path(), &identity);
        (home, paths, identity)
    }

    #[test]
    fn fresh_tree_is_created() {
        let (_home, paths, _) = fixture("1.1.0");
        check_dirs(&paths).expect("bootstrap");

        for sub in SubDir::ALL {
            assert!(paths.sub_dir(sub).is_dir(), "{} missing", sub.dir_name());
        }
    }

    #[test]
    fn fresh_tree_walks_every_state() {
        let (_home, paths, _) = fixture("1.1.0");
        let mut visited = Vec::new();
        let mut state = DirState::CheckDir;
        while !state.is_terminal() {
            visited.push(state.clone());
            state = state.step(&paths);
        }
        assert_eq!(
            visited,
            vec![
                DirState::CheckDir,
                DirState::MakeTopDir,
                DirState::MakeSubDir(SubDir::Dbase),
                DirState::MakeSubDir(SubDir::Logs),
                DirState::MakeSubDir(SubDir::Suppressions),
            ]
        );
        assert_eq!(state, DirState::Done);
    }

    #[test]
    fn missing_sub_dir_of_existing_tree_is_created() {
        let (_home, paths, _) = fixture("1.1.0");
        fs::create_dir_all(paths.dbase_dir()).expect("mkdir");
        fs::create_dir_all(paths.supp_dir()).expect("mkdir");

        check_dirs(&paths).expect("bootstrap");
        assert!(paths.logs_dir().is_dir());
    }

    #[test]
    fn unexpected_sub_dir_gives_up() {
        let (_home, paths, _) = fixture("1.1.0");
        check_dirs(&paths).expect("bootstrap");
        fs::create_dir(paths.rc_dir.join("stray")).expect("mkdir");

        let err = check_dirs(&paths).expect_err("stray dir must fail");
        assert!(matches!(err, ConfigError::DirectoryTree { .. }));
        assert!(err.is_fatal_startup());
    }

    #[test]
    fn stray_files_are_ignored() {
        let (_home, paths, _) = fixture("1.1.0");
        check_dirs(&paths).expect("bootstrap");
        fs::write(paths.rc_dir.join("notes.txt"), "hi").expect("write");
        assert!(check_dirs(&paths).is_ok());
    }

    #[test]
    fn access_states() {
        let (_home, paths, identity) = fixture("1.1.0");
        assert_eq!(
            check_access(&paths, "1.1.0"),
            AccessState::Unrecoverable(AccessFault::NoDirectory)
        );

        check_dirs(&paths).expect("bootstrap");
        assert_eq!(check_access(&paths, "1.1.0"), AccessState::MustCreate);

        let objects = ObjectRegistry::builtin();
        make_config_file(&paths, &identity, &objects, false).expect("create");
        assert_eq!(check_access(&paths, "1.1.0"), AccessState::Okay);
        assert_eq!(
            check_access(&paths, "2.0.0"),
            AccessState::BadVersion {
                found: "1.1.0".into()
            }
        );
    }

    #[test]
    fn write_bits_decide_access() {
        let (_home, paths, identity) = fixture("1.1.0");
        check_dirs(&paths).expect("bootstrap");
        make_config_file(&paths, &identity, &ObjectRegistry::builtin(), false).expect("create");

        let set_readonly = |path: &std::path::Path, readonly: bool| {
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_readonly(readonly);
            fs::set_permissions(path, perms).expect("chmod");
        };

        set_readonly(paths.rc_file.as_path(), true);
        assert_eq!(check_access(&paths, "1.1.0"), AccessState::MustCreate);
        set_readonly(paths.rc_file.as_path(), false);

        set_readonly(paths.rc_dir.as_path(), true);
        let state = check_access(&paths, "1.1.0");
        set_readonly(paths.rc_dir.as_path(), false);
        assert_eq!(state, AccessState::NoPermission);
    }

    #[test]
    fn default_file_has_fixed_sections_and_object_blocks() {
        let identity = Identity::with_version("1.1.0");
        let text = default_file_text(&identity, &ObjectRegistry::builtin());

        assert!(text.starts_with("# Valkyrie 1.1.0 configuration file\n# "));
        for header in ["[Colors]", "[MainWin]", "[Database]", "[valgrind]", "[massif]"] {
            assert!(text.contains(header), "missing {header}");
        }
        assert!(text.contains("highlight=147,40,40\n"));
    }
}
