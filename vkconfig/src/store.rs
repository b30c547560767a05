//! `VkConfig`: the process-wide settings store.
//!
//! Reads come from the in-memory map. Writes mark entries dirty; `sync`
//! re-reads the file on disk, overlays the dirty entries and writes the union
//! back, so keys edited externally while the application ran survive.

use crate::bootstrap::{self, AccessFault, AccessState};
use crate::entry::{EntryData, EntryKey, EntryMap};
use crate::error::{ConfigError, ConfigResult};
use crate::objects::{ObjectRegistry, VkObject};
use crate::parser;
use crate::paths::{Identity, InstallPaths, RcPaths};
use crate::typed::{self, Color, Font};
use chrono::Local;
use compact_str::CompactString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Creation attempts allowed while fixing a missing or stale rc file.
pub const MAX_CREATE_ATTEMPTS: u32 = 2;

const DEFAULT_SEPARATOR: char = ',';

/// Inputs for [`VkConfig::open_with`].
#[derive(Debug, Default)]
pub struct StoreOptions {
    /// Home directory the rc tree lives under; the current user's when `None`.
    pub home: Option<PathBuf>,
    pub identity: Identity,
    pub install: InstallPaths,
    pub objects: ObjectRegistry,
}

#[derive(Debug)]
pub struct VkConfig {
    identity: Identity,
    install: InstallPaths,
    paths: RcPaths,
    objects: ObjectRegistry,
    entries: EntryMap,
    sep: char,
    dirty: bool,
    new_config_file: bool,
}

impl VkConfig {
    /// Opens the store for the current user with compiled-in defaults.
    pub fn open() -> ConfigResult<Self> {
        Self::open_with(StoreOptions::default())
    }

    /// Bootstraps the rc tree, validates or recreates the rc file and loads
    /// it. Any error is a fatal startup failure.
    #[instrument(level = "info", skip(options), fields(version = %options.identity.version))]
    pub fn open_with(options: StoreOptions) -> ConfigResult<Self> {
        let paths = match &options.home {
            Some(home) => RcPaths::under(home, &options.identity),
            None => RcPaths::for_current_user(&options.identity)?,
        };

        bootstrap::check_dirs(&paths)?;

        let mut config = Self {
            identity: options.identity,
            install: options.install,
            paths,
            objects: options.objects,
            entries: EntryMap::new(),
            sep: DEFAULT_SEPARATOR,
            dirty: false,
            new_config_file: false,
        };

        let mut attempts = 0;
        loop {
            if attempts >= MAX_CREATE_ATTEMPTS {
                return Err(ConfigError::RetriesExhausted {
                    path: CompactString::from(config.paths.rc_file.to_string_lossy()),
                    attempts,
                });
            }

            match bootstrap::check_access(&config.paths, &config.identity.version) {
                AccessState::Okay => {
                    config.load_file()?;
                    break;
                }
                AccessState::BadVersion { found } => {
                    info!(
                        file = %config.paths.rc_file.display(),
                        found = %found,
                        "Configuration file version is invalid, re-creating it"
                    );
                    config.make_config_file(true)?;
                    attempts += 1;
                }
                AccessState::MustCreate => {
                    info!(file = %config.paths.rc_file.display(), "Configuration file does not exist, creating it");
                    config.make_config_file(config.paths.rc_file.exists())?;
                    attempts += 1;
                }
                AccessState::NoPermission => {
                    return Err(ConfigError::no_permission(&config.paths.rc_dir));
                }
                AccessState::Unrecoverable(AccessFault::BadFilename) => {
                    return Err(ConfigError::BadFilename {
                        path: CompactString::from(config.paths.rc_file.to_string_lossy()),
                    });
                }
                AccessState::Unrecoverable(AccessFault::NoDirectory) => {
                    return Err(ConfigError::NoDirectory {
                        path: CompactString::from(config.paths.rc_dir.to_string_lossy()),
                    });
                }
            }
        }

        if config.new_config_file || config.install_paths_changed() {
            config.update_paths()?;
        }

        Ok(config)
    }

    fn make_config_file(&mut self, remove_existing: bool) -> ConfigResult<()> {
        bootstrap::make_config_file(&self.paths, &self.identity, &self.objects, remove_existing)?;
        self.new_config_file = true;
        Ok(())
    }

    fn load_file(&mut self) -> ConfigResult<()> {
        let text = fs::read_to_string(&self.paths.rc_file)
            .map_err(|e| ConfigError::read(&self.paths.rc_file, e))?;
        parser::parse_into(&text, &mut self.entries);
        debug!(entries = self.entries.len(), "Parsed configuration file");
        Ok(())
    }

    fn install_paths_changed(&self) -> bool {
        let exec = self.install.vg_exec.to_string_lossy();
        let supp = self.install.vg_supp_dir.to_string_lossy();
        self.read("vg-exec", "valkyrie") != Some(&*exec)
            || self.read("vg-supps-dir", "valkyrie") != Some(&*supp)
    }

    /// Rewrites the compiled-in install paths and the suppression file lists
    /// derived from them, then flushes immediately.
    #[instrument(level = "debug", skip(self))]
    pub fn update_paths(&mut self) -> ConfigResult<()> {
        let exec = self.install.vg_exec.to_string_lossy().into_owned();
        let supp_dir = self.install.vg_supp_dir.clone();
        self.write(&exec, "vg-exec", "valkyrie");
        self.write(&supp_dir.to_string_lossy(), "vg-supps-dir", "valkyrie");

        let selected = self.read("suppressions", "valgrind").unwrap_or_default().to_string();
        let found = find_suppression_files(&supp_dir);

        let mut default_supp = String::new();
        let all: Vec<String> = found
            .iter()
            .map(|path| {
                let full = path.to_string_lossy().into_owned();
                let file_name = path.file_name().map(|n| n.to_string_lossy());
                if file_name.as_deref() == Some(selected.as_str()) {
                    default_supp = full.clone();
                }
                full
            })
            .collect();
        let sep = self.sep.to_string();
        let all = all.join(sep.as_str());

        self.write(&all, "supps-all", "valgrind");
        self.write(&all, "supps-def", "valgrind");
        self.write(&default_supp, "suppressions", "valgrind");

        info!(count = found.len(), dir = %supp_dir.display(), "Updated install paths");
        self.sync()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Raw value of `key` in `group`, or `None` (with a diagnostic).
    pub fn read(&self, key: &str, group: &str) -> Option<&str> {
        let value = self
            .entries
            .get(&EntryKey::new(group, key))
            .map(|d| d.value.as_str());
        if value.is_none() {
            debug!(
                file = %self.paths.rc_file.display(),
                group,
                key,
                "Configuration key not found"
            );
        }
        value
    }

    /// Integer value, `-1` when absent or malformed.
    pub fn read_int(&self, key: &str, group: &str) -> i32 {
        typed::decode_int(self.read(key, group))
    }

    pub fn read_bool(&self, key: &str, group: &str) -> bool {
        typed::decode_bool(self.read(key, group))
    }

    /// Font from `group` (default `Fonts`); the default font on any problem.
    pub fn read_font(&self, key: &str, group: Option<&str>) -> Font {
        self.read(key, group.unwrap_or("Fonts"))
            .map(Font::decode)
            .unwrap_or_default()
    }

    /// Colour from `[Colors]`; invalid on any problem.
    pub fn read_color(&self, key: &str) -> Color {
        self.read(key, "Colors").map(Color::decode).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn write(&mut self, value: &str, key: &str, group: &str) {
        let entry_key = EntryKey::new(group, key);
        if !self.entries.contains_key(&entry_key) {
            debug!(
                file = %self.paths.rc_file.display(),
                group,
                key,
                value,
                "Writing a key that did not exist"
            );
        }
        self.dirty = true;
        self.entries.insert(entry_key, EntryData::dirty(value));
    }

    /// Appends `value` to the existing list value using the separator.
    pub fn append(&mut self, value: &str, key: &str, group: &str) {
        let mut combined = self.read(key, group).unwrap_or_default().to_string();
        if !combined.is_empty() {
            combined.push(self.sep);
        }
        combined.push_str(value);
        self.write(&combined, key, group);
    }

    pub fn write_int(&mut self, value: i32, key: &str, group: &str) {
        self.write(&value.to_string(), key, group);
    }

    pub fn write_bool(&mut self, value: bool, key: &str, group: &str) {
        self.write(typed::encode_bool(value), key, group);
    }

    pub fn write_font(&mut self, font: &Font, key: &str) {
        self.write(&font.to_config_string(), key, "Fonts");
    }

    pub fn write_color(&mut self, color: Color, key: &str) {
        self.write(&color.to_config_string(), key, "Colors");
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Flushes dirty entries; does nothing when the store is clean.
    pub fn sync(&mut self) -> ConfigResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.write_back()?;
        self.dirty = false;
        Ok(())
    }

    /// Forgets pending writes so nothing reaches disk at teardown.
    pub fn dont_sync(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn write_back(&mut self) -> ConfigResult<()> {
        let mut merged = EntryMap::new();
        match fs::read_to_string(&self.paths.rc_file) {
            Ok(text) => parser::parse_into(&text, &mut merged),
            Err(e) => debug!(error = %e, "Could not re-read configuration file before flush"),
        }

        for (key, data) in self.entries.iter().filter(|(_, d)| d.dirty) {
            merged.insert(key.clone(), EntryData::clean(data.value.clone()));
        }

        // gui must be re-enabled on every run.
        let gui = EntryKey::new("valkyrie", "gui");
        merged.insert(gui.clone(), EntryData::clean("yes"));
        self.entries.insert(gui, EntryData::clean("yes"));

        let text = parser::render(
            &merged,
            self.identity.display_name,
            &self.identity.version,
            Local::now(),
        );
        fs::write(&self.paths.rc_file, text).map_err(|e| ConfigError::write(&self.paths.rc_file, e))?;

        for data in self.entries.values_mut() {
            data.dirty = false;
        }
        debug!(entries = merged.len(), "Flushed configuration file");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Feature modules
    // ------------------------------------------------------------------

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn object(&self, id: usize) -> Option<&dyn VkObject> {
        self.objects.get(id)
    }

    pub fn object_by_name(&self, name: &str) -> Option<&dyn VkObject> {
        self.objects.by_name(name)
    }

    pub fn object_id(&self, name: &str) -> Option<usize> {
        self.objects.by_name(name).map(|o| o.id())
    }

    /// Name stored under `[valgrind] tool`.
    pub fn tool_name(&self) -> Option<&str> {
        self.read("tool", "valgrind")
    }

    /// The tool object named by `[valgrind] tool`.
    pub fn tool(&self) -> Option<&dyn VkObject> {
        let name = self.tool_name()?;
        let tool = self.objects.tool_by_name(name);
        if tool.is_none() {
            warn!(tool = name, "Configured tool is not a registered tool object");
        }
        tool
    }

    pub fn tool_id(&self) -> Option<usize> {
        self.tool().map(|t| t.id())
    }

    pub fn tool_list(&self) -> Vec<&dyn VkObject> {
        self.objects.tools().collect()
    }

    // ------------------------------------------------------------------
    // Identity and paths
    // ------------------------------------------------------------------

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn install_paths(&self) -> &InstallPaths {
        &self.install
    }

    /// True when the rc file was (re)created during this startup.
    pub fn is_new_config_file(&self) -> bool {
        self.new_config_file
    }

    pub fn separator(&self) -> char {
        self.sep
    }

    pub fn rc_dir(&self) -> &Path {
        &self.paths.rc_dir
    }

    pub fn rc_file(&self) -> &Path {
        &self.paths.rc_file
    }

    pub fn dbase_dir(&self) -> PathBuf {
        self.paths.dbase_dir()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.paths.logs_dir()
    }

    pub fn supp_dir(&self) -> PathBuf {
        self.paths.supp_dir()
    }

    pub fn vk_doc_dir(&self) -> &Path {
        &self.install.vk_doc_dir
    }

    pub fn vg_doc_dir(&self) -> &Path {
        &self.install.vg_doc_dir
    }
}

impl Drop for VkConfig {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!(error = %e, "Failed to flush configuration at shutdown");
        }
    }
}

/// `*.supp` files directly inside `dir`, sorted by name.
fn find_suppression_files(dir: &Path) -> Vec<PathBuf> {
    let pattern = dir.join("*.supp");
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = match glob::glob(pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
        Err(e) => {
            warn!(error = %e, "Invalid suppression search pattern");
            Vec::new()
        }
    };
    files.sort();
    files
}
