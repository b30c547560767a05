//! # vkconfig - Settings Store for Valkyrie
//!
//! Grouped `key=value` settings backed by a flat rc file under
//! `~/.valkyrie-<version>/`.
//!
//! ## Key Features
//! - Directory and rc-file bootstrap with explicit state machines
//! - Version check with automatic re-creation of stale files
//! - Typed reads/writes (int, bool, font, colour) with lenient fallbacks
//! - Read-modify-write flush that keeps external edits
//! - Registry of feature modules that contribute default settings

pub mod bootstrap;
pub mod entry;
pub mod error;
pub mod objects;
pub mod parser;
pub mod paths;
pub mod store;
pub mod typed;

pub use bootstrap::{AccessFault, AccessState, DirState};
pub use entry::{EntryData, EntryKey, EntryMap};
pub use error::{ConfigError, ConfigResult};
pub use objects::{BuiltinObject, ObjectRegistry, VkObject};
pub use paths::{Identity, InstallPaths, RcPaths, SubDir};
pub use store::{StoreOptions, VkConfig};
pub use typed::{Color, Font};
