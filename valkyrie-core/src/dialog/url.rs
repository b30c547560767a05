//! src/dialog/url.rs
//! ============================================================================
//! # DialogUrl: location of a listed directory
//!
//! `scheme://host/abs/path`, with `file` as the local scheme. Paths are kept
//! absolute and normalised (no `.`/`..` segments, no trailing slash except
//! for the root).

use crate::error::DialogError;
use compact_str::CompactString;
use std::fmt;
use std::path::{Path, PathBuf};

pub const LOCAL_SCHEME: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialogUrl {
    scheme: CompactString,
    host: CompactString,
    path: String,
}

impl DialogUrl {
    /// Local URL for an absolute path; relative paths are taken from `/`.
    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        Self {
            scheme: CompactString::const_new(LOCAL_SCHEME),
            host: CompactString::default(),
            path: normalize(&path.as_ref().to_string_lossy()),
        }
    }

    pub fn root() -> Self {
        Self::local("/")
    }

    /// Parses an absolute location: `scheme://host/path`, `file:/path` or a
    /// plain absolute path.
    pub fn parse(input: &str) -> Result<Self, DialogError> {
        let input = input.trim();
        if let Some((scheme, rest)) = input.split_once("://") {
            if !is_scheme(scheme) {
                return Err(DialogError::MalformedUrl { url: input.into() });
            }
            let (host, path) = match rest.find('/') {
                Some(pos) => rest.split_at(pos),
                None => (rest, "/"),
            };
            if scheme != LOCAL_SCHEME && host.is_empty() {
                return Err(DialogError::MalformedUrl { url: input.into() });
            }
            return Ok(Self {
                scheme: CompactString::new(scheme.to_ascii_lowercase()),
                host: CompactString::new(host),
                path: normalize(path),
            });
        }

        if let Some(path) = input.strip_prefix("file:") {
            return Ok(Self::local(path));
        }

        if input.starts_with('/') {
            return Ok(Self::local(input));
        }

        Err(DialogError::MalformedUrl { url: input.into() })
    }

    /// Resolves `input` against this URL: absolute inputs replace it,
    /// anything else is joined onto it.
    pub fn resolve(&self, input: &str) -> Result<Self, DialogError> {
        if input.contains("://") || input.starts_with("file:") {
            return Self::parse(input);
        }
        if input.starts_with('/') {
            return Ok(Self {
                path: normalize(input),
                ..self.clone()
            });
        }
        Ok(self.join(input))
    }

    /// Child (or relative path) of this URL.
    pub fn join(&self, name: &str) -> Self {
        Self {
            path: normalize(&format!("{}/{}", self.path, name)),
            ..self.clone()
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(self.join(".."))
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    pub fn is_local(&self) -> bool {
        self.scheme == LOCAL_SCHEME
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, empty for the root.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    pub fn to_local_path(&self) -> Option<PathBuf> {
        self.is_local().then(|| PathBuf::from(&self.path))
    }

    /// Full textual form of `name` inside this directory.
    pub fn child_string(&self, name: &str) -> String {
        self.join(name).to_string()
    }
}

impl Default for DialogUrl {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for DialogUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}://{}{}", self.scheme, self.host, self.path)
        }
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Absolute path with `.`/`..` resolved and duplicate slashes removed.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
