//! Feature modules known to the store.
//!
//! Each module owns one group of settings and describes its defaults so a
//! freshly created rc file carries every option the modules will read.

use crate::error::{ConfigError, ConfigResult};
use compact_str::CompactString;
use std::fmt::{self, Write as _};

pub trait VkObject: fmt::Debug + Send + Sync {
    /// Unique numeric id; also the object's position in the registry.
    fn id(&self) -> usize;

    /// Unique name; doubles as the settings group the object owns.
    fn name(&self) -> &str;

    fn is_tool(&self) -> bool;

    /// Default `[group]` block written into a new rc file.
    fn config_entries(&self) -> String;
}

/// A module whose defaults are a static option table.
#[derive(Debug, Clone)]
pub struct BuiltinObject {
    id: usize,
    name: &'static str,
    is_tool: bool,
    options: &'static [(&'static str, &'static str)],
}

impl BuiltinObject {
    pub const fn new(
        id: usize,
        name: &'static str,
        is_tool: bool,
        options: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            id,
            name,
            is_tool,
            options,
        }
    }
}

impl VkObject for BuiltinObject {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn is_tool(&self) -> bool {
        self.is_tool
    }

    fn config_entries(&self) -> String {
        let mut block = format!("[{}]\n", self.name);
        for (key, value) in self.options {
            let _ = writeln!(block, "{key}={value}");
        }
        block.push('\n');
        block
    }
}

pub const VALKYRIE_ID: usize = 0;
pub const VALGRIND_ID: usize = 1;
pub const MEMCHECK_ID: usize = 2;
pub const CACHEGRIND_ID: usize = 3;
pub const MASSIF_ID: usize = 4;

const VALKYRIE_OPTIONS: &[(&str, &str)] = &[
    ("show-butt-text", "true"),
    ("show-tooltips", "true"),
    ("icontxt-pos", "4"),
    ("font-gen-sys", "true"),
    ("font-gen-user", "Luxi Sans,10,-1,5,50,0,0,0,0,0"),
    ("font-tool-user", "Misc Fixed,11,-1,5,50,0,0,0,0,0"),
    ("src-editor", "/usr/bin/emacs"),
    ("src-lines", "2"),
    ("merge", ""),
    ("view-log", ""),
    ("vg-exec", ""),
    ("vg-supps-dir", ""),
];

const VALGRIND_OPTIONS: &[(&str, &str)] = &[
    ("tool", "memcheck"),
    ("verbosity", "1"),
    ("trace-children", "no"),
    ("track-fds", "no"),
    ("time-stamp", "no"),
    ("run-libc-freeres", "yes"),
    ("weird-hacks", ""),
    ("demangle", "yes"),
    ("num-callers", "12"),
    ("error-limit", "yes"),
    ("show-below-main", "no"),
    ("max-stackframe", "2000000"),
    ("gen-suppressions", "no"),
    ("db-attach", "no"),
    ("db-command", "/usr/bin/gdb -nw %f %p"),
    ("input-fd", "0"),
    ("suppressions", ""),
    ("supps-all", ""),
    ("supps-def", ""),
];

const MEMCHECK_OPTIONS: &[(&str, &str)] = &[
    ("leak-check", "summary"),
    ("leak-resolution", "low"),
    ("show-reachable", "no"),
    ("partial-loads-ok", "yes"),
    ("freelist-vol", "1000000"),
    ("workaround-gcc296-bugs", "no"),
    ("alignment", "8"),
];

const CACHEGRIND_OPTIONS: &[(&str, &str)] = &[
    ("I1", ""),
    ("D1", ""),
    ("L2", ""),
    ("pid-file", ""),
    ("show", ""),
    ("sort", ""),
    ("threshold", "99"),
    ("auto", "no"),
    ("context", "8"),
    ("include", ""),
];

const MASSIF_OPTIONS: &[(&str, &str)] = &[
    ("heap", "yes"),
    ("heap-admin", "8"),
    ("stacks", "yes"),
    ("depth", "3"),
    ("alloc-fn", ""),
    ("format", "text"),
];

/// Ordered set of feature modules; ids are positions.
#[derive(Debug)]
pub struct ObjectRegistry {
    objects: Vec<Box<dyn VkObject>>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ObjectRegistry {
    pub fn empty() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// valkyrie, valgrind, memcheck, cachegrind, massif.
    pub fn builtin() -> Self {
        let objects: Vec<Box<dyn VkObject>> = vec![
            Box::new(BuiltinObject::new(VALKYRIE_ID, "valkyrie", false, VALKYRIE_OPTIONS)),
            Box::new(BuiltinObject::new(VALGRIND_ID, "valgrind", false, VALGRIND_OPTIONS)),
            Box::new(BuiltinObject::new(MEMCHECK_ID, "memcheck", true, MEMCHECK_OPTIONS)),
            Box::new(BuiltinObject::new(CACHEGRIND_ID, "cachegrind", true, CACHEGRIND_OPTIONS)),
            Box::new(BuiltinObject::new(MASSIF_ID, "massif", true, MASSIF_OPTIONS)),
        ];
        Self { objects }
    }

    /// Appends an object. Its id must equal the next free position and its
    /// name must be unused.
    pub fn register(&mut self, object: Box<dyn VkObject>) -> ConfigResult<()> {
        let clash = object.id() != self.objects.len()
            || self.objects.iter().any(|o| o.name() == object.name());
        if clash {
            return Err(ConfigError::DuplicateObject {
                name: CompactString::from(object.name()),
                id: object.id(),
            });
        }
        self.objects.push(object);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn VkObject> {
        self.objects.iter().map(|o| o.as_ref())
    }

    pub fn get(&self, id: usize) -> Option<&dyn VkObject> {
        self.objects.get(id).map(|o| o.as_ref())
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn VkObject> {
        self.iter().find(|o| o.name() == name)
    }

    pub fn tool_by_name(&self, name: &str) -> Option<&dyn VkObject> {
        self.tools().find(|o| o.name() == name)
    }

    pub fn tools(&self) -> impl Iterator<Item = &dyn VkObject> {
        self.iter().filter(|o| o.is_tool())
    }

    /// Concatenated default blocks of every registered object.
    pub fn default_entries(&self) -> String {
        self.iter().map(|o| o.config_entries()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::entry::EntryKey;

    #[test]
    fn builtin_ids_match_positions() {
        let registry = ObjectRegistry::builtin();
        for (pos, object) in registry.iter().enumerate() {
            assert_eq!(object.id(), pos);
        }
        assert_eq!(registry.by_name("massif").map(|o| o.id()), Some(MASSIF_ID));
    }

    #[test]
    fn only_analysis_tools_are_tools() {
        let registry = ObjectRegistry::builtin();
        let tools: Vec<&str> = registry.tools().map(|o| o.name()).collect();
        assert_eq!(tools, ["memcheck", "cachegrind", "massif"]);
        assert!(registry.tool_by_name("valgrind").is_none());
    }

    #[test]
    fn default_entries_parse_into_owned_groups() {
        let registry = ObjectRegistry::builtin();
        let map = parser::parse(&registry.default_entries());

        let tool = map.get(&EntryKey::new("valgrind", "tool"));
        assert_eq!(tool.map(|d| d.value.as_str()), Some("memcheck"));
        assert!(map.keys().all(|k| registry.by_name(&k.group).is_some()));
    }

    #[test]
    fn register_rejects_clashes() {
        let mut registry = ObjectRegistry::builtin();
        let dup = BuiltinObject::new(5, "memcheck", true, &[]);
        assert!(registry.register(Box::new(dup)).is_err());

        let gap = BuiltinObject::new(9, "helgrind", true, &[]);
        assert!(registry.register(Box::new(gap)).is_err());

        let ok = BuiltinObject::new(5, "helgrind", true, &[("history", "full")]);
        assert!(registry.register(Box::new(ok)).is_ok());
        assert_eq!(registry.len(), 6);
    }
}
