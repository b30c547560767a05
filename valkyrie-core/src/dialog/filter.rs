//! src/dialog/filter.rs
//! ============================================================================
//! # Name filters
//!
//! Filter labels look like `C++ files (*.cpp *.h)`; the parenthesised part is
//! the pattern list. A label without parentheses is taken as the pattern
//! list itself. Patterns are separated by spaces or `;` and matched as
//! globs against file names. Directories are never filtered.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use smallvec::SmallVec;
use std::sync::LazyLock;
use tracing::debug;

pub const ALL_FILES: &str = "All Files (*)";
pub const DIRECTORIES: &str = "Directories";

const LABEL_GRAMMAR: &str = r"([a-zA-Z0-9 ]*)\(([a-zA-Z0-9_.*? +;#\[\]]*)\)$";

static LABEL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(LABEL_GRAMMAR).ok());

/// Splits a filter string on `;;`, or on newlines when there is no `;;`.
pub fn make_filters_list(filter: &str) -> Vec<String> {
    if filter.is_empty() {
        return Vec::new();
    }
    let sep = if !filter.contains(";;") && filter.contains('\n') {
        "\n"
    } else {
        ";;"
    };
    filter
        .split(sep)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pattern list of a label, or the label itself when it has none.
pub fn patterns_of(label: &str) -> &str {
    LABEL_RE
        .as_ref()
        .and_then(|re| re.captures(label))
        .and_then(|caps| caps.get(2))
        .map_or(label, |m| m.as_str())
}

// ------------------------------------------------------------
// NameFilter
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NameFilter {
    source: String,
    patterns: SmallVec<[Pattern; 4]>,
}

impl NameFilter {
    pub fn new(source: &str) -> Self {
        let patterns = source
            .split([' ', ';'])
            .filter(|p| !p.is_empty())
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    debug!(pattern = p, error = %e, "Ignoring invalid name pattern");
                    None
                }
            })
            .collect();
        Self {
            source: source.to_string(),
            patterns,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        const OPTIONS: MatchOptions = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches_with(name, OPTIONS))
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new("*")
    }
}

// ------------------------------------------------------------
// FilterList: the file-type drop-down
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FilterList {
    labels: Vec<String>,
    current: usize,
    active: NameFilter,
}

impl Default for FilterList {
    fn default() -> Self {
        Self {
            labels: vec![ALL_FILES.to_string()],
            current: 0,
            active: NameFilter::default(),
        }
    }
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn selected_label(&self) -> &str {
        self.labels.get(self.current).map_or("", String::as_str)
    }

    pub fn name_filter(&self) -> &NameFilter {
        &self.active
    }

    /// Replaces every label; the first one becomes active.
    pub fn set_filters(&mut self, labels: Vec<String>) -> bool {
        let Some(first) = labels.first().cloned() else {
            return false;
        };
        self.labels = labels;
        self.current = 0;
        self.set_filter(&first)
    }

    /// Activates `label`. With a single label the list is replaced by it,
    /// otherwise the first label starting with it (or with its patterns) is
    /// selected.
    pub fn set_filter(&mut self, label: &str) -> bool {
        if label.is_empty() {
            return false;
        }
        let patterns = patterns_of(label);
        self.active = NameFilter::new(patterns);

        if self.labels.len() <= 1 {
            self.labels = vec![label.to_string()];
            self.current = 0;
        } else if let Some(i) = self
            .labels
            .iter()
            .position(|l| l.starts_with(label) || l.starts_with(patterns))
        {
            self.current = i;
            self.active = NameFilter::new(patterns_of(&self.labels[i]));
        }
        true
    }

    /// Selects the label with the same patterns as `filter`, or appends it.
    pub fn add_filter(&mut self, filter: &str) -> bool {
        if filter.is_empty() {
            return false;
        }
        let patterns = patterns_of(filter);
        if let Some(i) = self.labels.iter().position(|l| patterns_of(l) == patterns) {
            self.current = i;
            self.active = NameFilter::new(patterns);
            return true;
        }
        self.labels.push(filter.to_string());
        self.current = self.labels.len() - 1;
        self.active = NameFilter::new(patterns);
        true
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        let Some(label) = self.labels.get(index) else {
            return false;
        };
        self.active = NameFilter::new(patterns_of(label));
        self.current = index;
        true
    }

    /// Selects the first label containing `mask`, ignoring case.
    pub fn select_mask(&mut self, mask: &str) -> bool {
        let needle = mask.to_lowercase();
        match self
            .labels
            .iter()
            .position(|l| l.to_lowercase().contains(&needle))
        {
            Some(i) => {
                self.current = i;
                self.active = NameFilter::new(patterns_of(mask));
                true
            }
            None => false,
        }
    }

    /// The single `Directories` entry used by directory modes.
    pub fn set_directories_only(&mut self) {
        self.labels = vec![DIRECTORIES.to_string()];
        self.current = 0;
        self.active = NameFilter::default();
    }

    /// Undoes [`FilterList::set_directories_only`].
    pub fn reset_if_directories_only(&mut self) {
        if self.labels.len() == 1 && self.labels[0] == DIRECTORIES {
            *self = Self::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filter_strings_split_on_double_semicolon_or_newline() {
        assert_eq!(
            make_filters_list("Images (*.png *.xpm);;Text files (*.txt)"),
            vec!["Images (*.png *.xpm)", "Text files (*.txt)"]
        );
        assert_eq!(
            make_filters_list("Sources (*.c)\nHeaders (*.h)"),
            vec!["Sources (*.c)", "Headers (*.h)"]
        );
        assert!(make_filters_list("").is_empty());
    }

    #[test]
    fn label_grammar_extracts_patterns() {
        assert_eq!(patterns_of("Images (*.png *.xpm)"), "*.png *.xpm");
        assert_eq!(patterns_of("Suppressions (*.supp)"), "*.supp");
        assert_eq!(patterns_of("*.log"), "*.log");
    }

    #[test]
    fn name_filter_matches_any_pattern() {
        let filter = NameFilter::new("*.png *.xpm;README");
        assert!(filter.matches("icon.png"));
        assert!(filter.matches("icon.xpm"));
        assert!(filter.matches("README"));
        assert!(!filter.matches("icon.jpg"));
        assert!(NameFilter::default().matches(".hidden"));
    }

    #[test]
    fn set_filters_activates_first_label() {
        let mut list = FilterList::new();
        assert!(list.set_filters(make_filters_list("Logs (*.xml);;All Files (*)")));
        assert_eq!(list.selected_label(), "Logs (*.xml)");
        assert!(list.name_filter().matches("run.xml"));
        assert!(!list.name_filter().matches("run.txt"));
    }

    #[test]
    fn set_filter_selects_label_by_prefix() {
        let mut list = FilterList::new();
        list.set_filters(make_filters_list("Logs (*.xml);;Text (*.txt)"));
        assert!(list.set_filter("Text"));
        assert_eq!(list.selected_label(), "Text (*.txt)");
        assert!(list.name_filter().matches("notes.txt"));
    }

    #[test]
    fn add_filter_reuses_matching_label() {
        let mut list = FilterList::new();
        list.set_filters(make_filters_list("Logs (*.xml);;All Files (*)"));

        list.add_filter("*.xml");
        assert_eq!(list.labels().len(), 2);
        assert_eq!(list.current_index(), 0);

        list.add_filter("*.supp");
        assert_eq!(list.labels().len(), 3);
        assert_eq!(list.selected_label(), "*.supp");
        assert!(list.name_filter().matches("default.supp"));
    }

    #[test]
    fn select_by_index_and_mask() {
        let mut list = FilterList::new();
        list.set_filters(make_filters_list("Logs (*.xml);;Text (*.txt)"));
        assert!(list.select_index(1));
        assert_eq!(list.selected_label(), "Text (*.txt)");
        assert!(!list.select_index(5));

        assert!(list.select_mask("logs"));
        assert_eq!(list.current_index(), 0);
        assert!(!list.select_mask("nothing"));
    }

    #[test]
    fn directories_only_round_trip() {
        let mut list = FilterList::new();
        list.set_directories_only();
        assert_eq!(list.labels(), &[DIRECTORIES.to_string()]);
        list.reset_if_directories_only();
        assert_eq!(list.selected_label(), ALL_FILES);
    }
}
