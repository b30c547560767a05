//! Line grammar of the rc file.
//!
//! ```text
//! # comment
//! [group]
//! key=value
//! ```
//!
//! Keys end at the first `=`; everything after it is the value, verbatim.
//! There is no escaping, so a key can never contain `=` while a value can.

use crate::entry::{EntryData, EntryKey, EntryMap};
use chrono::{DateTime, Local};
use std::fmt::Write as _;

/// Timestamp layout used on the second header line, e.g. `October 19 14:02 2026`.
pub const HEADER_DATE_FORMAT: &str = "%B %-d %H:%M %Y";

/// Parses rc-file text into a fresh map of clean entries.
pub fn parse(text: &str) -> EntryMap {
    let mut map = EntryMap::new();
    parse_into(text, &mut map);
    map
}

/// Parses rc-file text, inserting every entry into `map` as clean.
/// Later duplicates replace earlier ones.
pub fn parse_into(text: &str, map: &mut EntryMap) {
    let mut group = "";

    for raw in text.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
            group = &line[1..line.len() - 1];
            continue;
        }

        let (key, value) = line.split_once('=').unwrap_or((line, ""));
        map.insert(EntryKey::new(group, key), EntryData::clean(value));
    }
}

/// Serialises `map` group-major under the two-line comment header.
pub fn render(map: &EntryMap, product: &str, version: &str, stamp: DateTime<Local>) -> String {
    let mut out = String::with_capacity(64 + map.len() * 24);
    let _ = writeln!(out, "# {product} {version} Configuration File");
    let _ = writeln!(out, "# {}", stamp.format(HEADER_DATE_FORMAT));

    let mut current: Option<&str> = None;
    for (key, data) in map {
        if current != Some(key.group.as_str()) {
            let _ = write!(out, "\n[{}]\n", key.group);
            current = Some(key.group.as_str());
        }
        let _ = writeln!(out, "{}={}", key.key, data.value);
    }

    out
}

/// Extracts the version token from the first line of an rc file: the first
/// run of digits and dots, starting at the first digit.
pub fn version_token(first_line: &str) -> &str {
    let Some(start) = first_line.find(|c: char| c.is_ascii_digit()) else {
        return "";
    };
    let rest = &first_line[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn value<'a>(map: &'a EntryMap, group: &str, key: &str) -> Option<&'a str> {
        map.get(&EntryKey::new(group, key)).map(|d| d.value.as_str())
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let map = parse("# Valkyrie 1.1.0 Configuration File\n\n# another\n[MainWin]\nheight=600\n");
        assert_eq!(map.len(), 1);
        assert_eq!(value(&map, "MainWin", "height"), Some("600"));
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let map = parse("[valgrind]\nvg-flags=--tool=memcheck --x=1\n");
        assert_eq!(
            value(&map, "valgrind", "vg-flags"),
            Some("--tool=memcheck --x=1")
        );
    }

    #[test]
    fn line_without_equals_is_a_key_with_empty_value() {
        let map = parse("[misc]\norphan\n");
        assert_eq!(value(&map, "misc", "orphan"), Some(""));
    }

    #[test]
    fn entries_before_any_group_use_empty_group() {
        let map = parse("loose=1\n[a]\nk=v\n");
        assert_eq!(value(&map, "", "loose"), Some("1"));
        assert_eq!(value(&map, "a", "k"), Some("v"));
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let map = parse("[Colors]\r\ntext=0,0,0\r\n");
        assert_eq!(value(&map, "Colors", "text"), Some("0,0,0"));
    }

    #[test]
    fn parsed_entries_are_clean() {
        let map = parse("[a]\nk=v\n");
        assert!(map.values().all(|d| !d.dirty));
    }

    #[test]
    fn render_writes_header_and_groups_in_order() {
        let map = parse("[valkyrie]\ngui=yes\n[Colors]\ntext=0,0,0\nbase=255,255,255\n");
        let stamp = Local.with_ymd_and_hms(2026, 10, 19, 9, 5, 0).single();
        let Some(stamp) = stamp else {
            return;
        };

        let text = render(&map, "Valkyrie", "1.1.0", stamp);
        assert_eq!(
            text,
            "# Valkyrie 1.1.0 Configuration File\n\
             # October 19 09:05 2026\n\
             \n[Colors]\nbase=255,255,255\ntext=0,0,0\n\
             \n[valkyrie]\ngui=yes\n"
        );
    }

    #[test]
    fn rendered_text_parses_back_to_same_entries() {
        let original = parse("[x]\na=1=2\nb=\n[y]\nc=three\n");
        let text = render(&original, "Valkyrie", "1.1.0", Local::now());
        assert_eq!(parse(&text), original);
    }

    #[test]
    fn version_token_extraction() {
        assert_eq!(version_token("# Valkyrie 1.1.0 configuration file"), "1.1.0");
        assert_eq!(version_token("# Valkyrie 2.0.0-beta"), "2.0.0");
        assert_eq!(version_token("no digits here"), "");
        assert_eq!(version_token(""), "");
    }
}
