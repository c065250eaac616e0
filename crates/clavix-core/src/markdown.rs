//! Line-oriented markdown helpers: level-2 section splitting, heading
//! detection and top-level list item scanning.
//!
//! Nothing here builds a syntax tree. Headings below level 2 stay inside the
//! body of their enclosing section and are left for downstream scanners.

use regex::Regex;
use std::sync::OnceLock;

static H2_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static LIST_ITEM_RE: OnceLock<Regex> = OnceLock::new();
static CHECKBOX_PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn h2_re() -> &'static Regex {
    H2_RE.get_or_init(|| Regex::new(r"^##\s+(.+?)\s*$").unwrap())
}

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)(?:\s+#+)?\s*$").unwrap())
}

fn list_item_re() -> &'static Regex {
    LIST_ITEM_RE.get_or_init(|| Regex::new(r"^(?:[-*]|\d+[.)])\s+(.*\S)\s*$").unwrap())
}

fn checkbox_prefix_re() -> &'static Regex {
    CHECKBOX_PREFIX_RE.get_or_init(|| Regex::new(r"^\[[ xX]\]\s+").unwrap())
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub key: String,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct Sections {
    sections: Vec<Section>,
}

impl Sections {
    /// Split on `## ` headings. Lines before the first heading are dropped.
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        for line in text.lines() {
            if let Some(caps) = h2_re().captures(line) {
                let title = caps[1].to_string();
                sections.push(Section {
                    key: section_key(&title),
                    title,
                    body: String::new(),
                });
                continue;
            }
            if let Some(current) = sections.last_mut() {
                current.body.push_str(line);
                current.body.push('\n');
            }
        }
        Self { sections }
    }

    /// First section whose key equals `key`.
    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// First section matching any alias, tried in alias order.
    pub fn find(&self, aliases: &[&str]) -> Option<&Section> {
        aliases.iter().find_map(|a| self.get(&section_key(a)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Lowercase and drop everything that is not alphanumeric, so
/// "Success Criteria" and "success-criteria!" share a key.
pub fn section_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// `(level, text)` for an ATX heading line.
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = heading_re().captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let text = caps.get(2)?.as_str();
    Some((level, text))
}

/// Text of the first level-1 heading.
pub fn first_h1(text: &str) -> Option<String> {
    text.lines()
        .filter_map(heading)
        .find(|(level, _)| *level == 1)
        .map(|(_, t)| strip_bold(t).trim().to_string())
}

// ---------------------------------------------------------------------------
// List items
// ---------------------------------------------------------------------------

/// True when `line` opens or closes a fenced code block.
pub fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Text of an unindented `-`, `*`, `N.` or `N)` list item.
pub fn top_level_item(line: &str) -> Option<&str> {
    list_item_re()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Top-level list items outside fenced code blocks, normalized.
pub fn list_items(body: &str) -> Vec<String> {
    let mut in_code = false;
    let mut items = Vec::new();
    for line in body.lines() {
        if is_fence(line) {
            in_code = !in_code;
            continue;
        }
        if in_code {
            continue;
        }
        if let Some(item) = top_level_item(line) {
            let item = normalize_item(item);
            if !item.is_empty() {
                items.push(item);
            }
        }
    }
    items
}

/// Collapse whitespace, drop a leading checkbox marker and trailing periods.
pub fn normalize_item(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let unchecked = checkbox_prefix_re().replace(&collapsed, "");
    unchecked.trim_end_matches('.').trim_end().to_string()
}

pub fn strip_bold(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# My App

Intro line that belongs nowhere.

## Core Features
- Feature one
### Detail
More detail

## Success Criteria!
- It works
";

    #[test]
    fn splits_on_level_two_headings() {
        let sections = Sections::parse(DOC);
        assert_eq!(sections.len(), 2);
        let core = sections.get("corefeatures").unwrap();
        assert_eq!(core.title, "Core Features");
        assert!(core.body.contains("### Detail"));
        assert!(core.body.contains("More detail"));
        assert!(!core.body.contains("Intro line"));
    }

    #[test]
    fn keys_collide_across_punctuation() {
        assert_eq!(section_key("Success Criteria"), "successcriteria");
        assert_eq!(section_key("success-criteria!"), "successcriteria");
        let sections = Sections::parse(DOC);
        assert!(sections.find(&["Success Criteria"]).is_some());
    }

    #[test]
    fn find_respects_alias_order() {
        let doc = "## Features\n- a\n## Requirements\n- b\n";
        let sections = Sections::parse(doc);
        let found = sections.find(&["requirements", "features"]).unwrap();
        assert_eq!(found.title, "Requirements");
    }

    #[test]
    fn level_three_is_not_a_split_point() {
        let sections = Sections::parse("### Only three\n- x\n");
        assert!(sections.is_empty());
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading("#### 1. Login"), Some((4, "1. Login")));
        assert_eq!(heading("# Title #"), Some((1, "Title")));
        assert_eq!(heading("#no-space"), None);
    }

    #[test]
    fn closing_hashes_need_leading_space() {
        assert_eq!(heading("#### 1. Support C#"), Some((4, "1. Support C#")));
        assert_eq!(heading("## Port to F# ##"), Some((2, "Port to F#")));
        assert_eq!(heading("## Title ##  "), Some((2, "Title")));
    }

    #[test]
    fn first_h1_skips_lower_levels() {
        assert_eq!(
            first_h1("## Not this\n# **Todo App**\n").as_deref(),
            Some("Todo App")
        );
        assert_eq!(first_h1("## Nope\n"), None);
    }

    #[test]
    fn list_items_are_top_level_only() {
        let body = "- top one\n  - nested\n* star item\n1. numbered\n2) paren\n    3. indented\n";
        assert_eq!(
            list_items(body),
            vec!["top one", "star item", "numbered", "paren"]
        );
    }

    #[test]
    fn list_items_skip_code_fences() {
        let body = "- before\n```\n- inside code\n```\n- after\n";
        assert_eq!(list_items(body), vec!["before", "after"]);
    }

    #[test]
    fn normalize_collapses_and_strips() {
        assert_eq!(normalize_item("  Add   login  form.. "), "Add login form");
        assert_eq!(normalize_item("[x] Done thing."), "Done thing");
    }
}
