//! Feature extraction from a PRD section.
//!
//! Only unindented list items count as features. Nested bullets describe how
//! a feature works and must not turn into features of their own.

use crate::markdown::{self, heading, strip_bold};
use crate::synthesize::starts_with_action_verb;
use regex::Regex;
use std::sync::OnceLock;

const MIN_FEATURE_LEN: usize = 25;

static CODE_RE: OnceLock<Regex> = OnceLock::new();
static CONSTRAINT_RE: OnceLock<Regex> = OnceLock::new();
static NUMBERED_TITLE_RE: OnceLock<Regex> = OnceLock::new();
static BEHAVIOR_LABEL_RE: OnceLock<Regex> = OnceLock::new();
static BOLD_LABEL_RE: OnceLock<Regex> = OnceLock::new();
static ANY_BULLET_RE: OnceLock<Regex> = OnceLock::new();

fn code_re() -> &'static Regex {
    CODE_RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            \.(ts|tsx|js|jsx|mjs|cjs|json|md|rs|py|go|java|rb|php|cs|cpp|c|h|sh|ya?ml|toml|css|scss|html|sql|txt|lock)\b
            | ^\s*import\s+["'{*]
            | ^\s*import\s+.*\bfrom\s+["']
            | \bimport\s*\(
            | \brequire\s*\(
            | \bexport\s+(default|const|function|class|type|interface)\b
            | ^\s*[{\[]
            "#,
        )
        .unwrap()
    })
}

fn constraint_re() -> &'static Regex {
    CONSTRAINT_RE.get_or_init(|| Regex::new(r"(?i)\b(must|should|required)\b").unwrap())
}

fn numbered_title_re() -> &'static Regex {
    NUMBERED_TITLE_RE.get_or_init(|| Regex::new(r"^\d+[.)]\s*").unwrap())
}

fn behavior_label_re() -> &'static Regex {
    BEHAVIOR_LABEL_RE
        .get_or_init(|| Regex::new(r"(?i)^\*\*behaviou?r:?\*\*:?\s*$").unwrap())
}

fn bold_label_re() -> &'static Regex {
    BOLD_LABEL_RE.get_or_init(|| Regex::new(r"^\*\*[^*]+\*\*:?").unwrap())
}

fn any_bullet_re() -> &'static Regex {
    ANY_BULLET_RE.get_or_init(|| Regex::new(r"^\s*(?:[-*]|\d+[.)])\s+(.*\S)\s*$").unwrap())
}

/// Looks like a path, a code fragment or a module statement.
pub fn looks_like_code(item: &str) -> bool {
    code_re().is_match(item)
}

/// Modal constraint language, or too short to be a feature on its own.
pub fn looks_like_constraint(item: &str) -> bool {
    constraint_re().is_match(item)
        || (item.chars().count() < MIN_FEATURE_LEN && !starts_with_action_verb(item))
}

/// Top-level list items of `section` that read like features.
pub fn extract_features(section: &str) -> Vec<String> {
    markdown::list_items(section)
        .into_iter()
        .filter(|item| !looks_like_code(item) && !looks_like_constraint(item))
        .collect()
}

// ---------------------------------------------------------------------------
// Must-Have Features structure
// ---------------------------------------------------------------------------

/// A `#### N. Name` entry under a "Must-Have Features" heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MustHaveFeature {
    pub name: String,
    pub behaviors: Vec<String>,
}

/// Parse the "Must-Have Features" block anywhere in `doc`: level-4 headings
/// (or one level below the block heading) naming features, each with an
/// optional `**Behavior**:` bullet list.
pub fn extract_must_have(doc: &str) -> Vec<MustHaveFeature> {
    let mut features: Vec<MustHaveFeature> = Vec::new();
    let mut block_level: Option<usize> = None;
    let mut in_behavior = false;
    let mut in_code = false;

    for line in doc.lines() {
        if markdown::is_fence(line) {
            in_code = !in_code;
            continue;
        }
        if in_code {
            continue;
        }

        if let Some((level, text)) = heading(line) {
            match block_level {
                None => {
                    if markdown::section_key(text) == "musthavefeatures" {
                        block_level = Some(level);
                    }
                }
                Some(open) if level <= open => break,
                Some(open) if level == 4 || level == open + 1 => {
                    let title = strip_bold(text);
                    let name = numbered_title_re().replace(&title, "").trim().to_string();
                    features.push(MustHaveFeature {
                        name,
                        behaviors: Vec::new(),
                    });
                    in_behavior = false;
                }
                Some(_) => in_behavior = false,
            }
            continue;
        }

        if block_level.is_none() {
            continue;
        }
        let Some(current) = features.last_mut() else {
            continue;
        };

        let trimmed = line.trim();
        if behavior_label_re().is_match(trimmed) {
            in_behavior = true;
            continue;
        }
        if !in_behavior || trimmed.is_empty() {
            continue;
        }
        if let Some(caps) = any_bullet_re().captures(line) {
            let item = markdown::normalize_item(&caps[1]);
            if !item.is_empty() {
                current.behaviors.push(item);
            }
        } else if bold_label_re().is_match(trimmed) {
            // next label (e.g. **Acceptance**:) ends the behavior list
            in_behavior = false;
        }
    }

    features.retain(|f| !f.name.is_empty());
    features
}

/// `doc` with every line of the Must-Have Features block removed, so the
/// block's behavior bullets are not read a second time as loose features.
pub fn strip_must_have(doc: &str) -> String {
    let mut block_level: Option<usize> = None;
    let mut in_code = false;
    let mut kept = Vec::new();

    for line in doc.lines() {
        if markdown::is_fence(line) {
            in_code = !in_code;
        } else if !in_code {
            if let Some((level, text)) = heading(line) {
                match block_level {
                    None if markdown::section_key(text) == "musthavefeatures" => {
                        block_level = Some(level);
                    }
                    Some(open) if level <= open => block_level = None,
                    _ => {}
                }
            }
        }
        if block_level.is_none() {
            kept.push(line);
        }
    }
    kept.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_features() {
        let section = "- Users can create and edit notes offline\n- Add pagination\n";
        assert_eq!(
            extract_features(section),
            vec!["Users can create and edit notes offline", "Add pagination"]
        );
    }

    #[test]
    fn skips_nested_and_fenced_items() {
        let section = "\
- Dashboard shows weekly spending trends
  - uses a bar chart component
```
- Fenced item that looks like a real feature
```
";
        assert_eq!(
            extract_features(section),
            vec!["Dashboard shows weekly spending trends"]
        );
    }

    #[test]
    fn drops_code_and_paths() {
        let section = "\
- Update src/config/settings.ts with the new flag
- import { thing } from 'somewhere/else/entirely'
- {\"key\": \"value\", \"other\": \"thing here\"}
- Notifications are sent when a budget is exceeded
";
        assert_eq!(
            extract_features(section),
            vec!["Notifications are sent when a budget is exceeded"]
        );
    }

    #[test]
    fn prose_about_importing_is_not_code() {
        let section = "\
- Users can import contacts from a CSV file
- Import contacts from a CSV file upload
- import Papa, { parse } from \"papaparse\"
- import * as csv from 'csv-parse'
- const rows = await import('./rows')
";
        assert_eq!(
            extract_features(section),
            vec![
                "Users can import contacts from a CSV file",
                "Import contacts from a CSV file upload",
            ]
        );
    }

    #[test]
    fn drops_constraint_language_and_short_items() {
        let section = "\
- The API must respond within 200 milliseconds
- Passwords should be hashed with a strong algorithm
- Fast
- Track
- Exports are available as CSV and PDF files
";
        assert_eq!(
            extract_features(section),
            vec!["Track", "Exports are available as CSV and PDF files"]
        );
    }

    #[test]
    fn normalizes_whitespace_and_periods() {
        let section = "1.   Users   can archive finished projects.\n";
        assert_eq!(
            extract_features(section),
            vec!["Users can archive finished projects"]
        );
    }

    #[test]
    fn parses_must_have_block() {
        let doc = "\
## Requirements
### Must-Have Features
#### 1. Login
**Behavior**:
- Users can log in
- Sessions expire after inactivity
**Acceptance**:
- not a behavior
#### 2. **Profile**
Some prose.
### Nice-to-Have
#### 3. Themes
**Behavior**:
- Dark mode
";
        let features = extract_must_have(doc);
        assert_eq!(
            features,
            vec![
                MustHaveFeature {
                    name: "Login".to_string(),
                    behaviors: vec![
                        "Users can log in".to_string(),
                        "Sessions expire after inactivity".to_string(),
                    ],
                },
                MustHaveFeature {
                    name: "Profile".to_string(),
                    behaviors: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn strip_must_have_keeps_surrounding_lines() {
        let doc = "\
- Dashboard shows weekly spending trends
### Must-Have Features
#### 1. Login
**Behavior**:
- Sessions expire after thirty minutes of inactivity
### Nice-to-Have
- Exports are available as CSV and PDF files
";
        assert_eq!(
            extract_features(&strip_must_have(doc)),
            vec![
                "Dashboard shows weekly spending trends",
                "Exports are available as CSV and PDF files",
            ]
        );
        assert_eq!(strip_must_have("- a\n- b"), "- a\n- b");
    }

    #[test]
    fn must_have_absent_yields_nothing() {
        assert!(extract_must_have("## Features\n#### 1. Orphan\n- x\n").is_empty());
    }
}
