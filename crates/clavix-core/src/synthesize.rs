//! Turning one feature line into actionable, verb-led task descriptions.

use crate::markdown::strip_bold;
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_DESCRIPTION_LEN: usize = 150;

/// Verbs a behavior may already start with to be used verbatim.
pub const ACTION_VERBS: &[&str] = &[
    "Create",
    "Add",
    "Implement",
    "Build",
    "Generate",
    "Read",
    "Write",
    "Parse",
    "Analyze",
    "Display",
    "Update",
    "Handle",
    "Process",
    "Execute",
    "Mark",
    "Track",
    "Ensure",
    "Validate",
    "Configure",
];

/// Verbs the synthesizer emits on its own follow-up tasks.
const FOLLOW_UP_VERBS: &[&str] = &["Verify", "Test"];

// ---------------------------------------------------------------------------
// Verb detection
// ---------------------------------------------------------------------------

fn leading_word(text: &str) -> &str {
    let end = text
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(text.len());
    &text[..end]
}

fn leading_verb_in<'a>(text: &str, verbs: &'a [&'a str]) -> Option<&'a str> {
    let word = leading_word(text.trim_start());
    verbs.iter().copied().find(|v| v.eq_ignore_ascii_case(word))
}

/// The whitelisted action verb `text` starts with, if any.
pub fn leading_action_verb(text: &str) -> Option<&'static str> {
    leading_verb_in(text, ACTION_VERBS)
}

pub fn starts_with_action_verb(text: &str) -> bool {
    leading_action_verb(text).is_some()
}

fn starts_with_accepted_verb(text: &str) -> bool {
    starts_with_action_verb(text) || leading_verb_in(text, FOLLOW_UP_VERBS).is_some()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Rewrite a behavior statement as a task: strip bold markup and prefix
/// "Implement " unless it already opens with an action verb.
pub fn behavior_to_task(behavior: &str) -> String {
    let text = strip_bold(behavior).trim().to_string();
    if text.is_empty() {
        return text;
    }
    if starts_with_action_verb(&text) {
        return capitalize_first(&text);
    }
    format!("Implement {}", lowercase_first(&text))
}

/// The feature with any leading action verb removed, for use inside
/// follow-up task sentences ("Add tests covering <subject>").
pub fn feature_subject(feature: &str) -> String {
    let text = strip_bold(feature).trim().to_string();
    match leading_action_verb(&text) {
        Some(verb) => {
            let rest = text[verb.len()..].trim_start();
            if rest.is_empty() {
                lowercase_first(&text)
            } else {
                lowercase_first(rest)
            }
        }
        None => lowercase_first(&text),
    }
}

/// Cap at [`MAX_DESCRIPTION_LEN`] characters, ending with "..." when cut.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_LEN {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
    format!("{}...", kept.trim_end())
}

/// The uniform contract every emitted task satisfies: verb-led and at most
/// [`MAX_DESCRIPTION_LEN`] characters.
pub fn normalize_description(text: &str) -> String {
    let text = strip_bold(text).split_whitespace().collect::<Vec<_>>().join(" ");
    let led = if starts_with_accepted_verb(&text) {
        capitalize_first(&text)
    } else {
        behavior_to_task(&text)
    };
    truncate_description(&led)
}

// ---------------------------------------------------------------------------
// Feature kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Config,
    Documentation,
    Test,
    Conversion,
    Complex,
}

/// A keyword rule; rules are evaluated in order and the first match wins.
pub struct KindRule {
    pub kind: FeatureKind,
    pub pattern: &'static str,
}

pub fn default_kind_rules() -> &'static [KindRule] {
    &[
        KindRule {
            kind: FeatureKind::Config,
            pattern: r"(?i)\b(config\w*|configure|settings?|setup|set up)\b",
        },
        KindRule {
            kind: FeatureKind::Documentation,
            pattern: r"(?i)\b(document\w*|docs|readme|guides?)\b",
        },
        KindRule {
            kind: FeatureKind::Test,
            pattern: r"(?i)\b(tests?|testing)\b",
        },
        KindRule {
            kind: FeatureKind::Conversion,
            pattern: r"(?i)\b(conver\w*|migrat\w*|transform\w*)\b",
        },
    ]
}

static KIND_MATCHERS: OnceLock<Vec<(FeatureKind, Regex)>> = OnceLock::new();

fn kind_matchers() -> &'static [(FeatureKind, Regex)] {
    KIND_MATCHERS.get_or_init(|| {
        default_kind_rules()
            .iter()
            .map(|r| (r.kind, Regex::new(r.pattern).unwrap()))
            .collect()
    })
}

pub fn feature_kind(feature: &str) -> FeatureKind {
    kind_matchers()
        .iter()
        .find(|(_, re)| re.is_match(feature))
        .map(|(kind, _)| *kind)
        .unwrap_or(FeatureKind::Complex)
}

/// One or two task descriptions for a feature, depending on its kind.
pub fn synthesize(feature: &str) -> Vec<String> {
    let task = behavior_to_task(feature);
    let subject = feature_subject(feature);
    match feature_kind(feature) {
        FeatureKind::Config | FeatureKind::Documentation => vec![task],
        FeatureKind::Test => vec![task, format!("Verify {subject} passes successfully")],
        FeatureKind::Conversion => vec![task, format!("Test {subject} works correctly")],
        FeatureKind::Complex => vec![task, format!("Add tests covering {subject}")],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
