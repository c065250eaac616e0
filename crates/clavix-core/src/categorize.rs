use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Phase buckets, declared in the order phases are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Setup,
    Core,
    Testing,
    Documentation,
    Release,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Setup,
            Category::Core,
            Category::Testing,
            Category::Documentation,
            Category::Release,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Setup => "Configuration & Setup",
            Category::Core => "Core Implementation",
            Category::Testing => "Testing & Validation",
            Category::Documentation => "Documentation",
            Category::Release => "Integration & Release",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A fn-pointer rule: the first rule whose predicate holds decides the category.
pub struct CategoryRule {
    pub id: &'static str,
    pub matches: fn(&str) -> bool,
    pub category: Category,
}

static SETUP_RE: OnceLock<Regex> = OnceLock::new();
static TESTING_RE: OnceLock<Regex> = OnceLock::new();
static DOCS_RE: OnceLock<Regex> = OnceLock::new();
static RELEASE_RE: OnceLock<Regex> = OnceLock::new();

fn is_setup(feature: &str) -> bool {
    SETUP_RE
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(config\w*|setup|set up|install\w*|dependenc(y|ies)|environment\w*)\b",
            )
            .unwrap()
        })
        .is_match(feature)
}

fn is_testing(feature: &str) -> bool {
    TESTING_RE
        .get_or_init(|| Regex::new(r"(?i)\b(tests?|testing|coverage|verify|verification|qa)\b").unwrap())
        .is_match(feature)
}

fn is_documentation(feature: &str) -> bool {
    DOCS_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b(document\w*|docs|readme|changelog|guides?)\b").unwrap()
        })
        .is_match(feature)
}

fn is_release(feature: &str) -> bool {
    RELEASE_RE
        .get_or_init(|| {
            Regex::new(r"(?i)\b(integrat\w*|release\w*|deploy\w*|publish\w*|build)\b").unwrap()
        })
        .is_match(feature)
}

/// Rules in precedence order. Anything unmatched is core implementation.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            id: "setup",
            matches: is_setup,
            category: Category::Setup,
        },
        CategoryRule {
            id: "testing",
            matches: is_testing,
            category: Category::Testing,
        },
        CategoryRule {
            id: "documentation",
            matches: is_documentation,
            category: Category::Documentation,
        },
        CategoryRule {
            id: "release",
            matches: is_release,
            category: Category::Release,
        },
    ]
}

// ---------------------------------------------------------------------------
// Categorizer
// ---------------------------------------------------------------------------

pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Categorizer {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn categorize(&self, feature: &str) -> Category {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(feature))
            .map(|rule| rule.category)
            .unwrap_or(Category::Core)
    }

    /// Bucket features by category. Buckets come out in declaration order,
    /// empty ones omitted; features keep their input order within a bucket.
    pub fn group<'a>(&self, features: &'a [String]) -> Vec<(Category, Vec<&'a str>)> {
        Category::all()
            .iter()
            .filter_map(|&category| {
                let members: Vec<&str> = features
                    .iter()
                    .map(String::as_str)
                    .filter(|f| self.categorize(f) == category)
                    .collect();
                (!members.is_empty()).then_some((category, members))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
