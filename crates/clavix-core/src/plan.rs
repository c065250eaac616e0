//! Phase assembly: PRD markdown in, ordered task phases out.
//!
//! Loose features from the core section become categorized phases. Each
//! feature of a Must-Have Features block becomes a phase of its own, numbered
//! after the categorized ones; the block's behavior bullets never count as
//! loose features.
//!
//! Planning never fails on a PRD without recognizable structure. When neither
//! source yields anything, a single default phase is emitted instead.

use crate::categorize::Categorizer;
use crate::error::{ClavixError, Result};
use crate::extract::{extract_features, extract_must_have, strip_must_have, MustHaveFeature};
use crate::markdown::{first_h1, list_items, strip_bold, Sections};
use crate::paths;
use crate::synthesize::{
    behavior_to_task, lowercase_first, normalize_description, starts_with_action_verb, synthesize,
};
use crate::task_file::{self, RenderOptions};
use crate::types::{SourceMode, Task, TaskGenerationResult, TaskPhase};
use chrono::Local;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const CORE_ALIASES: &[&str] = &["requirements", "core features", "features", "key requirements"];
const CONSTRAINT_ALIASES: &[&str] = &[
    "technical requirements",
    "technical constraints",
    "constraints",
];
const SUCCESS_ALIASES: &[&str] = &["success criteria", "acceptance criteria"];

pub const QA_PHASE: &str = "Phase QA: Validation & Success";
const CONSTRAINTS_REF: &str = "Technical Requirements";
const SUCCESS_REF: &str = "Success Criteria";
const MAX_REFERENCE_LEN: usize = 60;

static TITLE_PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn title_prefix_re() -> &'static Regex {
    TITLE_PREFIX_RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:(?:full|quick|mini)\s+)?(?:prd|product requirements document)\s*[:-]\s*")
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub feature_warn_threshold: usize,
    pub task_warn_threshold: usize,
    pub max_constraints: usize,
    pub max_success_criteria: usize,
    /// Replace an existing `tasks.md`.
    pub overwrite: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            feature_warn_threshold: 50,
            task_warn_threshold: 50,
            max_constraints: 3,
            max_success_criteria: 2,
            overwrite: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub phases: Vec<TaskPhase>,
    pub warnings: Vec<String>,
}

fn pending(description: impl Into<String>, reference: Option<String>) -> Task {
    Task {
        id: String::new(),
        description: description.into(),
        phase: String::new(),
        completed: false,
        prd_reference: reference,
    }
}

fn reference_for(feature: &str) -> String {
    let text = strip_bold(feature);
    let capped: String = text.chars().take(MAX_REFERENCE_LEN).collect();
    capped.trim_end().to_string()
}

fn categorized_phases(features: &[String]) -> Vec<TaskPhase> {
    Categorizer::default()
        .group(features)
        .into_iter()
        .enumerate()
        .map(|(i, (category, members))| {
            let mut phase = TaskPhase::new(format!("Phase {}: {}", i + 1, category.label()));
            for feature in members {
                let reference = reference_for(feature);
                for description in synthesize(feature) {
                    phase
                        .tasks
                        .push(pending(description, Some(reference.clone())));
                }
            }
            phase
        })
        .collect()
}

/// One phase per Must-Have feature, numbered after the first `offset` phases.
fn must_have_phases(features: &[MustHaveFeature], offset: usize) -> Vec<TaskPhase> {
    features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let mut phase =
                TaskPhase::new(format!("Phase {}: {}", offset + i + 1, feature.name));
            let reference = Some(feature.name.clone());
            let mut descriptions: Vec<String> = feature
                .behaviors
                .iter()
                .map(|b| behavior_to_task(b))
                .filter(|d| !d.is_empty())
                .collect();
            if descriptions.is_empty() {
                descriptions.push(behavior_to_task(&feature.name));
            }
            for description in descriptions {
                phase.tasks.push(pending(description, reference.clone()));
            }
            phase
        })
        .collect()
}

fn default_phases() -> Vec<TaskPhase> {
    let mut phase = TaskPhase::new("Phase 1: Core Implementation");
    phase.tasks = vec![
        pending("Configure project setup and dependencies", None),
        pending("Implement core functionality", None),
        pending("Add tests for core functionality", None),
    ];
    vec![phase]
}

fn constraints_task(sections: &Sections, limit: usize) -> Option<Task> {
    let section = sections.find(CONSTRAINT_ALIASES)?;
    let items: Vec<String> = list_items(&section.body).into_iter().take(limit).collect();
    if items.is_empty() {
        return None;
    }
    Some(pending(
        format!("Ensure technical constraints are met: {}", items.join("; ")),
        Some(CONSTRAINTS_REF.to_string()),
    ))
}

fn validation_task(criterion: &str) -> String {
    if starts_with_action_verb(criterion) {
        criterion.to_string()
    } else {
        format!("Validate {}", lowercase_first(criterion))
    }
}

fn success_phase(sections: &Sections, limit: usize) -> Option<TaskPhase> {
    let section = sections.find(SUCCESS_ALIASES)?;
    let mut phase = TaskPhase::new(QA_PHASE);
    for criterion in list_items(&section.body).into_iter().take(limit) {
        phase.tasks.push(pending(
            validation_task(&criterion),
            Some(SUCCESS_REF.to_string()),
        ));
    }
    (!phase.tasks.is_empty()).then_some(phase)
}

/// Turn PRD text into phases. Always returns at least one phase with at
/// least one task.
pub fn assemble(prd: &str, opts: &PlanOptions) -> Assembly {
    let sections = Sections::parse(prd);
    let mut warnings = Vec::new();

    let must_have = extract_must_have(prd);
    let features = sections
        .find(CORE_ALIASES)
        .map(|s| extract_features(&strip_must_have(&s.body)))
        .unwrap_or_default();
    let feature_count = features.len() + must_have.len();

    let mut phases = categorized_phases(&features);
    let offset = phases.len();
    phases.extend(must_have_phases(&must_have, offset));
    if phases.is_empty() {
        tracing::debug!("no feature structure found, using default phase");
        phases = default_phases();
    }

    if feature_count > opts.feature_warn_threshold {
        tracing::warn!(
            features = feature_count,
            threshold = opts.feature_warn_threshold,
            "PRD has many features; consider grouping them"
        );
        warnings.push(format!(
            "{feature_count} features found (more than {}); consider grouping related features in the PRD",
            opts.feature_warn_threshold
        ));
    }

    if let Some(task) = constraints_task(&sections, opts.max_constraints) {
        match phases.first_mut() {
            Some(first) => first.tasks.insert(0, task),
            None => {
                let mut phase = TaskPhase::new(format!("Phase 1: {CONSTRAINTS_REF}"));
                phase.tasks.push(task);
                phases.push(phase);
            }
        }
    }

    if let Some(qa) = success_phase(&sections, opts.max_success_criteria) {
        phases.push(qa);
    }

    phases.retain(|p| !p.tasks.is_empty());
    for task in phases.iter_mut().flat_map(|p| p.tasks.iter_mut()) {
        task.description = normalize_description(&task.description);
    }
    task_file::assign_ids(&mut phases);

    let task_count: usize = phases.iter().map(|p| p.tasks.len()).sum();
    if task_count > opts.task_warn_threshold {
        tracing::warn!(
            tasks = task_count,
            threshold = opts.task_warn_threshold,
            "generated plan is large"
        );
        warnings.push(format!(
            "{task_count} tasks generated (more than {}); consider splitting the PRD",
            opts.task_warn_threshold
        ));
    }

    Assembly { phases, warnings }
}

/// Title for the `**Project**:` line: the first H1 without a "PRD:" style prefix.
pub fn project_title(prd: &str) -> Option<String> {
    let h1 = first_h1(prd)?;
    let title = title_prefix_re().replace(&h1, "").trim().to_string();
    (!title.is_empty()).then_some(title)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Locate the PRD in `prd_dir`, assemble its phases and write `tasks.md`.
pub fn generate(prd_dir: &Path, mode: SourceMode, opts: &PlanOptions) -> Result<TaskGenerationResult> {
    let (source_path, source_type) = paths::locate_prd(prd_dir, mode)?;
    let output = paths::tasks_path(prd_dir);
    if output.exists() && !opts.overwrite {
        return Err(ClavixError::TasksFileExists(output));
    }

    let prd = std::fs::read_to_string(&source_path)?;
    let Assembly { phases, warnings } = assemble(&prd, opts);
    let title = project_title(&prd);
    task_file::write(
        &output,
        &phases,
        &RenderOptions {
            project: title.as_deref(),
            generated_at: Local::now(),
        },
    )?;

    let result = TaskGenerationResult::new(phases, output, source_path, source_type, warnings);
    tracing::info!(
        tasks = result.total_tasks,
        phases = result.phases.len(),
        source = %result.source_type,
        "wrote task plan"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
