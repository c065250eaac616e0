use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Task / TaskPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub description: String,
    pub phase: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPhase {
    pub name: String,
    pub tasks: Vec<Task>,
}

impl TaskPhase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }
}

/// All tasks across phases, in file order.
pub fn all_tasks(phases: &[TaskPhase]) -> impl Iterator<Item = &Task> {
    phases.iter().flat_map(|p| p.tasks.iter())
}

pub fn find_task<'a>(phases: &'a [TaskPhase], id: &str) -> Option<&'a Task> {
    all_tasks(phases).find(|t| t.id == id)
}

/// First task not yet checked off.
pub fn next_task(phases: &[TaskPhase]) -> Option<&Task> {
    all_tasks(phases).find(|t| !t.completed)
}

pub fn task_ids(phases: &[TaskPhase]) -> Vec<String> {
    all_tasks(phases).map(|t| t.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// SourceType / SourceMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Full,
    Quick,
    Mini,
    Prompt,
}

impl SourceType {
    /// Auto-detection order.
    pub fn all() -> &'static [SourceType] {
        &[
            SourceType::Full,
            SourceType::Quick,
            SourceType::Mini,
            SourceType::Prompt,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Full => "full",
            SourceType::Quick => "quick",
            SourceType::Mini => "mini",
            SourceType::Prompt => "prompt",
        }
    }

    /// Candidate filenames, highest priority first.
    pub fn filenames(self) -> &'static [&'static str] {
        match self {
            SourceType::Full => &[
                "full-prd.md",
                "PRD.md",
                "prd.md",
                "Full-PRD.md",
                "FULL-PRD.md",
                "FULL_PRD.md",
                "full_prd.md",
            ],
            SourceType::Quick => &["quick-prd.md", "QUICK_PRD.md"],
            SourceType::Mini => &["mini-prd.md"],
            SourceType::Prompt => &["optimized-prompt.md"],
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = crate::error::ClavixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(SourceType::Full),
            "quick" => Ok(SourceType::Quick),
            "mini" => Ok(SourceType::Mini),
            "prompt" => Ok(SourceType::Prompt),
            _ => Err(crate::error::ClavixError::InvalidSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Auto,
    Only(SourceType),
}

impl SourceMode {
    pub fn candidates(self) -> Vec<SourceType> {
        match self {
            SourceMode::Auto => SourceType::all().to_vec(),
            SourceMode::Only(t) => vec![t],
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Auto => f.write_str("auto"),
            SourceMode::Only(t) => write!(f, "{t}"),
        }
    }
}

impl std::str::FromStr for SourceMode {
    type Err = crate::error::ClavixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(SourceMode::Auto),
            other => other.parse().map(SourceMode::Only),
        }
    }
}

// ---------------------------------------------------------------------------
// CommitStrategy
// ---------------------------------------------------------------------------

/// Recorded as data only; nothing in the engine commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommitStrategy {
    #[serde(rename = "per-task")]
    PerTask,
    #[serde(rename = "per-5-tasks")]
    PerFiveTasks,
    #[serde(rename = "per-phase")]
    PerPhase,
    #[default]
    #[serde(rename = "none")]
    None,
}

impl CommitStrategy {
    pub fn all() -> &'static [CommitStrategy] {
        &[
            CommitStrategy::PerTask,
            CommitStrategy::PerFiveTasks,
            CommitStrategy::PerPhase,
            CommitStrategy::None,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommitStrategy::PerTask => "per-task",
            CommitStrategy::PerFiveTasks => "per-5-tasks",
            CommitStrategy::PerPhase => "per-phase",
            CommitStrategy::None => "none",
        }
    }
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitStrategy {
    type Err = crate::error::ClavixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitStrategy::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| crate::error::ClavixError::InvalidCommitStrategy(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TaskGenerationResult
// ---------------------------------------------------------------------------

/// Snapshot of one `plan` run. The written tasks file is authoritative
/// afterwards; this value is not meant to be kept around.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGenerationResult {
    pub phases: Vec<TaskPhase>,
    pub total_tasks: usize,
    pub output_path: PathBuf,
    pub source_path: PathBuf,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TaskGenerationResult {
    pub fn new(
        phases: Vec<TaskPhase>,
        output_path: PathBuf,
        source_path: PathBuf,
        source_type: SourceType,
        warnings: Vec<String>,
    ) -> Self {
        let total_tasks = phases.iter().map(|p| p.tasks.len()).sum();
        Self {
            phases,
            total_tasks,
            output_path,
            source_path,
            source_type,
            warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            description: format!("Implement {id}"),
            phase: "Phase 1: Core".to_string(),
            completed,
            prd_reference: None,
        }
    }

    #[test]
    fn commit_strategy_parses_known_values() {
        for s in CommitStrategy::all() {
            assert_eq!(s.as_str().parse::<CommitStrategy>().unwrap(), *s);
        }
        assert!("per-commit".parse::<CommitStrategy>().is_err());
    }

    #[test]
    fn commit_strategy_serializes_hyphenated() {
        let json = serde_json::to_string(&CommitStrategy::PerFiveTasks).unwrap();
        assert_eq!(json, "\"per-5-tasks\"");
    }

    #[test]
    fn source_mode_parses_auto_and_types() {
        assert_eq!("auto".parse::<SourceMode>().unwrap(), SourceMode::Auto);
        assert_eq!(
            "quick".parse::<SourceMode>().unwrap(),
            SourceMode::Only(SourceType::Quick)
        );
        assert!("huge".parse::<SourceMode>().is_err());
    }

    #[test]
    fn generation_result_counts_tasks() {
        let mut a = TaskPhase::new("A");
        a.tasks.push(task("a-1", false));
        a.tasks.push(task("a-2", true));
        let mut b = TaskPhase::new("B");
        b.tasks.push(task("b-1", false));
        let result = TaskGenerationResult::new(
            vec![a, b],
            PathBuf::from("tasks.md"),
            PathBuf::from("full-prd.md"),
            SourceType::Full,
            Vec::new(),
        );
        assert_eq!(result.total_tasks, 3);
    }

    #[test]
    fn next_task_skips_completed() {
        let mut p = TaskPhase::new("A");
        p.tasks.push(task("a-1", true));
        p.tasks.push(task("a-2", false));
        let phases = vec![p];
        assert_eq!(next_task(&phases).unwrap().id, "a-2");
        assert_eq!(phases[0].completed_count(), 1);
    }

    #[test]
    fn task_omits_missing_reference() {
        let json = serde_json::to_value(task("a-1", false)).unwrap();
        assert!(json.get("prdReference").is_none());
        assert_eq!(json["completed"], false);
    }
}
