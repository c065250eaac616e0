use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClavixError {
    #[error("No PRD artifacts found for source {mode} in {}: generate a PRD for this project first", .dir.display())]
    PrdNotFound { mode: String, dir: PathBuf },

    #[error("no projects found under {}: generate a PRD first", .0.display())]
    NoProjects(PathBuf),

    #[error("project not found: {name} (searched {})", .dir.display())]
    ProjectNotFound { name: String, dir: PathBuf },

    #[error("tasks file not found: {}: run `clavix plan` to generate it", .0.display())]
    TasksFileNotFound(PathBuf),

    #[error("tasks file already exists: {}: pass --overwrite to regenerate it", .0.display())]
    TasksFileExists(PathBuf),

    #[error("no tasks found in {}: run `clavix plan --overwrite` to regenerate it", .0.display())]
    TasksFileEmpty(PathBuf),

    #[error("implementation ledger not found: {}: run `clavix implement` to start tracking", .0.display())]
    LedgerNotFound(PathBuf),

    #[error("corrupt implementation ledger {}: {source}: delete it and run `clavix implement` to recreate it", .path.display())]
    LedgerCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid implementation ledger: {0}")]
    LedgerInvalid(String),

    #[error("invalid commit strategy '{0}': expected one of per-task, per-5-tasks, per-phase, none")]
    InvalidCommitStrategy(String),

    #[error("invalid PRD source '{0}': expected one of auto, full, quick, mini, prompt")]
    InvalidSource(String),

    #[error("task not found: {id}. Available task IDs: {available}")]
    TaskIdNotFound { id: String, available: String },

    #[error("failed to mark task {task_id} as completed after retry; tasks file restored. {warnings}")]
    VerificationFailed { task_id: String, warnings: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ClavixError {
    pub fn task_not_found(id: &str, available: &[String]) -> Self {
        let available = if available.is_empty() {
            "(none)".to_string()
        } else {
            available.join(", ")
        };
        ClavixError::TaskIdNotFound {
            id: id.to_string(),
            available,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClavixError>;
