//! The implementation ledger (`.clavix-implement-config.json`).
//!
//! Every mutator is a read-modify-write of the whole document with a fresh
//! top-level `timestamp`. Files are replaced atomically; there is no locking.

use crate::error::{ClavixError, Result};
use crate::io;
use crate::migrations::{self, LEDGER_VERSION};
use crate::types::{CommitStrategy, Task, TaskPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub percentage: u32,
}

impl Stats {
    pub fn new(total: usize, completed: usize) -> Self {
        let completed = completed.min(total);
        let percentage = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            total,
            completed,
            remaining: total - completed,
            percentage,
        }
    }

    pub fn from_phases(phases: &[TaskPhase]) -> Self {
        let total = phases.iter().map(|p| p.tasks.len()).sum();
        let completed = phases.iter().map(TaskPhase::completed_count).sum();
        Self::new(total, completed)
    }

    pub fn is_consistent(&self) -> bool {
        self.completed + self.remaining == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedTask {
    pub task_id: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCheckpoint {
    pub last_task_id: String,
    pub phase_progress: BTreeMap<String, usize>,
    pub session_start_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ImplementConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub commit_strategy: CommitStrategy,
    pub tasks_path: PathBuf,
    pub current_task: Option<Task>,
    pub stats: Stats,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_task_id: Option<String>,
    #[serde(default)]
    pub completed_task_ids: Vec<String>,
    #[serde(default)]
    pub completion_timestamps: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub blocked_tasks: Vec<BlockedTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_checkpoint: Option<ResumeCheckpoint>,
}

fn default_version() -> u32 {
    LEDGER_VERSION
}

impl ImplementConfig {
    pub fn new(
        commit_strategy: CommitStrategy,
        tasks_path: impl Into<PathBuf>,
        current_task: Option<Task>,
        stats: Stats,
    ) -> Self {
        Self {
            version: LEDGER_VERSION,
            commit_strategy,
            tasks_path: tasks_path.into(),
            current_task,
            stats,
            timestamp: Utc::now(),
            last_completed_task_id: None,
            completed_task_ids: Vec::new(),
            completion_timestamps: BTreeMap::new(),
            blocked_tasks: Vec::new(),
            resume_checkpoint: None,
        }
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    /// Record `task_id` as completed at `at`. Returns false when it was
    /// already recorded; its timestamp is refreshed either way.
    pub fn record_completion(&mut self, task_id: &str, at: DateTime<Utc>) -> bool {
        let first = !self.completed_task_ids.iter().any(|id| id == task_id);
        if first {
            self.completed_task_ids.push(task_id.to_string());
        }
        self.completion_timestamps.insert(task_id.to_string(), at);
        self.last_completed_task_id = Some(task_id.to_string());
        first
    }

    pub fn is_recorded_complete(&self, task_id: &str) -> bool {
        self.completed_task_ids.iter().any(|id| id == task_id)
    }

    /// Replaces any earlier entry for the same task.
    pub fn block(&mut self, task_id: &str, reason: &str, at: DateTime<Utc>) {
        self.blocked_tasks.retain(|b| b.task_id != task_id);
        self.blocked_tasks.push(BlockedTask {
            task_id: task_id.to_string(),
            reason: reason.to_string(),
            timestamp: at,
        });
    }

    pub fn unblock(&mut self, task_id: &str) -> bool {
        let before = self.blocked_tasks.len();
        self.blocked_tasks.retain(|b| b.task_id != task_id);
        self.blocked_tasks.len() != before
    }

    pub fn blocked_reason(&self, task_id: &str) -> Option<&str> {
        self.blocked_tasks
            .iter()
            .find(|b| b.task_id == task_id)
            .map(|b| b.reason.as_str())
    }

    /// Session start carries over from an existing checkpoint.
    pub fn checkpoint(
        &mut self,
        last_task_id: &str,
        phase_progress: BTreeMap<String, usize>,
        at: DateTime<Utc>,
    ) {
        let session_start_time = self
            .resume_checkpoint
            .as_ref()
            .map(|c| c.session_start_time)
            .unwrap_or(at);
        self.resume_checkpoint = Some(ResumeCheckpoint {
            last_task_id: last_task_id.to_string(),
            phase_progress,
            session_start_time,
        });
    }

    /// Sync derived fields from a freshly parsed task file.
    pub fn refresh_from_phases(&mut self, phases: &[TaskPhase]) {
        self.stats = Stats::from_phases(phases);
        self.current_task = crate::types::next_task(phases).cloned();
    }

    // ---------------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------------

    pub fn validate(&self) -> Result<()> {
        if self.tasks_path.as_os_str().is_empty() {
            return Err(ClavixError::LedgerInvalid("tasksPath is empty".to_string()));
        }
        if !self.stats.is_consistent() {
            return Err(ClavixError::LedgerInvalid(format!(
                "stats do not add up: completed {} + remaining {} != total {}",
                self.stats.completed, self.stats.remaining, self.stats.total
            )));
        }
        let mut seen = HashSet::new();
        for id in &self.completed_task_ids {
            if !seen.insert(id.as_str()) {
                return Err(ClavixError::LedgerInvalid(format!(
                    "completedTaskIds contains '{id}' more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Structural checks on a raw ledger document.
pub fn validate_document(doc: &Value) -> Result<()> {
    let Some(obj) = doc.as_object() else {
        return Err(ClavixError::LedgerInvalid(
            "ledger must be a JSON object".to_string(),
        ));
    };

    match obj.get("commitStrategy") {
        None | Some(Value::Null) => {
            return Err(ClavixError::LedgerInvalid(
                "commitStrategy is required".to_string(),
            ))
        }
        Some(Value::String(s)) => {
            s.parse::<CommitStrategy>()?;
        }
        Some(other) => return Err(ClavixError::InvalidCommitStrategy(other.to_string())),
    }

    match obj.get("tasksPath") {
        Some(Value::String(s)) if !s.is_empty() => {}
        _ => {
            return Err(ClavixError::LedgerInvalid(
                "tasksPath is required".to_string(),
            ))
        }
    }

    if !obj.contains_key("currentTask") {
        return Err(ClavixError::LedgerInvalid(
            "currentTask is required".to_string(),
        ));
    }

    let Some(stats) = obj.get("stats").and_then(Value::as_object) else {
        return Err(ClavixError::LedgerInvalid("stats is required".to_string()));
    };
    let field = |name: &str| stats.get(name).and_then(Value::as_u64);
    match (field("total"), field("completed"), field("remaining")) {
        (Some(total), Some(completed), Some(remaining)) if completed + remaining == total => {}
        (Some(_), Some(_), Some(_)) => {
            return Err(ClavixError::LedgerInvalid(
                "stats.completed + stats.remaining must equal stats.total".to_string(),
            ))
        }
        _ => {
            return Err(ClavixError::LedgerInvalid(
                "stats requires total, completed and remaining".to_string(),
            ))
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Load and migrate the ledger at `path` as a raw document, without
/// structural checks. This is the read side of [`write_raw`]: a partial
/// document written with `validate = false` comes back migrated but
/// otherwise as written.
pub fn read_raw(path: &Path) -> Result<Value> {
    let Some(data) = io::read_if_exists(path)? else {
        return Err(ClavixError::LedgerNotFound(path.to_path_buf()));
    };
    let mut doc: Value = serde_json::from_str(&data).map_err(|source| {
        ClavixError::LedgerCorrupt {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let found = migrations::migrate_ledger(&mut doc);
    if found < LEDGER_VERSION {
        tracing::info!(
            path = %path.display(),
            from = found,
            to = LEDGER_VERSION,
            "migrated implementation ledger"
        );
    }

    Ok(doc)
}

/// Load, migrate and validate the ledger at `path`. A partial document fails
/// here with `LedgerInvalid`; use [`read_raw`] for those.
pub fn read(path: &Path) -> Result<ImplementConfig> {
    let doc = read_raw(path)?;
    validate_document(&doc)?;
    serde_json::from_value(doc).map_err(|e| ClavixError::LedgerInvalid(e.to_string()))
}

/// Serialize `config` to `path`. `validate = false` is for intermediate
/// writes that are knowingly incomplete.
pub fn write(path: &Path, config: &ImplementConfig, validate: bool) -> Result<()> {
    let doc = serde_json::to_value(config)?;
    if validate {
        validate_document(&doc)?;
        config.validate()?;
    }
    write_document(path, &doc)
}

/// Write an arbitrary (possibly partial) ledger document.
pub fn write_raw(path: &Path, doc: &Value, validate: bool) -> Result<()> {
    if validate {
        validate_document(doc)?;
    }
    write_document(path, doc)
}

fn write_document(path: &Path, doc: &Value) -> Result<()> {
    let mut data = serde_json::to_string_pretty(doc)?;
    data.push('\n');
    io::atomic_write(path, data.as_bytes())
}

/// Generic read-modify-write. The timestamp is refreshed after `f` runs.
pub fn update<F>(path: &Path, f: F) -> Result<ImplementConfig>
where
    F: FnOnce(&mut ImplementConfig),
{
    let mut config = read(path)?;
    f(&mut config);
    config.timestamp = Utc::now();
    write(path, &config, true)?;
    Ok(config)
}

pub fn track_completion(path: &Path, task_id: &str) -> Result<ImplementConfig> {
    update(path, |c| {
        c.record_completion(task_id, Utc::now());
    })
}

pub fn add_blocked_task(path: &Path, task_id: &str, reason: &str) -> Result<ImplementConfig> {
    update(path, |c| c.block(task_id, reason, Utc::now()))
}

pub fn remove_blocked_task(path: &Path, task_id: &str) -> Result<ImplementConfig> {
    update(path, |c| {
        c.unblock(task_id);
    })
}

pub fn create_resume_checkpoint(
    path: &Path,
    last_task_id: &str,
    phase_progress: BTreeMap<String, usize>,
) -> Result<ImplementConfig> {
    update(path, |c| c.checkpoint(last_task_id, phase_progress, Utc::now()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
