//! Implementation sessions: the task file, the verifier and the ledger
//! working against one project directory.

use crate::error::{ClavixError, Result};
use crate::ledger::{self, BlockedTask, ImplementConfig, Stats};
use crate::paths;
use crate::task_file;
use crate::types::{find_task, next_task, task_ids, CommitStrategy, Task, TaskPhase};
use crate::verify::{self, MarkOptions, MarkResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Session {
    pub config: ImplementConfig,
    pub phases: Vec<TaskPhase>,
    /// The ledger did not exist before this call.
    pub created: bool,
}

/// Begin or resume tracking for the project in `dir`.
///
/// A new ledger uses `strategy` (or the default). An existing ledger keeps
/// its history and only has its strategy replaced when one is given.
pub fn start(dir: &Path, strategy: Option<CommitStrategy>) -> Result<Session> {
    let tasks_path = paths::tasks_path(dir);
    let ledger_path = paths::ledger_path(dir);
    let phases = task_file::read(&tasks_path)?;

    if ledger_path.exists() {
        let config = ledger::update(&ledger_path, |c| {
            if let Some(s) = strategy {
                c.commit_strategy = s;
            }
            c.tasks_path = tasks_path.clone();
            c.refresh_from_phases(&phases);
        })?;
        tracing::debug!(dir = %dir.display(), "resumed implementation ledger");
        return Ok(Session {
            config,
            phases,
            created: false,
        });
    }

    let config = ImplementConfig::new(
        strategy.unwrap_or_default(),
        tasks_path,
        next_task(&phases).cloned(),
        Stats::from_phases(&phases),
    );
    ledger::write(&ledger_path, &config, true)?;
    tracing::info!(
        dir = %dir.display(),
        strategy = %config.commit_strategy,
        "created implementation ledger"
    );
    Ok(Session {
        config,
        phases,
        created: true,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    #[serde(flatten)]
    pub mark: MarkResult,
    pub stats: Stats,
    pub next_task: Option<Task>,
}

fn phase_progress(phases: &[TaskPhase]) -> BTreeMap<String, usize> {
    phases
        .iter()
        .map(|p| (p.name.clone(), p.completed_count()))
        .collect()
}

/// Check off `task_id` and record it in the ledger.
///
/// The ledger must exist. Nothing is recorded when the checkbox update
/// cannot be verified.
pub fn complete(dir: &Path, task_id: &str, opts: MarkOptions) -> Result<Completion> {
    let tasks_path = paths::tasks_path(dir);
    let ledger_path = paths::ledger_path(dir);
    ledger::read(&ledger_path)?;

    let mark = verify::mark_task_complete(&tasks_path, task_id, opts)?;
    let phases = task_file::read(&tasks_path)?;

    let config = ledger::update(&ledger_path, |c| {
        c.record_completion(&mark.task_id, chrono::Utc::now());
        c.refresh_from_phases(&phases);
        c.checkpoint(&mark.task_id, phase_progress(&phases), chrono::Utc::now());
    })?;

    Ok(Completion {
        mark,
        stats: config.stats,
        next_task: config.current_task,
    })
}

fn require_task(dir: &Path, task_id: &str) -> Result<Task> {
    let phases = task_file::read(&paths::tasks_path(dir))?;
    find_task(&phases, task_id)
        .cloned()
        .ok_or_else(|| ClavixError::task_not_found(task_id, &task_ids(&phases)))
}

/// Mark `task_id` as blocked. Re-blocking replaces the earlier reason.
pub fn block(dir: &Path, task_id: &str, reason: &str) -> Result<ImplementConfig> {
    let task = require_task(dir, task_id)?;
    let config = ledger::add_blocked_task(&paths::ledger_path(dir), &task.id, reason)?;
    tracing::info!(task = %task.id, reason, "task blocked");
    Ok(config)
}

/// Clear the blocked marker. Returns whether the task was blocked.
pub fn unblock(dir: &Path, task_id: &str) -> Result<bool> {
    let task = require_task(dir, task_id)?;
    let mut removed = false;
    ledger::update(&paths::ledger_path(dir), |c| removed = c.unblock(&task.id))?;
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub phases: Vec<TaskPhase>,
    pub stats: Stats,
    pub next_task: Option<Task>,
    pub commit_strategy: Option<CommitStrategy>,
    pub blocked: Vec<BlockedTask>,
    pub last_completed_task_id: Option<String>,
}

/// Progress for `dir`. The task file is authoritative for stats; the ledger
/// is optional and only contributes history.
pub fn status(dir: &Path) -> Result<Status> {
    let phases = task_file::read(&paths::tasks_path(dir))?;
    let ledger_path = paths::ledger_path(dir);
    let config = if ledger_path.exists() {
        Some(ledger::read(&ledger_path)?)
    } else {
        None
    };

    Ok(Status {
        stats: Stats::from_phases(&phases),
        next_task: next_task(&phases).cloned(),
        commit_strategy: config.as_ref().map(|c| c.commit_strategy),
        blocked: config
            .as_ref()
            .map(|c| c.blocked_tasks.clone())
            .unwrap_or_default(),
        last_completed_task_id: config.and_then(|c| c.last_completed_task_id),
        phases,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
