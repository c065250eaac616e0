//! Checking off a task in `tasks.md`.
//!
//! The file is patched in place, one line only, then re-parsed to confirm
//! the checkbox actually flipped. A failed check restores the pre-attempt
//! content and retries once; a second failure restores again and errors.

use crate::error::{ClavixError, Result};
use crate::io;
use crate::paths::backup_path;
use crate::task_file::{self, LocatedTask};
use crate::types::Task;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

const MAX_ATTEMPTS: u32 = 2;

// ---------------------------------------------------------------------------
// Patchers
// ---------------------------------------------------------------------------

/// Produces the new file content with `task` checked, or `None` when the
/// task's line cannot be found.
pub trait CheckboxPatcher {
    fn patch(&mut self, content: &str, task: &Task) -> Option<String>;
}

/// Flips `[ ]` to `[x]` on the one line matching the task's escaped
/// description and reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexPatcher;

impl RegexPatcher {
    fn line_pattern(task: &Task) -> Option<Regex> {
        let reference = task
            .prd_reference
            .as_deref()
            .map(|r| format!(r"\s+\(ref:\s*{}\)", regex::escape(r)))
            .unwrap_or_default();
        let pattern = format!(
            r"^(\s*-\s)\[ \](\s+{}{}\s*)$",
            regex::escape(&task.description),
            reference
        );
        Regex::new(&pattern).ok()
    }
}

fn splice(content: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(content.len() + 1);
    out.push_str(&content[..range.start]);
    out.push_str(replacement);
    out.push_str(&content[range.end..]);
    out
}

fn line_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        ranges.push(offset..offset + line.len());
        offset += raw.len();
    }
    ranges
}

impl CheckboxPatcher for RegexPatcher {
    fn patch(&mut self, content: &str, task: &Task) -> Option<String> {
        let re = Self::line_pattern(task)?;
        let flip = |range: Range<usize>| {
            let checked = re.replace(&content[range.clone()], "${1}[x]${2}");
            splice(content, range, &checked)
        };

        // The line the id points at, when it still reads as expected.
        let located = task_file::scan(content)
            .into_iter()
            .find(|l: &LocatedTask| l.task.id == task.id);
        if let Some(l) = located {
            if re.is_match(&content[l.line.clone()]) {
                return Some(flip(l.line));
            }
        }

        // Otherwise only an unambiguous match anywhere in the file.
        let mut candidates = line_ranges(content)
            .into_iter()
            .filter(|r| re.is_match(&content[r.clone()]));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(flip(only)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Backup guard
// ---------------------------------------------------------------------------

/// Holds the pre-attempt state of a task file. Dropping an armed guard puts
/// that state back; `release` keeps the new content and deletes the backup.
struct BackupGuard {
    target: PathBuf,
    backup: Option<PathBuf>,
    snapshot: String,
    armed: bool,
}

impl BackupGuard {
    fn acquire(target: &Path, snapshot: &str, on_disk: bool) -> Result<Self> {
        let backup = if on_disk {
            let path = backup_path(target);
            io::atomic_write(&path, snapshot.as_bytes())?;
            Some(path)
        } else {
            None
        };
        Ok(Self {
            target: target.to_path_buf(),
            backup,
            snapshot: snapshot.to_string(),
            armed: true,
        })
    }

    fn restore(&self) -> Result<()> {
        let data = match &self.backup {
            Some(path) => std::fs::read(path)?,
            None => self.snapshot.clone().into_bytes(),
        };
        io::atomic_write(&self.target, &data)
    }

    /// Success: keep the patched file, drop the backup.
    fn release(mut self) -> Result<()> {
        self.armed = false;
        if let Some(path) = &self.backup {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Failure after an explicit restore: leave the backup for inspection.
    fn disarm(mut self) -> Option<PathBuf> {
        self.armed = false;
        self.backup.take()
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.restore() {
            tracing::warn!(
                path = %self.target.display(),
                error = %e,
                "failed to restore tasks file from backup"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct MarkOptions {
    /// Snapshot the file to `<tasks>.backup` before patching.
    pub backup: bool,
}

impl Default for MarkOptions {
    fn default() -> Self {
        Self { backup: true }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkResult {
    pub success: bool,
    pub task_id: String,
    pub description: String,
    pub already_completed: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub struct Verifier<P = RegexPatcher> {
    patcher: P,
}

impl Default for Verifier<RegexPatcher> {
    fn default() -> Self {
        Self::new(RegexPatcher)
    }
}

impl<P: CheckboxPatcher> Verifier<P> {
    pub fn new(patcher: P) -> Self {
        Self { patcher }
    }

    /// Check off `task_id` in the task file at `path`.
    pub fn mark_complete(
        &mut self,
        path: &Path,
        task_id: &str,
        opts: MarkOptions,
    ) -> Result<MarkResult> {
        let Some(content) = io::read_if_exists(path)? else {
            return Err(ClavixError::TasksFileNotFound(path.to_path_buf()));
        };

        let located = task_file::scan(&content);
        let Some(target) = located.iter().find(|l| l.task.id == task_id) else {
            let ids: Vec<String> = located.iter().map(|l| l.task.id.clone()).collect();
            return Err(ClavixError::task_not_found(task_id, &ids));
        };
        let task = target.task.clone();

        if task.completed {
            return Ok(MarkResult {
                success: true,
                task_id: task.id,
                description: task.description,
                already_completed: true,
                attempts: 0,
                warnings: Vec::new(),
            });
        }

        let guard = BackupGuard::acquire(path, &content, opts.backup)?;
        let mut warnings = Vec::new();

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tracing::warn!(task = %task.id, attempt, "retrying checkbox update");
                guard.restore()?;
            }
            if self.attempt(path, &content, &task, attempt, &mut warnings)? {
                guard.release()?;
                return Ok(MarkResult {
                    success: true,
                    task_id: task.id,
                    description: task.description,
                    already_completed: false,
                    attempts: attempt,
                    warnings,
                });
            }
        }

        guard.restore()?;
        if let Some(backup) = guard.disarm() {
            warnings.push(format!("backup kept at {}", backup.display()));
        }
        Err(ClavixError::VerificationFailed {
            task_id: task.id,
            warnings: warnings.join("; "),
        })
    }

    fn attempt(
        &mut self,
        path: &Path,
        content: &str,
        task: &Task,
        attempt: u32,
        warnings: &mut Vec<String>,
    ) -> Result<bool> {
        let Some(patched) = self.patcher.patch(content, task) else {
            warnings.push(format!(
                "attempt {attempt}: no unchecked line matches \"{}\"",
                task.description
            ));
            return Ok(false);
        };
        io::atomic_write(path, patched.as_bytes())?;

        let reread = std::fs::read_to_string(path)?;
        let phases = task_file::parse(&reread);
        match crate::types::find_task(&phases, &task.id) {
            Some(t) if t.completed && t.description == task.description => Ok(true),
            Some(_) => {
                warnings.push(format!(
                    "attempt {attempt}: {} still unchecked after update",
                    task.id
                ));
                Ok(false)
            }
            None => {
                warnings.push(format!(
                    "attempt {attempt}: {} no longer present after update",
                    task.id
                ));
                Ok(false)
            }
        }
    }
}

/// Check off `task_id` with the default line patcher.
pub fn mark_task_complete(path: &Path, task_id: &str, opts: MarkOptions) -> Result<MarkResult> {
    Verifier::<RegexPatcher>::default().mark_complete(path, task_id, opts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TASKS: &str = "\
# Implementation Tasks

**Generated**: 2025-01-01 00:00:00

---

## Phase 1: Setup

- [ ] Configure project tooling
- [x] Add CI workflow

My own notes, do not touch.

## Phase 2: Core

- [ ] Implement search (ref: Search)
- [ ] Add tests covering search (ref: Search)

---

*footer*
";

    fn write_tasks(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("tasks.md");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn changed_lines(before: &str, after: &str) -> Vec<(String, String)> {
        before
            .lines()
            .zip(after.lines())
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn marks_only_the_target_line() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, TASKS);

        let result = mark_task_complete(&path, "phase-1-setup-1", MarkOptions::default()).unwrap();
        assert!(result.success);
        assert!(!result.already_completed);
        assert_eq!(result.attempts, 1);

        let after = std::fs::read_to_string(&path).unwrap();
        assert_eq!(after.len(), TASKS.len());
        assert_eq!(
            changed_lines(TASKS, &after),
            vec![(
                "- [ ] Configure project tooling".to_string(),
                "- [x] Configure project tooling".to_string()
            )]
        );
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn already_completed_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, TASKS);
        let result = mark_task_complete(&path, "phase-1-setup-2", MarkOptions::default()).unwrap();
        assert!(result.already_completed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TASKS);
    }

    #[test]
    fn unknown_id_lists_valid_ids() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, TASKS);
        let err = mark_task_complete(&path, "phase-9-1", MarkOptions::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("phase-9-1"));
        assert!(msg.contains("phase-1-setup-1, phase-1-setup-2, phase-2-core-1, phase-2-core-2"));
    }

    #[test]
    fn same_reference_different_description() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, TASKS);
        mark_task_complete(&path, "phase-2-core-2", MarkOptions::default()).unwrap();
        let phases = task_file::parse(&std::fs::read_to_string(&path).unwrap());
        assert!(!phases[1].tasks[0].completed);
        assert!(phases[1].tasks[1].completed);
    }

    #[test]
    fn duplicate_lines_resolve_by_position() {
        let content = "## A\n- [ ] Add logging\n## B\n- [ ] Add logging\n";
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, content);
        mark_task_complete(&path, "b-1", MarkOptions { backup: false }).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "## A\n- [ ] Add logging\n## B\n- [x] Add logging\n"
        );
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let content = "## A\r\n- [ ] Build parser\r\n- [ ] Add tests\r\n";
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, content);
        mark_task_complete(&path, "a-2", MarkOptions::default()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "## A\r\n- [ ] Build parser\r\n- [x] Add tests\r\n"
        );
    }

    struct NeverPatcher;

    impl CheckboxPatcher for NeverPatcher {
        fn patch(&mut self, content: &str, _task: &Task) -> Option<String> {
            // writes something that parses but leaves the box unchecked
            Some(content.replace("My own notes", "Scribbled notes"))
        }
    }

    #[test]
    fn failed_verification_restores_file() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, TASKS);
        let err = Verifier::new(NeverPatcher)
            .mark_complete(&path, "phase-1-setup-1", MarkOptions::default())
            .unwrap_err();
        match err {
            ClavixError::VerificationFailed { task_id, warnings } => {
                assert_eq!(task_id, "phase-1-setup-1");
                assert!(warnings.contains("attempt 1"));
                assert!(warnings.contains("attempt 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TASKS);
        // backup left behind after a failed mark
        assert!(backup_path(&path).exists());
    }

    struct FlakyPatcher {
        calls: u32,
    }

    impl CheckboxPatcher for FlakyPatcher {
        fn patch(&mut self, content: &str, task: &Task) -> Option<String> {
            self.calls += 1;
            if self.calls == 1 {
                None
            } else {
                RegexPatcher.patch(content, task)
            }
        }
    }

    #[test]
    fn retry_succeeds_on_second_attempt() {
        let dir = TempDir::new().unwrap();
        let path = write_tasks(&dir, TASKS);
        let result = Verifier::new(FlakyPatcher { calls: 0 })
            .mark_complete(&path, "phase-2-core-1", MarkOptions::default())
            .unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(!backup_path(&path).exists());
        let phases = task_file::parse(&std::fs::read_to_string(&path).unwrap());
        assert!(phases[1].tasks[0].completed);
    }

    #[test]
    fn regex_patcher_refuses_ambiguous_fallback() {
        let task = Task {
            id: "gone-1".to_string(),
            description: "Add logging".to_string(),
            phase: "Gone".to_string(),
            completed: false,
            prd_reference: None,
        };
        let content = "## A\n- [ ] Add logging\n## B\n- [ ] Add logging\n";
        assert!(RegexPatcher.patch(content, &task).is_none());
        let single = "## A\n- [ ] Add logging\n";
        assert_eq!(
            RegexPatcher.patch(single, &task).unwrap(),
            "## A\n- [x] Add logging\n"
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err =
            mark_task_complete(&dir.path().join("tasks.md"), "a-1", MarkOptions::default())
                .unwrap_err();
        assert!(matches!(err, ClavixError::TasksFileNotFound(_)));
    }
}
