//! Reading and writing the checkbox task file (`tasks.md`).
//!
//! Task ids are not stored in the file. They are regenerated on every parse
//! as `<phase-slug>-<ordinal>`, so an id is only meaningful for the file
//! content it was read from: renaming a phase or reordering tasks changes
//! the ids. Writing phases and parsing the result reproduces each task's
//! description, completion flag and reference.

use crate::error::{ClavixError, Result};
use crate::io;
use crate::markdown::heading;
use crate::types::{Task, TaskPhase};
use chrono::{DateTime, Local};
use regex::Regex;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

pub const TITLE: &str = "# Implementation Tasks";
pub const FOOTER: &str =
    "*Generated by Clavix. Check tasks off with `clavix task complete <id>` as you finish them.*";

const MAX_PHASE_SLUG_LEN: usize = 40;

static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();
static SLUG_SEP_RE: OnceLock<Regex> = OnceLock::new();

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| {
        Regex::new(r"^\s*-\s\[([ xX])\]\s+(.+?)(?:\s+\(ref:\s*(.+?)\))?\s*$").unwrap()
    })
}

fn slug_sep_re() -> &'static Regex {
    SLUG_SEP_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Lowercase, hyphenated, length-capped slug of a phase name.
pub fn phase_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    let slug = slug_sep_re().replace_all(&lower, "-");
    let capped: String = slug.trim_matches('-').chars().take(MAX_PHASE_SLUG_LEN).collect();
    let capped = capped.trim_end_matches('-');
    if capped.is_empty() {
        "phase".to_string()
    } else {
        capped.to_string()
    }
}

/// `ordinal` is 1-based within the phase.
pub fn task_id(phase: &str, ordinal: usize) -> String {
    format!("{}-{}", phase_slug(phase), ordinal)
}

/// Stamp ids and phase names onto every task, in order.
pub fn assign_ids(phases: &mut [TaskPhase]) {
    for phase in phases.iter_mut() {
        let name = phase.name.clone();
        for (i, task) in phase.tasks.iter_mut().enumerate() {
            task.id = task_id(&name, i + 1);
            task.phase = name.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

pub struct RenderOptions<'a> {
    pub project: Option<&'a str>,
    pub generated_at: DateTime<Local>,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            project: None,
            generated_at: Local::now(),
        }
    }
}

pub fn checkbox_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    match &task.prd_reference {
        Some(r) => format!("- [{mark}] {} (ref: {r})", task.description),
        None => format!("- [{mark}] {}", task.description),
    }
}

pub fn render(phases: &[TaskPhase], opts: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push_str("\n\n");
    if let Some(project) = opts.project {
        out.push_str(&format!("**Project**: {project}\n\n"));
    }
    out.push_str(&format!(
        "**Generated**: {}\n\n",
        opts.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str("---\n\n");

    for phase in phases.iter().filter(|p| !p.tasks.is_empty()) {
        out.push_str(&format!("## {}\n\n", phase.name));
        for task in &phase.tasks {
            out.push_str(&checkbox_line(task));
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
    out.push_str(FOOTER);
    out.push('\n');
    out
}

/// Render and atomically replace `path`.
pub fn write(path: &Path, phases: &[TaskPhase], opts: &RenderOptions) -> Result<()> {
    io::atomic_write(path, render(phases, opts).as_bytes())
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// A parsed task and the byte range of its line (without the line ending).
#[derive(Debug, Clone)]
pub struct LocatedTask {
    pub task: Task,
    pub line: Range<usize>,
}

/// Every checkbox task under a `## ` heading, in file order.
pub fn scan(content: &str) -> Vec<LocatedTask> {
    let mut found = Vec::new();
    let mut phase: Option<String> = None;
    let mut ordinal = 0;
    let mut offset = 0;

    for raw in content.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);

        if let Some((level, text)) = heading(line) {
            if level == 2 {
                phase = Some(text.to_string());
                ordinal = 0;
            }
            continue;
        }

        let Some(name) = phase.as_ref() else {
            continue;
        };
        let Some(caps) = checkbox_re().captures(line) else {
            continue;
        };
        ordinal += 1;
        found.push(LocatedTask {
            task: Task {
                id: task_id(name, ordinal),
                description: caps[2].to_string(),
                phase: name.clone(),
                completed: !caps[1].trim().is_empty(),
                prd_reference: caps.get(3).map(|m| m.as_str().to_string()),
            },
            line: start..start + line.len(),
        });
    }
    found
}

/// Group scanned tasks back into phases. Phases without tasks are dropped.
pub fn parse(content: &str) -> Vec<TaskPhase> {
    let mut phases: Vec<TaskPhase> = Vec::new();
    for located in scan(content) {
        let task = located.task;
        match phases.last_mut() {
            Some(p) if p.name == task.phase => p.tasks.push(task),
            _ => {
                let mut p = TaskPhase::new(task.phase.clone());
                p.tasks.push(task);
                phases.push(p);
            }
        }
    }
    phases
}

pub fn read(path: &Path) -> Result<Vec<TaskPhase>> {
    let Some(content) = io::read_if_exists(path)? else {
        return Err(ClavixError::TasksFileNotFound(path.to_path_buf()));
    };
    let phases = parse(&content);
    if phases.is_empty() {
        return Err(ClavixError::TasksFileEmpty(path.to_path_buf()));
    }
    Ok(phases)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn task(description: &str, completed: bool, prd_reference: Option<&str>) -> Task {
        Task {
            id: String::new(),
            description: description.to_string(),
            phase: String::new(),
            completed,
            prd_reference: prd_reference.map(str::to_string),
        }
    }

    fn sample() -> Vec<TaskPhase> {
        let mut setup = TaskPhase::new("Phase 1: Configuration & Setup");
        setup.tasks.push(task("Configure CI pipeline", true, None));
        let mut core = TaskPhase::new("Phase 2: Core Implementation");
        core.tasks.push(task("Implement shopping cart", false, Some("Shopping cart")));
        core.tasks.push(task(
            "Add tests covering shopping cart (guest checkout)",
            false,
            Some("Shopping cart (guest checkout)"),
        ));
        let mut phases = vec![setup, core];
        assign_ids(&mut phases);
        phases
    }

    fn fixed_opts() -> RenderOptions<'static> {
        RenderOptions {
            project: Some("Todo App"),
            generated_at: Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
        }
    }

    #[test]
    fn phase_slug_is_lowercase_hyphenated_and_capped() {
        assert_eq!(phase_slug("Phase 1: Setup"), "phase-1-setup");
        assert_eq!(
            phase_slug("Phase 1: Configuration & Setup"),
            "phase-1-configuration-setup"
        );
        assert_eq!(phase_slug("Phase QA: Validation & Success"), "phase-qa-validation-success");
        let long = phase_slug(&"word ".repeat(30));
        assert!(long.len() <= MAX_PHASE_SLUG_LEN);
        assert!(!long.ends_with('-'));
        assert_eq!(phase_slug("!!!"), "phase");
    }

    #[test]
    fn render_layout() {
        let out = render(&sample(), &fixed_opts());
        let expected = "\
# Implementation Tasks

**Project**: Todo App

**Generated**: 2025-03-04 05:06:07

---

## Phase 1: Configuration & Setup

- [x] Configure CI pipeline

## Phase 2: Core Implementation

- [ ] Implement shopping cart (ref: Shopping cart)
- [ ] Add tests covering shopping cart (guest checkout) (ref: Shopping cart (guest checkout))

---

";
        assert!(out.starts_with(expected), "got:\n{out}");
        assert!(out.trim_end().ends_with(FOOTER));
    }

    #[test]
    fn render_omits_project_line_and_empty_phases() {
        let mut phases = sample();
        phases.push(TaskPhase::new("Phase 9: Empty"));
        let out = render(&phases, &RenderOptions::default());
        assert!(!out.contains("**Project**"));
        assert!(!out.contains("Phase 9"));
    }

    #[test]
    fn round_trip_preserves_task_fields() {
        let phases = sample();
        let parsed = parse(&render(&phases, &fixed_opts()));
        assert_eq!(parsed, phases);
    }

    #[test]
    fn ids_are_regenerated_from_position() {
        let content = "## Phase 1: Setup\n- [ ] Configure linting\n- [x] Add CI\n## Phase 2: Core\n- [ ] Build API\n";
        let phases = parse(content);
        let ids: Vec<&str> = phases
            .iter()
            .flat_map(|p| p.tasks.iter().map(|t| t.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["phase-1-setup-1", "phase-1-setup-2", "phase-2-core-1"]);
        assert!(phases[0].tasks[1].completed);
    }

    #[test]
    fn parse_ignores_prose_and_orphan_checkboxes() {
        let content = "\
# Implementation Tasks
- [ ] Orphan before any phase
## Phase 1: Core
Some notes the user typed.
- [X] Uppercase mark counts
  - [ ] Indented checkbox still counts
* [ ] star bullets do not
";
        let phases = parse(content);
        assert_eq!(phases.len(), 1);
        let descs: Vec<&str> = phases[0].tasks.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["Uppercase mark counts", "Indented checkbox still counts"]);
        assert!(phases[0].tasks[0].completed);
    }

    #[test]
    fn scan_reports_line_spans() {
        let content = "## P\r\n- [ ] First\r\n- [ ] Second\n";
        let found = scan(content);
        assert_eq!(&content[found[0].line.clone()], "- [ ] First");
        assert_eq!(&content[found[1].line.clone()], "- [ ] Second");
    }

    #[test]
    fn read_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.md");
        assert!(matches!(read(&path), Err(ClavixError::TasksFileNotFound(_))));
        std::fs::write(&path, "# Implementation Tasks\n\nnothing here\n").unwrap();
        assert!(matches!(read(&path), Err(ClavixError::TasksFileEmpty(_))));
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.md");
        write(&path, &sample(), &fixed_opts()).unwrap();
        assert_eq!(read(&path).unwrap(), sample());
    }
}
