use crate::error::{ClavixError, Result};
use crate::types::{SourceMode, SourceType};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAVIX_DIR: &str = ".clavix";
pub const OUTPUTS_DIR: &str = ".clavix/outputs";
pub const ARCHIVE_DIR_NAME: &str = "archive";

pub const CONFIG_FILE: &str = ".clavix/config.yaml";
pub const TASKS_FILE: &str = "tasks.md";
pub const LEDGER_FILE: &str = ".clavix-implement-config.json";
pub const BACKUP_SUFFIX: &str = ".backup";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn clavix_dir(root: &Path) -> PathBuf {
    root.join(CLAVIX_DIR)
}

pub fn outputs_dir(root: &Path) -> PathBuf {
    root.join(OUTPUTS_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn tasks_path(prd_dir: &Path) -> PathBuf {
    prd_dir.join(TASKS_FILE)
}

pub fn ledger_path(prd_dir: &Path) -> PathBuf {
    prd_dir.join(LEDGER_FILE)
}

pub fn backup_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Project discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDir {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip)]
    pub modified: SystemTime,
}

/// Project directories under `.clavix/outputs`, most recently modified first.
pub fn list_projects(root: &Path) -> Result<Vec<ProjectDir>> {
    let outputs = outputs_dir(root);
    if !outputs.is_dir() {
        return Ok(Vec::new());
    }

    let mut projects = Vec::new();
    for entry in std::fs::read_dir(&outputs)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == ARCHIVE_DIR_NAME || name.starts_with('.') {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        projects.push(ProjectDir {
            name,
            path: entry.path(),
            modified,
        });
    }
    projects.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(projects)
}

pub fn most_recent_project(root: &Path) -> Result<ProjectDir> {
    list_projects(root)?
        .into_iter()
        .next()
        .ok_or_else(|| ClavixError::NoProjects(outputs_dir(root)))
}

pub fn project_dir(root: &Path, name: &str) -> Result<ProjectDir> {
    list_projects(root)?
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ClavixError::ProjectNotFound {
            name: name.to_string(),
            dir: outputs_dir(root),
        })
}

/// Resolve a project by name, or the most recent one when no name is given.
pub fn resolve_project(root: &Path, name: Option<&str>) -> Result<ProjectDir> {
    match name {
        Some(n) => project_dir(root, n),
        None => most_recent_project(root),
    }
}

// ---------------------------------------------------------------------------
// PRD resolution
// ---------------------------------------------------------------------------

/// Find the PRD in `dir` for `mode`. An explicit source type never falls
/// back to another type.
pub fn locate_prd(dir: &Path, mode: SourceMode) -> Result<(PathBuf, SourceType)> {
    for source in mode.candidates() {
        for name in source.filenames() {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok((candidate, source));
            }
        }
    }
    Err(ClavixError::PrdNotFound {
        mode: mode.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
