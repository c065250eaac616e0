use crate::error::Result;
use crate::paths;
use crate::plan::PlanOptions;
use crate::types::CommitStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ImplementDefaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementDefaults {
    #[serde(default)]
    pub commit_strategy: CommitStrategy,
    #[serde(default = "default_backup")]
    pub backup_before_mark: bool,
}

fn default_backup() -> bool {
    true
}

impl Default for ImplementDefaults {
    fn default() -> Self {
        Self {
            commit_strategy: CommitStrategy::default(),
            backup_before_mark: default_backup(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlanningConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default = "default_warn_threshold")]
    pub feature_warn_threshold: usize,
    #[serde(default = "default_warn_threshold")]
    pub task_warn_threshold: usize,
    #[serde(default = "default_max_constraints")]
    pub max_constraints: usize,
    #[serde(default = "default_max_success_criteria")]
    pub max_success_criteria: usize,
}

fn default_warn_threshold() -> usize {
    50
}

fn default_max_constraints() -> usize {
    3
}

fn default_max_success_criteria() -> usize {
    2
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            feature_warn_threshold: default_warn_threshold(),
            task_warn_threshold: default_warn_threshold(),
            max_constraints: default_max_constraints(),
            max_success_criteria: default_max_success_criteria(),
        }
    }
}

impl From<&PlanningConfig> for PlanOptions {
    fn from(cfg: &PlanningConfig) -> Self {
        PlanOptions {
            feature_warn_threshold: cfg.feature_warn_threshold,
            task_warn_threshold: cfg.task_warn_threshold,
            max_constraints: cfg.max_constraints,
            max_success_criteria: cfg.max_success_criteria,
            overwrite: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub implement: ImplementDefaults,
    #[serde(default)]
    pub planning: PlanningConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            implement: ImplementDefaults::default(),
            planning: PlanningConfig::default(),
        }
    }
}

impl Config {
    /// Load `.clavix/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        match crate::io::read_if_exists(&path)? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Write the default config unless one exists. Returns true if written.
    pub fn init(root: &Path) -> Result<bool> {
        let data = serde_yaml::to_string(&Self::default())?;
        crate::io::write_if_missing(&paths::config_path(root), data.as_bytes())
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions::from(&self.planning)
    }

    /// Soft problems worth surfacing; none of them stop planning.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.version != default_version() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "unsupported config version {} (expected {})",
                    self.version,
                    default_version()
                ),
            });
        }
        let p = &self.planning;
        if p.feature_warn_threshold == 0 || p.task_warn_threshold == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "a warn threshold of 0 flags every PRD as oversized".to_string(),
            });
        }
        if p.max_constraints == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_constraints is 0: technical constraints are ignored".to_string(),
            });
        }
        if p.max_success_criteria == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_success_criteria is 0: no validation phase is generated"
                    .to_string(),
            });
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.implement.commit_strategy, CommitStrategy::None);
        assert!(cfg.implement.backup_before_mark);
        assert_eq!(cfg.planning.feature_warn_threshold, 50);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = paths::config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "implement:\n  commit_strategy: per-phase\nplanning:\n  max_constraints: 5\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.implement.commit_strategy, CommitStrategy::PerPhase);
        assert_eq!(cfg.planning.max_constraints, 5);
        assert_eq!(cfg.planning.max_success_criteria, 2);
        assert_eq!(cfg.plan_options().max_constraints, 5);
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.implement.commit_strategy = CommitStrategy::PerFiveTasks;
        cfg.save(dir.path()).unwrap();
        let raw = std::fs::read_to_string(paths::config_path(dir.path())).unwrap();
        assert!(raw.contains("per-5-tasks"));
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.implement.commit_strategy, CommitStrategy::PerFiveTasks);
    }

    #[test]
    fn init_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        assert!(Config::init(dir.path()).unwrap());
        let path = paths::config_path(dir.path());
        std::fs::write(&path, "planning:\n  max_constraints: 1\n").unwrap();
        assert!(!Config::init(dir.path()).unwrap());
        assert_eq!(Config::load(dir.path()).unwrap().planning.max_constraints, 1);
    }

    #[test]
    fn validate_flags_zero_limits_and_bad_version() {
        let mut cfg = Config::default();
        cfg.version = 7;
        cfg.planning.max_success_criteria = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
    }

    #[test]
    fn invalid_commit_strategy_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = paths::config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "implement:\n  commit_strategy: sometimes\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
