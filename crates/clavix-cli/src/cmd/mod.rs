pub mod implement;
pub mod init;
pub mod plan;
pub mod projects;
pub mod status;
pub mod task;

use anyhow::Context;
use clavix_core::paths::{self, ProjectDir};
use std::path::Path;

/// The named project, or the most recently modified one.
pub(crate) fn resolve_project(root: &Path, name: Option<&str>) -> anyhow::Result<ProjectDir> {
    paths::resolve_project(root, name).with_context(|| match name {
        Some(n) => format!("cannot open project '{n}'"),
        None => "cannot pick a project".to_string(),
    })
}

pub(crate) fn load_config(root: &Path) -> anyhow::Result<clavix_core::config::Config> {
    let config = clavix_core::config::Config::load(root)
        .with_context(|| format!("failed to load {}", paths::CONFIG_FILE))?;
    for warning in config.validate() {
        tracing::warn!(level = ?warning.level, "{}", warning.message);
    }
    Ok(config)
}
