use crate::output::{print_json, print_table};
use clavix_core::{
    ledger::Stats,
    paths,
    task_file,
    types::{SourceMode, SourceType},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ProjectSummary {
    name: String,
    path: PathBuf,
    prd: Option<SourceType>,
    stats: Option<Stats>,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let summaries: Vec<ProjectSummary> = paths::list_projects(root)?
        .into_iter()
        .map(|p| ProjectSummary {
            prd: paths::locate_prd(&p.path, SourceMode::Auto)
                .ok()
                .map(|(_, source)| source),
            stats: task_file::read(&paths::tasks_path(&p.path))
                .ok()
                .map(|phases| Stats::from_phases(&phases)),
            name: p.name,
            path: p.path,
        })
        .collect();

    if json {
        return print_json(&summaries);
    }

    if summaries.is_empty() {
        println!("No projects under {}", paths::OUTPUTS_DIR);
        return Ok(());
    }

    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.prd.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
                s.stats
                    .map(|st| format!("{}/{} ({}%)", st.completed, st.total, st.percentage))
                    .unwrap_or_else(|| "not planned".into()),
            ]
        })
        .collect();
    print_table(&["PROJECT", "PRD", "PROGRESS"], rows);
    Ok(())
}
