use crate::output::print_json;
use anyhow::Context;
use clavix_core::{plan, types::SourceMode};
use std::path::Path;

pub fn run(
    root: &Path,
    project: Option<&str>,
    source: &str,
    overwrite: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mode: SourceMode = source.parse()?;
    let config = super::load_config(root)?;
    let project = super::resolve_project(root, project)?;

    let mut opts = config.plan_options();
    opts.overwrite = overwrite;
    let result = plan::generate(&project.path, mode, &opts)
        .with_context(|| format!("failed to plan project '{}'", project.name))?;

    if json {
        return print_json(&result);
    }

    println!(
        "Generated {} tasks in {} phases from {} ({})",
        result.total_tasks,
        result.phases.len(),
        result.source_path.display(),
        result.source_type
    );
    for phase in &result.phases {
        println!("  {} ({} tasks)", phase.name, phase.tasks.len());
    }
    println!("Wrote {}", result.output_path.display());
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
