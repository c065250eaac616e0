use crate::output::print_json;
use clavix_core::{implement, paths, types::CommitStrategy};
use std::path::Path;

pub fn run(
    root: &Path,
    project: Option<&str>,
    commit_strategy: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let strategy = commit_strategy
        .map(str::parse::<CommitStrategy>)
        .transpose()?;
    let config = super::load_config(root)?;
    let project = super::resolve_project(root, project)?;

    // A fresh ledger falls back to the configured strategy.
    let strategy = strategy.or_else(|| {
        (!paths::ledger_path(&project.path).exists())
            .then_some(config.implement.commit_strategy)
    });
    let session = implement::start(&project.path, strategy)?;

    if json {
        return print_json(&session.config);
    }

    let verb = if session.created { "Started" } else { "Resumed" };
    let stats = session.config.stats;
    println!("{verb} implementation of '{}'", project.name);
    println!("  commit strategy: {}", session.config.commit_strategy);
    println!(
        "  progress: {}/{} tasks ({}%)",
        stats.completed, stats.total, stats.percentage
    );
    match &session.config.current_task {
        Some(task) => println!("  next: [{}] {}", task.id, task.description),
        None => println!("  all tasks complete"),
    }
    Ok(())
}
