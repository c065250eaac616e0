use crate::output::{checkbox, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use clavix_core::{implement, paths, task_file, verify::MarkOptions};
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List tasks with their ids
    List {
        #[arg(long)]
        project: Option<String>,
    },
    /// Check a task off in tasks.md and record it in the ledger
    Complete {
        task_id: String,
        #[arg(long)]
        project: Option<String>,
        /// Skip the tasks.md.backup snapshot
        #[arg(long)]
        no_backup: bool,
    },
    /// Mark a task as blocked
    Block {
        task_id: String,
        #[arg(required = true)]
        reason: Vec<String>,
        #[arg(long)]
        project: Option<String>,
    },
    /// Clear a blocked marker
    Unblock {
        task_id: String,
        #[arg(long)]
        project: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::List { project } => list(root, project.as_deref(), json),
        TaskSubcommand::Complete {
            task_id,
            project,
            no_backup,
        } => complete(root, project.as_deref(), &task_id, no_backup, json),
        TaskSubcommand::Block {
            task_id,
            reason,
            project,
        } => block(root, project.as_deref(), &task_id, &reason.join(" "), json),
        TaskSubcommand::Unblock { task_id, project } => {
            unblock(root, project.as_deref(), &task_id, json)
        }
    }
}

fn list(root: &Path, project: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = super::resolve_project(root, project)?;
    let phases = task_file::read(&paths::tasks_path(&project.path))?;

    if json {
        return print_json(&phases);
    }

    let rows = phases
        .iter()
        .flat_map(|p| &p.tasks)
        .map(|t| {
            vec![
                t.id.clone(),
                checkbox(t.completed).to_string(),
                t.description.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "DONE", "DESCRIPTION"], rows);
    Ok(())
}

fn complete(
    root: &Path,
    project: Option<&str>,
    task_id: &str,
    no_backup: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let project = super::resolve_project(root, project)?;
    let opts = MarkOptions {
        backup: config.implement.backup_before_mark && !no_backup,
    };
    let done = implement::complete(&project.path, task_id, opts)
        .with_context(|| format!("failed to complete task '{task_id}'"))?;

    if json {
        return print_json(&done);
    }

    if done.mark.already_completed {
        println!("Task [{}] was already completed", done.mark.task_id);
    } else {
        println!("Completed task [{}]: {}", done.mark.task_id, done.mark.description);
    }
    for warning in &done.mark.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "Progress: {}/{} tasks ({}%)",
        done.stats.completed, done.stats.total, done.stats.percentage
    );
    match &done.next_task {
        Some(next) => println!("Next: [{}] {}", next.id, next.description),
        None => println!("All tasks complete"),
    }
    Ok(())
}

fn block(
    root: &Path,
    project: Option<&str>,
    task_id: &str,
    reason: &str,
    json: bool,
) -> anyhow::Result<()> {
    let project = super::resolve_project(root, project)?;
    let config = implement::block(&project.path, task_id, reason)?;

    if json {
        return print_json(&config.blocked_tasks);
    }
    println!("Blocked task [{task_id}]: {reason}");
    Ok(())
}

fn unblock(root: &Path, project: Option<&str>, task_id: &str, json: bool) -> anyhow::Result<()> {
    let project = super::resolve_project(root, project)?;
    let removed = implement::unblock(&project.path, task_id)?;

    if json {
        return print_json(&serde_json::json!({ "task_id": task_id, "unblocked": removed }));
    }
    if removed {
        println!("Unblocked task [{task_id}]");
    } else {
        println!("Task [{task_id}] was not blocked");
    }
    Ok(())
}
