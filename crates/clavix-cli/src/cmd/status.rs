use crate::output::{print_json, print_table};
use clavix_core::implement;
use std::path::Path;

pub fn run(root: &Path, project: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = super::resolve_project(root, project)?;
    let status = implement::status(&project.path)?;

    if json {
        return print_json(&serde_json::json!({
            "project": project.name,
            "status": status,
        }));
    }

    let stats = status.stats;
    println!("Project: {}", project.name);
    match status.commit_strategy {
        Some(s) => println!("Commit strategy: {s}"),
        None => println!("Not started (run `clavix implement`)"),
    }
    println!(
        "Progress: {}/{} tasks ({}%)",
        stats.completed, stats.total, stats.percentage
    );
    println!();

    let rows = status
        .phases
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                format!("{}/{}", p.completed_count(), p.tasks.len()),
            ]
        })
        .collect();
    print_table(&["PHASE", "DONE"], rows);

    if !status.blocked.is_empty() {
        println!();
        println!("Blocked:");
        for b in &status.blocked {
            println!("  [{}] {}", b.task_id, b.reason);
        }
    }

    println!();
    match &status.next_task {
        Some(t) => println!("Next: [{}] {}", t.id, t.description),
        None => println!("All tasks complete"),
    }
    Ok(())
}
