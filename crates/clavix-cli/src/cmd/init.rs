use crate::output::print_json;
use anyhow::Context;
use clavix_core::{config::Config, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let outputs = paths::outputs_dir(root);
    std::fs::create_dir_all(&outputs)
        .with_context(|| format!("failed to create {}", outputs.display()))?;

    let config_path = paths::config_path(root);
    let created_config = Config::init(root).context("failed to write config.yaml")?;

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "outputs": outputs,
            "config": config_path,
            "created_config": created_config,
        }));
    }

    println!("Initialized clavix in: {}", root.display());
    println!("  ready:   {}", paths::OUTPUTS_DIR);
    if created_config {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    Ok(())
}
