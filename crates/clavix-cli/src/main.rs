mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::task::TaskSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "clavix",
    about = "Turn PRDs into checkbox task plans and track their completion",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .clavix/ or .git/)
    #[arg(long, global = true, env = "CLAVIX_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .clavix/ and a default config
    Init,

    /// Generate tasks.md from a project's PRD
    Plan {
        /// Project directory name under .clavix/outputs (default: most recent)
        #[arg(long)]
        project: Option<String>,

        /// PRD source: auto, full, quick, mini or prompt
        #[arg(long, default_value = "auto")]
        source: String,

        /// Replace an existing tasks.md
        #[arg(long)]
        overwrite: bool,
    },

    /// Start or resume an implementation session
    Implement {
        #[arg(long)]
        project: Option<String>,

        /// per-task, per-5-tasks, per-phase or none
        #[arg(long)]
        commit_strategy: Option<String>,
    },

    /// List, complete and block tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Show progress for a project
    Status {
        #[arg(long)]
        project: Option<String>,
    },

    /// List projects under .clavix/outputs, newest first
    Projects,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Plan {
            project,
            source,
            overwrite,
        } => cmd::plan::run(&root, project.as_deref(), &source, overwrite, cli.json),
        Commands::Implement {
            project,
            commit_strategy,
        } => cmd::implement::run(
            &root,
            project.as_deref(),
            commit_strategy.as_deref(),
            cli.json,
        ),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Status { project } => cmd::status::run(&root, project.as_deref(), cli.json),
        Commands::Projects => cmd::projects::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
