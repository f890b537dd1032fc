use crate::config::EngineConfig;
use crate::interpreter::{run_main, RunMode, Value};
use crate::model::{compile, ProgramDecl};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chime")]
#[command(about = "Chime - a goal-directed generator engine", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the main method of a program
    Run {
        /// Program document (JSON)
        program: PathBuf,

        /// Print every result of main instead of only the first
        #[arg(long)]
        all: bool,

        /// Build a fresh tree for every call instead of reusing pooled bodies
        #[arg(long)]
        no_pool: bool,

        /// Undo plain assignments on backtracking
        #[arg(long)]
        trail: bool,

        /// Arguments passed to main as a list of strings
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },

    /// Validate a program and list its methods
    Check {
        /// Program document (JSON)
        program: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with explicit arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    init_logging(&config.log_filter);

    match cli.command {
        Commands::Run {
            program,
            all,
            no_pool,
            trail,
            args,
        } => {
            let decl = load_program(&program)?;
            let compiled = compile(&decl)
                .with_context(|| format!("Failed to compile {}", program.display()))?;
            let (pool, trail) = (config.pool_enabled && !no_pool, config.trail_assignments || trail);
            let config = config.with_pool(pool).with_trail(trail);
            info!(
                program = %program.display(),
                pool = config.pool_enabled,
                "running main"
            );

            let mode = if all { RunMode::All } else { RunMode::First };
            let args = args.into_iter().map(Value::from).collect();
            let results = run_main(Arc::new(compiled), Arc::new(config), args, mode)
                .with_context(|| format!("Run of {} failed", program.display()))?;
            for value in &results {
                println!("{}", serde_json::to_string(value)?);
            }
        }

        Commands::Check { program } => {
            let decl = load_program(&program)?;
            let compiled = compile(&decl)
                .with_context(|| format!("Failed to compile {}", program.display()))?;
            println!("{}: ok", program.display());
            for name in compiled.method_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

fn load_program(path: &Path) -> Result<ProgramDecl> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ProgramDecl::from_json(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Install the stderr tracing subscriber; `RUST_LOG` wins over `default_filter`
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
