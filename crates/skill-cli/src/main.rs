use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use skill_kernel::{KernelConfig, StartupError};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "skill")]
#[command(about = "Skill Kernel - discovers, indexes, and serves AI agent skill tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to an explicit `.skill-engine.toml` (default: auto-detect in
    /// the current directory)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the kernel and serve tools over MCP
    Serve {
        /// Use HTTP streaming transport instead of stdio
        #[arg(long)]
        http: bool,

        /// Host to bind to (HTTP transport only)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (HTTP transport only)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// One-shot scan of every configured skill root, reporting tool
    /// counts and security verdicts
    Scan,

    /// Dump the current tool dispatch snapshot
    #[command(alias = "ls")]
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Rank indexed tools against a free-text task description
    Search {
        /// Task description
        query: String,

        /// Fully-qualified tool names always included first
        #[arg(long, value_delimiter = ',')]
        core: Vec<String>,
    },

    /// Security report for every discovered skill
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Write tracing to stderr: stdout is reserved for MCP stdio JSON-RPC.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        let exit_code = e
            .downcast_ref::<StartupError>()
            .map(StartupError::exit_code)
            .unwrap_or(1);
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(path) => KernelConfig::load(&path)?,
        None => KernelConfig::load_from_dir(&std::env::current_dir()?)?,
    };

    match cli.command {
        Commands::Serve { http, host, port } => commands::serve::execute(config, http, host, port).await,
        Commands::Scan => commands::scan::execute(config),
        Commands::List { format } => commands::list::execute(config, &format),
        Commands::Search { query, core } => commands::search::execute(config, &query, &core),
        Commands::Doctor => commands::doctor::execute(config),
    }
}
