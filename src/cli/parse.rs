//! CLI parse: clap types for gencomplete. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// gencomplete - turn task completion signals into generation records
#[derive(Parser)]
#[command(name = "gencomplete")]
#[command(about = "Record finished generation tasks as generations and variants")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory searched for config/config.toml
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store path (overrides storage.store_path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process one completion signal read from a JSON file
    Complete {
        /// Path to the completion payload
        #[arg(long)]
        payload: PathBuf,
        /// Print the decision events emitted while processing
        #[arg(long)]
        events: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the generation a task produced and its variants
    Show {
        #[arg(long)]
        task: Uuid,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the children of a parent generation by ordinal
    Children {
        #[arg(long)]
        parent: Uuid,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Rebuild generation records by replaying an exported dump of finished tasks
    Recover {
        /// JSON file holding an array of task rows
        #[arg(long)]
        tasks: PathBuf,
        /// List what would be replayed without writing
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Register a shot so generations can be placed in it
    AddShot {
        #[arg(long)]
        shot: Uuid,
    },
    /// Show the completion table
    Types {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Complete { .. } => "complete",
            Commands::Show { .. } => "show",
            Commands::Children { .. } => "children",
            Commands::Recover { .. } => "recover",
            Commands::AddShot { .. } => "add-shot",
            Commands::Types { .. } => "types",
            Commands::Config => "config",
        }
    }
}
