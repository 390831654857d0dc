use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Pharmacy shift-checklist CLI.
/// Storage defaults to ~/.rxc/checklist.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "rxc", version, about = "Pharmacy shift checklist CLI")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
