//! # rxc - Pharmacy Shift Checklist CLI
//!
//! A file-backed checklist for pharmacy operations: staff mark recurring and
//! one-off tasks done per shift, administrators configure tasks and view
//! cross-position status.
//!
//! The heart of the tool is the scheduling engine: given a task's recurrence
//! codes and a viewing date, it works out when the instance appears, when it
//! is due, when it locks into missed, and how far a completion carries
//! forward — holiday-aware, with Saturdays counting as business days.
//!
//! ## Quick Start
//!
//! ```bash
//! # Configure a daily task for the dispensary
//! rxc add "Fridge temperature log" --recurrence every_day \
//!     --position dispensary --due-time 09:00
//!
//! # Load this year's public holidays
//! rxc holiday add 2026-01-01
//!
//! # Resolve today's checklist across all positions
//! rxc list
//!
//! # Mark it done and look at tomorrow
//! rxc complete 1 --position dispensary
//! rxc list --date 2026-08-08
//! ```
//!
//! Data is stored locally in `~/.rxc/checklist.json`; pass `--db` to use
//! another store. Tracing is opt-in via `RUST_LOG`.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod aggregate;
pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod cutoff;
pub mod db;
pub mod error;
pub mod fields;
pub mod ordering;
pub mod resolver;
pub mod task;

use cli::Cli;
use cmd::*;
use db::Database;
use error::Result;

fn main() {
    // Tracing is opt-in via RUST_LOG; the engine logs its degradation
    // fallbacks at warn level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };

    // Completions need no store at all.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return Ok(());
    }

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Add {
            title,
            desc,
            recurrence,
            positions,
            categories,
            due_time,
            due_date,
            publish_after,
            start_date,
            end_date,
            order,
        } => cmd_add(
            &mut db, &db_path, title, desc, recurrence, positions, categories, due_time,
            due_date, publish_after, start_date, end_date, order,
        ),

        Commands::List {
            date,
            as_of,
            position,
            status,
            category,
            all,
            limit,
        } => cmd_list(&db, date, as_of, position, status, category, all, limit),

        Commands::View { id, date } => cmd_view(&db, id, date),

        Commands::Update {
            id,
            title,
            desc,
            recurrence,
            positions,
            categories,
            due_time,
            due_date,
            publish_after,
            start_date,
            end_date,
            clear_due_date,
            clear_end_date,
        } => cmd_update(
            &mut db, &db_path, id, title, desc, recurrence, positions, categories, due_time,
            due_date, publish_after, start_date, end_date, clear_due_date, clear_end_date,
        ),

        Commands::Order { id, order, clear } => cmd_order(&mut db, &db_path, id, order, clear),

        Commands::Complete { id, position, by, at } => {
            cmd_complete(&mut db, &db_path, id, position, by, at)
        }

        Commands::Reopen { id, position } => cmd_reopen(&mut db, &db_path, id, position),

        Commands::Holiday { action } => cmd_holiday(&mut db, &db_path, action),

        Commands::Positions { set } => cmd_positions(&mut db, &db_path, set),
    }
}

fn default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let rxc_dir = PathBuf::from(home).join(".rxc");
    std::fs::create_dir_all(&rxc_dir)?;
    Ok(rxc_dir.join("checklist.json"))
}
