//! Command implementations for the CLI interface.
//!
//! This module contains the command handlers: task configuration CRUD,
//! status resolution for a viewing date, completion recording, and the
//! holiday/position management the engine's calendar and ordering depend
//! on.

use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::aggregate::{self, ViewMode};
use crate::cli::Cli;
use crate::cutoff::{self, FrequencyCutoff};
use crate::db::{
    parse_date_arg, parse_moment_arg, parse_time_arg, resolve_task_identifier, split_csv,
    Database,
};
use crate::error::{Error, Result};
use crate::fields::{format_status, Recurrence, Status};
use crate::ordering;
use crate::task::{PositionCompletion, TaskDefinition, TaskInstance, CUSTOM_ORDER_UNSET};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task definition.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Recurrence code. May be repeated and comma-separated.
        #[arg(long = "recurrence", required = true)]
        recurrence: Vec<String>,
        /// Responsible position. May be repeated; the first drives ordering.
        #[arg(long = "position", required = true)]
        positions: Vec<String>,
        /// Category label. May be repeated and comma-separated.
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Due time of day, HH:MM. Defaults to 17:00.
        #[arg(long)]
        due_time: Option<String>,
        /// Explicit due date, YYYY-MM-DD. Required for once-off codes.
        #[arg(long)]
        due_date: Option<String>,
        /// Hold the task back from display until this date.
        #[arg(long)]
        publish_after: Option<String>,
        /// Explicit start of the visibility window.
        #[arg(long)]
        start_date: Option<String>,
        /// End of the visibility window.
        #[arg(long)]
        end_date: Option<String>,
        /// Administrator display order; lower sorts first.
        #[arg(long)]
        order: Option<u32>,
    },

    /// Resolve and list task statuses for a viewing date.
    List {
        /// Viewing date, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// As-of moment "YYYY-MM-DD HH:MM". Defaults to now.
        #[arg(long)]
        as_of: Option<String>,
        /// Resolve for a single position instead of the all-positions view.
        #[arg(long)]
        position: Option<String>,
        /// Filter to one resolved status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by category.
        #[arg(long)]
        category: Option<String>,
        /// Include tasks outside their visibility window.
        #[arg(long)]
        all: bool,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a task, its cutoffs and its completion records.
    View {
        /// Task ID or title.
        id: String,
        /// Anchor date for the cutoffs, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Replace the recurrence codes. May be repeated.
        #[arg(long = "recurrence")]
        recurrence: Vec<String>,
        /// Replace the responsible positions. May be repeated.
        #[arg(long = "position")]
        positions: Vec<String>,
        /// Replace the categories. May be repeated.
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        due_time: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
        #[arg(long)]
        publish_after: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        /// Clear the explicit due date.
        #[arg(long)]
        clear_due_date: bool,
        /// Clear the end of the visibility window.
        #[arg(long)]
        clear_end_date: bool,
    },

    /// Set or clear the administrator display order of a task.
    Order {
        /// Task ID or title.
        id: String,
        /// New order value; lower sorts first.
        order: Option<u32>,
        /// Reset to the default ordering.
        #[arg(long)]
        clear: bool,
    },

    /// Record a completion for a position.
    Complete {
        /// Task ID or title.
        id: String,
        /// Position completing the task.
        #[arg(long)]
        position: String,
        /// Staff member recording the completion.
        #[arg(long)]
        by: Option<String>,
        /// Completion moment "YYYY-MM-DD HH:MM". Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Remove a position's completion record.
    Reopen {
        /// Task ID or title.
        id: String,
        #[arg(long)]
        position: String,
    },

    /// Manage public-holiday dates.
    Holiday {
        #[command(subcommand)]
        action: HolidayAction,
    },

    /// Show or replace the position display order.
    Positions {
        /// Comma-separated display order, highest priority first.
        #[arg(long)]
        set: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HolidayAction {
    /// Add a holiday date (YYYY-MM-DD).
    Add { date: String },
    /// Remove a holiday date (YYYY-MM-DD).
    Remove { date: String },
    /// List holidays, optionally for one year.
    List {
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Add a new task definition to the store.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    desc: Option<String>,
    recurrence: Vec<String>,
    positions: Vec<String>,
    categories: Vec<String>,
    due_time: Option<String>,
    due_date: Option<String>,
    publish_after: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    order: Option<u32>,
) -> Result<()> {
    let recurrence = split_csv(&recurrence);
    let positions = split_csv(&positions);
    let categories = split_csv(&categories);
    let due_time = due_time.as_deref().map(parse_time_arg).transpose()?;
    let due_date = due_date.as_deref().map(parse_date_arg).transpose()?;
    let publish_after = publish_after.as_deref().map(parse_date_arg).transpose()?;
    let start_date = start_date.as_deref().map(parse_date_arg).transpose()?;
    let end_date = end_date.as_deref().map(parse_date_arg).transpose()?;

    warn_about_codes(&recurrence, due_date);

    // Positions the store hasn't seen yet join the back of the display order.
    for position in &positions {
        if !db.positions.contains(position) {
            db.positions.push(position.clone());
        }
    }

    let now_utc = Local::now().timestamp();
    let id = db.next_id();
    let task = TaskDefinition {
        id,
        title,
        description: desc,
        responsibilities: positions,
        categories,
        recurrence,
        due_time,
        due_date,
        custom_order: order.unwrap_or(CUSTOM_ORDER_UNSET),
        publish_after,
        start_date,
        end_date,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
        completions: Vec::new(),
    };
    db.tasks.push(task);
    db.save(db_path)?;
    println!("Added task {id}");
    Ok(())
}

/// Resolve every task for a viewing date and print the status table.
#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    db: &Database,
    date: Option<String>,
    as_of: Option<String>,
    position: Option<String>,
    status: Option<Status>,
    category: Option<String>,
    all: bool,
    limit: Option<usize>,
) -> Result<()> {
    let viewing = match date.as_deref() {
        Some(s) => parse_date_arg(s)?,
        None => Local::now().date_naive(),
    };
    let as_of = match as_of.as_deref() {
        Some(s) => parse_moment_arg(s)?,
        None => Local::now().naive_local(),
    };
    let cal = db.calendar();
    let mode = match position.as_deref() {
        Some(p) => ViewMode::Position(p),
        None => ViewMode::AllPositions,
    };

    let mut rows: Vec<(&TaskDefinition, Status, Vec<String>)> = Vec::new();
    for task in &db.tasks {
        // A position-filtered view only covers that position's tasks.
        if let ViewMode::Position(p) = mode {
            if !task.responsibilities.iter().any(|r| r == p) {
                continue;
            }
        }
        let instance = TaskInstance {
            instance_date: viewing,
            completions: task.completions.clone(),
        };
        let resolved = aggregate::effective_status(task, &instance, &cal, as_of, mode);
        if resolved == Status::NotVisible && !all {
            continue;
        }
        if let Some(filter) = status {
            if resolved != filter {
                continue;
            }
        }
        if let Some(ref c) = category {
            if !task.categories.contains(c) {
                continue;
            }
        }
        let done_by: Vec<String> = aggregate::completed_positions(task, &instance, &cal, as_of)
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        rows.push((task, resolved, done_by));
    }

    rows.sort_by(|a, b| ordering::compare(a.0, b.0, &db.positions));
    if let Some(n) = limit {
        rows.truncate(n);
    }

    println!(
        "{:<5} {:<12} {:<17} {:<18} {}",
        "ID", "Status", "Due", "Done by", "Title [categories]"
    );
    for (task, resolved, done_by) in rows {
        let due = earliest_cutoff(task, &cal, viewing)
            .map(|cut| format!("{} {}", cut.due_date.format("%a %d %b"), cut.due_time.format("%H:%M")))
            .unwrap_or_else(|| {
                format!("{} {}", viewing.format("%a %d %b"), task.effective_due_time().format("%H:%M"))
            });
        let done = if done_by.is_empty() {
            "-".to_string()
        } else {
            done_by.join(",")
        };
        let categories = if task.categories.is_empty() {
            String::new()
        } else {
            format!(" [{}]", task.categories.join(","))
        };
        println!(
            "{:<5} {:<12} {:<17} {:<18} {}{}",
            task.id,
            format_status(resolved),
            due,
            truncate(&done, 18),
            task.title,
            categories
        );
    }
    Ok(())
}

/// View a task's configuration, cutoffs and completion records.
pub fn cmd_view(db: &Database, id: String, date: Option<String>) -> Result<()> {
    let task_id = resolve_task_identifier(&id, db)?;
    let Some(task) = db.get(task_id) else {
        return Err(Error::TaskNotFound(id));
    };
    let anchor = match date.as_deref() {
        Some(s) => parse_date_arg(s)?,
        None => Local::now().date_naive(),
    };
    let cal = db.calendar();

    println!("ID:              {}", task.id);
    println!("Title:           {}", task.title);
    println!(
        "Description:     {}",
        task.description.as_deref().unwrap_or("-")
    );
    println!("Positions:       {}", task.responsibilities.join(","));
    println!(
        "Categories:      {}",
        if task.categories.is_empty() {
            "-".into()
        } else {
            task.categories.join(",")
        }
    );
    println!("Due time:        {}", task.effective_due_time().format("%H:%M"));
    println!(
        "Due date:        {}",
        task.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
    );
    println!(
        "Custom order:    {}",
        if task.custom_order < CUSTOM_ORDER_UNSET {
            task.custom_order.to_string()
        } else {
            "-".into()
        }
    );
    println!(
        "Visible:         {} .. {}",
        task.visibility_anchor(cal.utc_offset()),
        task.visibility_end()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "open".into())
    );

    println!("Cutoffs for {anchor}:");
    for code in &task.recurrence {
        let cut = cutoff::compute(&cal, anchor, code, task.due_date, task.due_time);
        let lock = cut
            .lock_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".into());
        let carry_end = cut
            .carry_end
            .map(|d| d.to_string())
            .unwrap_or_else(|| "open".into());
        println!(
            "  {:<24} appears {}  due {} {}  locks {}  carries {}..{}",
            code,
            cut.appearance,
            cut.due_date,
            cut.due_time.format("%H:%M"),
            lock,
            cut.carry_start,
            carry_end
        );
        for warning in &cut.warnings {
            println!("    warning: {warning}");
        }
    }

    if task.completions.is_empty() {
        println!("Completions:     -");
    } else {
        println!("Completions:");
        for c in &task.completions {
            let when = c
                .completed_at_utc
                .and_then(|secs| chrono::Utc.timestamp_opt(secs, 0).single())
                .map(|ts| ts.with_timezone(&cal.utc_offset()).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "  {:<18} {} by {}{}",
                c.position,
                when,
                c.completed_by.as_deref().unwrap_or("-"),
                if c.is_completed { "" } else { " (reopened)" }
            );
        }
    }
    Ok(())
}

/// Update fields on a task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    recurrence: Vec<String>,
    positions: Vec<String>,
    categories: Vec<String>,
    due_time: Option<String>,
    due_date: Option<String>,
    publish_after: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    clear_due_date: bool,
    clear_end_date: bool,
) -> Result<()> {
    let task_id = resolve_task_identifier(&id, db)?;
    let recurrence = split_csv(&recurrence);
    let positions = split_csv(&positions);
    let categories = split_csv(&categories);
    let due_time = due_time.as_deref().map(parse_time_arg).transpose()?;
    let due_date = due_date.as_deref().map(parse_date_arg).transpose()?;
    let publish_after = publish_after.as_deref().map(parse_date_arg).transpose()?;
    let start_date = start_date.as_deref().map(parse_date_arg).transpose()?;
    let end_date = end_date.as_deref().map(parse_date_arg).transpose()?;

    for position in &positions {
        if !db.positions.contains(position) {
            db.positions.push(position.clone());
        }
    }

    let Some(task) = db.get_mut(task_id) else {
        return Err(Error::TaskNotFound(id));
    };
    if let Some(t) = title {
        task.title = t;
    }
    if let Some(d) = desc {
        task.description = Some(d);
    }
    if !recurrence.is_empty() {
        task.recurrence = recurrence;
    }
    if !positions.is_empty() {
        task.responsibilities = positions;
    }
    if !categories.is_empty() {
        task.categories = categories;
    }
    if let Some(t) = due_time {
        task.due_time = Some(t);
    }
    if let Some(d) = due_date {
        task.due_date = Some(d);
    }
    if let Some(d) = publish_after {
        task.publish_after = Some(d);
    }
    if let Some(d) = start_date {
        task.start_date = Some(d);
    }
    if let Some(d) = end_date {
        task.end_date = Some(d);
    }
    if clear_due_date {
        task.due_date = None;
    }
    if clear_end_date {
        task.end_date = None;
    }
    task.updated_at_utc = Local::now().timestamp();

    warn_about_codes(&task.recurrence, task.due_date);
    db.save(db_path)?;
    println!("Updated task {task_id}");
    Ok(())
}

/// Set or clear a task's administrator display order.
pub fn cmd_order(
    db: &mut Database,
    db_path: &Path,
    id: String,
    order: Option<u32>,
    clear: bool,
) -> Result<()> {
    let task_id = resolve_task_identifier(&id, db)?;
    let value = match (order, clear) {
        (_, true) => CUSTOM_ORDER_UNSET,
        (Some(n), false) => n.min(CUSTOM_ORDER_UNSET),
        (None, false) => {
            return Err(Error::InvalidArgument(
                "pass an order value or --clear".into(),
            ))
        }
    };
    let Some(task) = db.get_mut(task_id) else {
        return Err(Error::TaskNotFound(id));
    };
    task.custom_order = value;
    task.updated_at_utc = Local::now().timestamp();
    db.save(db_path)?;
    if value == CUSTOM_ORDER_UNSET {
        println!("Cleared custom order on task {task_id}");
    } else {
        println!("Set custom order {value} on task {task_id}");
    }
    Ok(())
}

/// Record a completion for a position; replaces that position's previous
/// record, the engine treats expiry logically.
pub fn cmd_complete(
    db: &mut Database,
    db_path: &Path,
    id: String,
    position: String,
    by: Option<String>,
    at: Option<String>,
) -> Result<()> {
    let task_id = resolve_task_identifier(&id, db)?;
    let moment = match at.as_deref() {
        Some(s) => parse_moment_arg(s)?,
        None => Local::now().naive_local(),
    };
    let offset = db.utc_offset();
    let completed_at_utc = offset
        .from_local_datetime(&moment)
        .single()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| moment.and_utc().timestamp());

    let Some(task) = db.get_mut(task_id) else {
        return Err(Error::TaskNotFound(id));
    };
    if !task.responsibilities.contains(&position) {
        return Err(Error::UnknownPosition {
            task: task_id,
            position,
        });
    }
    task.completions.retain(|c| c.position != position);
    task.completions.push(PositionCompletion {
        position: position.clone(),
        completed_by: by,
        completed_at_utc: Some(completed_at_utc),
        is_completed: true,
    });
    task.updated_at_utc = Local::now().timestamp();
    db.save(db_path)?;
    println!("Marked task {task_id} done for {position}");
    Ok(())
}

/// Remove a position's completion record.
pub fn cmd_reopen(db: &mut Database, db_path: &Path, id: String, position: String) -> Result<()> {
    let task_id = resolve_task_identifier(&id, db)?;
    let Some(task) = db.get_mut(task_id) else {
        return Err(Error::TaskNotFound(id));
    };
    if task.completion_for(&position).is_none() {
        println!("No completion recorded for {position} on task {task_id}");
        return Ok(());
    }
    task.completions.retain(|c| c.position != position);
    task.updated_at_utc = Local::now().timestamp();
    db.save(db_path)?;
    println!("Reopened task {task_id} for {position}");
    Ok(())
}

/// Manage the per-year holiday sets.
pub fn cmd_holiday(db: &mut Database, db_path: &Path, action: HolidayAction) -> Result<()> {
    match action {
        HolidayAction::Add { date } => {
            let date = parse_date_arg(&date)?;
            let year = chrono::Datelike::year(&date);
            let dates = db.holidays.entry(year).or_default();
            if !dates.contains(&date) {
                dates.push(date);
                dates.sort_unstable();
            }
            db.save(db_path)?;
            println!("Added holiday {date}");
        }
        HolidayAction::Remove { date } => {
            let date = parse_date_arg(&date)?;
            let year = chrono::Datelike::year(&date);
            if let Some(dates) = db.holidays.get_mut(&year) {
                dates.retain(|d| *d != date);
            }
            db.save(db_path)?;
            println!("Removed holiday {date}");
        }
        HolidayAction::List { year } => {
            for (y, dates) in &db.holidays {
                if year.is_some() && year != Some(*y) {
                    continue;
                }
                println!("{y}:");
                for date in dates {
                    println!("  {} ({})", date, date.format("%A"));
                }
            }
        }
    }
    Ok(())
}

/// Show or replace the position display order.
pub fn cmd_positions(db: &mut Database, db_path: &Path, set: Option<String>) -> Result<()> {
    if let Some(order) = set {
        db.positions = split_csv(&[order]);
        db.save(db_path)?;
        println!("Position order updated");
    }
    for (i, position) in db.positions.iter().enumerate() {
        println!("{:<3} {}", i + 1, position);
    }
    Ok(())
}

/// Generate shell completion scripts to stdout.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

/// Surface configuration problems at entry time; the engine degrades
/// silently, the operator should not.
fn warn_about_codes(recurrence: &[String], due_date: Option<NaiveDate>) {
    for code in recurrence {
        let parsed = Recurrence::parse(code);
        if parsed.is_none() {
            eprintln!("Warning: unrecognized recurrence code '{code}' will use the single-day fallback");
        }
        if matches!(
            parsed,
            Some(Recurrence::OnceOff) | Some(Recurrence::OnceOffSticky)
        ) && due_date.is_none()
        {
            eprintln!("Warning: once-off task without --due-date falls back to its instance date");
        }
    }
    if recurrence.is_empty() {
        eprintln!("Warning: task has no recurrence codes and will always resolve as due today");
    }
}

/// Cutoff with the earliest due moment across the task's codes; drives the
/// "due Thu, 4 Oct" hint in the table.
fn earliest_cutoff(
    task: &TaskDefinition,
    cal: &crate::calendar::Calendar,
    viewing: NaiveDate,
) -> Option<FrequencyCutoff> {
    task.recurrence
        .iter()
        .map(|code| cutoff::compute(cal, viewing, code, task.due_date, task.due_time))
        .min_by_key(|cut| cut.due_moment())
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
