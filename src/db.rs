//! JSON file store for the checklist.
//!
//! The store keeps the task definitions (with their embedded completion
//! records), the position display order, the per-year holiday sets and the
//! optional fixed civil timezone. Everything the engine consumes is built
//! from a loaded `Database`; the engine itself never touches the file
//! system.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::error::{Error, Result};
use crate::task::TaskDefinition;

/// In-memory store for task definitions and calendar data.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<TaskDefinition>,
    /// Display order of positions; earlier entries sort first.
    #[serde(default)]
    pub positions: Vec<String>,
    /// Public holidays keyed by year. A year with an empty list counts as
    /// loaded and holiday-free.
    #[serde(default)]
    pub holidays: BTreeMap<i32, Vec<NaiveDate>>,
    /// Civil timezone as minutes east of UTC; the host's local offset
    /// applies when absent.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl Database {
    /// Load the store from a JSON file, starting fresh if the file doesn't
    /// exist or fails to parse.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing store, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading store, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save the store using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut TaskDefinition> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// The fixed civil offset for completion timestamps.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .unwrap_or_else(|| Local::now().offset().fix())
    }

    /// Build the calendar the engine consumes, loading every stored year.
    pub fn calendar(&self) -> Calendar {
        let mut cal = Calendar::new(self.utc_offset());
        for (year, dates) in &self.holidays {
            cal.load_year(*year, dates.iter().copied());
        }
        cal
    }
}

/// Resolve a task identifier (numeric ID or exact title) to a task ID.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64> {
    if let Ok(id) = identifier.parse::<u64>() {
        return if db.get(id).is_some() {
            Ok(id)
        } else {
            Err(Error::TaskNotFound(identifier.to_string()))
        };
    }

    let matches: Vec<&TaskDefinition> = db
        .tasks
        .iter()
        .filter(|t| t.title.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(Error::TaskNotFound(identifier.to_string())),
        1 => Ok(matches[0].id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|t| t.id.to_string()).collect();
            Err(Error::AmbiguousTask(format!(
                "Multiple tasks titled '{}' (ids {}); use the numeric id",
                identifier,
                ids.join(", ")
            )))
        }
    }
}

/// Parse a YYYY-MM-DD date argument.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Parse an HH:MM time argument.
pub fn parse_time_arg(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| Error::InvalidTime(s.to_string()))
}

/// Parse a "YYYY-MM-DD HH:MM" moment argument.
pub fn parse_moment_arg(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M")
        .map_err(|_| Error::InvalidMoment(s.to_string()))
}

/// Split comma-separated values and drop empties, preserving order.
pub fn split_csv(inputs: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let value = part.trim().to_string();
            if !value.is_empty() && !out.contains(&value) {
                out.push(value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::CUSTOM_ORDER_UNSET;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn stored_task(id: u64, title: &str) -> TaskDefinition {
        TaskDefinition {
            id,
            title: title.into(),
            description: None,
            responsibilities: vec!["dispensary".into()],
            categories: vec![],
            recurrence: vec!["every_day".into()],
            due_time: None,
            due_date: None,
            custom_order: CUSTOM_ORDER_UNSET,
            publish_after: None,
            start_date: None,
            end_date: None,
            created_at_utc: 0,
            updated_at_utc: 0,
            completions: vec![],
        }
    }

    #[test]
    fn test_resolve_task_identifier() {
        let db = Database {
            tasks: vec![stored_task(1, "Fridge log"), stored_task(2, "Fridge log")],
            ..Database::default()
        };
        assert_eq!(resolve_task_identifier("1", &db).unwrap(), 1);
        assert!(matches!(
            resolve_task_identifier("9", &db),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            resolve_task_identifier("fridge log", &db),
            Err(Error::AmbiguousTask(_))
        ));
        let db = Database {
            tasks: vec![stored_task(1, "Fridge log")],
            ..Database::default()
        };
        assert_eq!(resolve_task_identifier("Fridge Log", &db).unwrap(), 1);
    }

    #[test]
    fn test_next_id() {
        let mut db = Database::default();
        assert_eq!(db.next_id(), 1);
        db.tasks.push(stored_task(4, "a"));
        assert_eq!(db.next_id(), 5);
    }

    #[test]
    fn test_calendar_includes_stored_years_and_offset() {
        let mut db = Database::default();
        db.utc_offset_minutes = Some(120);
        db.holidays.insert(2024, vec![d(2024, 1, 1)]);
        db.holidays.insert(2025, vec![]);
        let cal = db.calendar();
        assert!(cal.is_loaded(2024));
        assert!(cal.is_loaded(2025));
        assert!(!cal.is_loaded(2023));
        assert!(cal.is_holiday(d(2024, 1, 1)));
        assert_eq!(cal.utc_offset(), FixedOffset::east_opt(7200).unwrap());
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_date_arg("2024-06-05").unwrap(), d(2024, 6, 5));
        assert!(parse_date_arg("05/06/2024").is_err());
        assert_eq!(
            parse_time_arg("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_time_arg("9.30").is_err());
        assert_eq!(
            parse_moment_arg("2024-06-05 09:30").unwrap(),
            d(2024, 6, 5).and_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_moment_arg("2024-06-05T09:30").is_err());
    }

    #[test]
    fn test_split_csv_dedupes_and_trims() {
        let input = vec!["dispensary, front_shop".to_string(), "dispensary".to_string()];
        assert_eq!(split_csv(&input), vec!["dispensary", "front_shop"]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join("rxc_db_round_trip.json");
        let mut db = Database::default();
        let mut task = stored_task(1, "Fridge log");
        // Unknown codes must survive the trip untouched.
        task.recurrence.push("fortnightly".into());
        db.tasks.push(task);
        db.positions.push("dispensary".into());
        db.holidays.insert(2024, vec![d(2024, 1, 1)]);
        db.save(&path).unwrap();

        let loaded = Database::load(&path);
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].recurrence, vec!["every_day", "fortnightly"]);
        assert_eq!(loaded.positions, vec!["dispensary"]);
        assert_eq!(loaded.holidays.get(&2024), Some(&vec![d(2024, 1, 1)]));
        let _ = fs::remove_file(&path);
    }
}
