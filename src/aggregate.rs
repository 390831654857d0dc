//! Cross-position reconciliation of completions.
//!
//! A task shared by several positions is completed independently by each.
//! The effective status depends on who is looking: a single position only
//! sees its own completion, while the unfiltered admin view treats the task
//! as completed when any position's completion is still inside its carry
//! window.

use chrono::NaiveDateTime;

use crate::calendar::Calendar;
use crate::fields::Status;
use crate::resolver;
use crate::task::{TaskDefinition, TaskInstance};

/// Which completions the viewer's context is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode<'a> {
    /// A single role, or an admin filtered to one responsibility.
    Position(&'a str),
    /// Admin view across every responsibility.
    AllPositions,
}

/// Effective status of `instance` for the given viewer context.
pub fn effective_status(
    task: &TaskDefinition,
    instance: &TaskInstance,
    cal: &Calendar,
    as_of: NaiveDateTime,
    mode: ViewMode,
) -> Status {
    match mode {
        ViewMode::Position(position) => {
            let completion = instance
                .completions
                .iter()
                .find(|c| c.position == position && c.is_completed);
            resolver::resolve(task, cal, as_of, instance.instance_date, completion)
        }
        ViewMode::AllPositions => {
            for completion in instance.completions.iter().filter(|c| c.is_completed) {
                let status =
                    resolver::resolve(task, cal, as_of, instance.instance_date, Some(completion));
                if status == Status::Completed {
                    return Status::Completed;
                }
            }
            // No completion is still inside its carry window; one stale
            // completion among several never forces `Completed`.
            resolver::resolve(task, cal, as_of, instance.instance_date, None)
        }
    }
}

/// Positions whose completion still displays as completed on the instance
/// date, in stored order. Feeds the "done by" column of the admin view.
pub fn completed_positions<'a>(
    task: &TaskDefinition,
    instance: &'a TaskInstance,
    cal: &Calendar,
    as_of: NaiveDateTime,
) -> Vec<&'a str> {
    instance
        .completions
        .iter()
        .filter(|c| c.is_completed)
        .filter(|c| {
            resolver::resolve(task, cal, as_of, instance.instance_date, Some(*c))
                == Status::Completed
        })
        .map(|c| c.position.as_str())
        .collect()
}
