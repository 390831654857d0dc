//! Deterministic display ordering for checklist rows.
//!
//! Administrator-assigned order wins outright; everything else falls back
//! through due time, the fixed frequency rank, the display priority of the
//! first responsibility, and finally the description text.

use std::cmp::Ordering;

use chrono::Timelike;

use crate::fields::Recurrence;
use crate::task::{TaskDefinition, CUSTOM_ORDER_UNSET};

/// Rank given to a task none of whose codes parse.
const NO_RANK: u8 = u8::MAX;

/// Compare two tasks for display. Total and stable: ties fall through to
/// the task id so equal configurations keep their insertion order.
pub fn compare(a: &TaskDefinition, b: &TaskDefinition, position_order: &[String]) -> Ordering {
    custom_order_key(a)
        .cmp(&custom_order_key(b))
        .then_with(|| due_minutes(a).cmp(&due_minutes(b)))
        .then_with(|| best_rank(a).cmp(&best_rank(b)))
        .then_with(|| {
            position_priority(a, position_order).cmp(&position_priority(b, position_order))
        })
        .then_with(|| description_key(a).cmp(&description_key(b)))
        .then_with(|| a.id.cmp(&b.id))
}

/// An assigned order always sorts before an unassigned one.
fn custom_order_key(t: &TaskDefinition) -> (u8, u32) {
    if t.custom_order < CUSTOM_ORDER_UNSET {
        (0, t.custom_order)
    } else {
        (1, 0)
    }
}

fn due_minutes(t: &TaskDefinition) -> u32 {
    let time = t.effective_due_time();
    time.hour() * 60 + time.minute()
}

/// Best (lowest) frequency rank across the task's codes.
fn best_rank(t: &TaskDefinition) -> u8 {
    t.recurrence
        .iter()
        .filter_map(|code| Recurrence::parse(code))
        .map(Recurrence::rank)
        .min()
        .unwrap_or(NO_RANK)
}

/// Display priority of the first listed responsibility, per the external
/// position ordering; unknown positions sort last.
fn position_priority(t: &TaskDefinition, position_order: &[String]) -> usize {
    t.responsibilities
        .first()
        .and_then(|p| position_order.iter().position(|o| o == p))
        .unwrap_or(usize::MAX)
}

fn description_key(t: &TaskDefinition) -> String {
    t.description.as_deref().unwrap_or("").to_lowercase()
}
