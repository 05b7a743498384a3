//! Completion percentage and streak math for the time-tracked block kinds.
//!
//! Everything here is pure and callable for any date, so calendar views
//! can render history without touching the interaction layer. Missing
//! dates and items always read as "not completed", which also guarantees
//! the backward streak walk terminates on sparse or absent history.

use crate::blocks::{Block, BlockPayload, DayEntry, HistoryMap};
use chrono::NaiveDate;

/// Format a date as the `YYYY-MM-DD` history key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn flag_completed(history: &HistoryMap, date: NaiveDate, item_id: &str) -> bool {
    history
        .get(&date_key(date))
        .and_then(|day| day.get(item_id))
        .map(|entry| entry.completed() > 0)
        .unwrap_or(false)
}

fn reps_completed(history: &HistoryMap, date: NaiveDate, item_id: &str) -> usize {
    history
        .get(&date_key(date))
        .and_then(|day| day.get(item_id))
        .map(DayEntry::completed)
        .unwrap_or(0)
}

/// Completion percentage in `[0, 100]` for a block on a date.
///
/// Per-kind rules:
/// - gratitude: completed items / total items
/// - habit tracker: habits marked true / total habits
/// - affirmations: total truthy repetitions / total target counts
///
/// Blocks with zero trackable items, and non-tracked kinds, report 0.
pub fn completion_percent(block: &Block, date: NaiveDate) -> f64 {
    let percent = match &block.payload {
        BlockPayload::Gratitude(g) => {
            if g.items.is_empty() {
                return 0.0;
            }
            let done = g
                .items
                .iter()
                .filter(|item| flag_completed(&g.history, date, &item.id))
                .count();
            done as f64 / g.items.len() as f64 * 100.0
        }
        BlockPayload::HabitTracker(h) => {
            if h.habits.is_empty() {
                return 0.0;
            }
            let done = h
                .habits
                .iter()
                .filter(|habit| flag_completed(&h.history, date, &habit.id))
                .count();
            done as f64 / h.habits.len() as f64 * 100.0
        }
        BlockPayload::Affirmations(a) => {
            let target: u32 = a.affirmations.iter().map(|aff| aff.target_count).sum();
            if target == 0 {
                return 0.0;
            }
            let done: usize = a
                .affirmations
                .iter()
                .map(|aff| {
                    // Extra recorded reps never count past the target.
                    reps_completed(&a.history, date, &aff.id).min(aff.target_count as usize)
                })
                .sum();
            done as f64 / target as f64 * 100.0
        }
        _ => return 0.0,
    };
    percent.clamp(0.0, 100.0)
}

/// Whether a date counts toward a streak: completion of exactly 100%.
pub fn day_qualifies(block: &Block, date: NaiveDate) -> bool {
    completion_percent(block, date) >= 100.0 - 1e-9
}

/// Current streak: consecutive qualifying days walking backward from the
/// day before `today`.
///
/// Today is still in progress, so it neither extends nor breaks the run;
/// this subsumes the "today is not over yet" grace rule. Any other
/// non-qualifying (or absent) day stops the walk.
pub fn streak(block: &Block, today: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = today;
    while let Some(prev) = day.pred_opt() {
        if !day_qualifies(block, prev) {
            break;
        }
        count += 1;
        day = prev;
    }
    count
}
