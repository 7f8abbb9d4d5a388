//! Shift hour arithmetic and weekly overtime split.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use crate::domain::entities::TimesheetEntry;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Shift arithmetic failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShiftError {
    #[error("break_minutes cannot be negative")]
    NegativeBreak,

    #[error("break of {break_minutes} minutes is not shorter than the {shift_minutes} minute shift")]
    BreakTooLong {
        break_minutes: i64,
        shift_minutes: i64,
    },

    #[error("shift cannot exceed 24 hours")]
    TooLong,
}

/// Start and end of a shift in minutes since midnight of its work date.
///
/// `end <= start` means the shift crosses midnight, so the end lands on the
/// following day.
pub fn shift_interval(start: NaiveTime, end: NaiveTime) -> (i64, i64) {
    let start_min = minutes_of(start);
    let mut end_min = minutes_of(end);
    if end_min <= start_min {
        end_min += MINUTES_PER_DAY;
    }
    (start_min, end_min)
}

/// Hours worked, rounded to hundredths.
pub fn worked_hours(start: NaiveTime, end: NaiveTime, break_minutes: i32) -> Result<f64, ShiftError> {
    let (start_min, end_min) = shift_interval(start, end);
    let shift_minutes = end_min - start_min;
    if shift_minutes > MINUTES_PER_DAY {
        return Err(ShiftError::TooLong);
    }

    let break_minutes = i64::from(break_minutes);
    if break_minutes < 0 {
        return Err(ShiftError::NegativeBreak);
    }
    if break_minutes >= shift_minutes {
        return Err(ShiftError::BreakTooLong {
            break_minutes,
            shift_minutes,
        });
    }

    Ok(round_hundredths((shift_minutes - break_minutes) as f64 / 60.0))
}

fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weekly totals for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub total_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub billable_hours: f64,
    pub billable_amount_cents: i64,
    pub entry_count: usize,
}

/// Sum a week of entries, splitting hours beyond `overtime_threshold`.
///
/// Entries whose times cannot be computed are skipped; they were rejected at
/// write time.
pub fn weekly_summary(entries: &[TimesheetEntry], overtime_threshold: f64) -> WeeklySummary {
    let mut total = 0.0;
    let mut billable = 0.0;
    let mut amount_cents = 0i64;
    let mut count = 0;

    for entry in entries {
        let Ok(hours) = entry.hours() else {
            continue;
        };
        count += 1;
        total += hours;
        if entry.billable {
            billable += hours;
            amount_cents += labour_cents(hours, entry.hourly_rate_cents);
        }
    }

    let regular = total.min(overtime_threshold);
    let overtime = (total - overtime_threshold).max(0.0);

    WeeklySummary {
        total_hours: round_hundredths(total),
        regular_hours: round_hundredths(regular),
        overtime_hours: round_hundredths(overtime),
        billable_hours: round_hundredths(billable),
        billable_amount_cents: amount_cents,
        entry_count: count,
    }
}

/// Hours × hourly rate in cents, rounded half-up.
pub fn labour_cents(hours: f64, hourly_rate_cents: i64) -> i64 {
    // hours carry two decimals, so work in hundredths to stay exact
    let hundredths = (hours * 100.0).round() as i64;
    (hundredths * hourly_rate_cents + 50) / 100
}
