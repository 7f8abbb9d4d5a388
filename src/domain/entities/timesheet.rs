//! Timesheet entry entity and repository trait.
//!
//! Maps to the `timesheet_entries` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::services::timesheet_calculator::{self, ShiftError};
use crate::domain::value_objects::WorkflowStatus;
use crate::shared::error::AppError;

/// One shift worked by a user.
///
/// Maps to the `timesheet_entries` table:
/// - work_date: DATE NOT NULL
/// - start_time / end_time: TIME NOT NULL (end <= start means overnight)
/// - break_minutes: INTEGER NOT NULL DEFAULT 0
/// - hourly_rate_cents: BIGINT NOT NULL
/// - billable: BOOLEAN NOT NULL DEFAULT TRUE
/// - status: VARCHAR(20) NOT NULL DEFAULT 'draft'
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub id: i64,
    pub tenant_id: i64,
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_minutes: i32,
    pub project: Option<String>,
    pub client_name: String,
    pub description: Option<String>,
    pub hourly_rate_cents: i64,
    pub billable: bool,
    pub status: WorkflowStatus,
    pub approved_by: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimesheetEntry {
    /// Worked hours, rounded to hundredths.
    pub fn hours(&self) -> Result<f64, ShiftError> {
        timesheet_calculator::worked_hours(self.start_time, self.end_time, self.break_minutes)
    }

    /// Shift interval in minutes since midnight of `work_date`, end exclusive.
    pub fn interval_minutes(&self) -> (i64, i64) {
        timesheet_calculator::shift_interval(self.start_time, self.end_time)
    }

    /// Whether two shifts of the same day overlap.
    pub fn overlaps(&self, other: &TimesheetEntry) -> bool {
        if self.work_date != other.work_date || self.user_id != other.user_id {
            return false;
        }
        let (a_start, a_end) = self.interval_minutes();
        let (b_start, b_end) = other.interval_minutes();
        a_start < b_end && b_start < a_end
    }
}

/// Listing filter shared by timesheets and expenses.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub user_id: Option<i64>,
    pub status: Option<WorkflowStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
}

/// Repository trait for timesheet entries. Every call is tenant-scoped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimesheetRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: i64, id: i64)
        -> Result<Option<TimesheetEntry>, AppError>;

    /// Ordered by work date, newest first.
    async fn list(&self, tenant_id: i64, filter: EntryFilter)
        -> Result<Vec<TimesheetEntry>, AppError>;

    /// Entries of a user on one date (overlap detection).
    async fn find_for_user_on(
        &self,
        tenant_id: i64,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, AppError>;

    async fn create(&self, entry: &TimesheetEntry) -> Result<TimesheetEntry, AppError>;

    async fn update(&self, entry: &TimesheetEntry) -> Result<TimesheetEntry, AppError>;

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<(), AppError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn entry(id: i64, user_id: i64, start: (u32, u32), end: (u32, u32)) -> TimesheetEntry {
        let now = Utc::now();
        TimesheetEntry {
            id,
            tenant_id: 1,
            user_id,
            work_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            break_minutes: 0,
            project: None,
            client_name: "Client A".into(),
            description: None,
            hourly_rate_cents: 5000,
            billable: true,
            status: WorkflowStatus::Draft,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}
