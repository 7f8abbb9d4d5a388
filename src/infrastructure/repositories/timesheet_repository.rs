//! Timesheet Repository Implementation
//!
//! PostgreSQL implementation of the TimesheetRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use crate::domain::{EntryFilter, TimesheetEntry, TimesheetRepository, WorkflowStatus};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct TimesheetRow {
    id: i64,
    tenant_id: i64,
    user_id: i64,
    work_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    break_minutes: i32,
    project: Option<String>,
    client_name: String,
    description: Option<String>,
    hourly_rate_cents: i64,
    billable: bool,
    status: String,
    approved_by: Option<i64>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TimesheetRow {
    fn into_entry(self) -> Result<TimesheetEntry, AppError> {
        let status = WorkflowStatus::parse(&self.status)
            .map_err(|e| AppError::Internal(format!("timesheet {}: {}", self.id, e)))?;
        Ok(TimesheetEntry {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            work_date: self.work_date,
            start_time: self.start_time,
            end_time: self.end_time,
            break_minutes: self.break_minutes,
            project: self.project,
            client_name: self.client_name,
            description: self.description,
            hourly_rate_cents: self.hourly_rate_cents,
            billable: self.billable,
            status,
            approved_by: self.approved_by,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const TIMESHEET_COLUMNS: &str = "id, tenant_id, user_id, work_date, start_time, end_time, \
     break_minutes, project, client_name, description, hourly_rate_cents, billable, status, \
     approved_by, rejection_reason, created_at, updated_at";

/// PostgreSQL timesheet repository.
#[derive(Clone)]
pub struct PgTimesheetRepository {
    pool: PgPool,
}

impl PgTimesheetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TimesheetRepository for PgTimesheetRepository {
    async fn find_by_id(
        &self,
        tenant_id: i64,
        id: i64,
    ) -> Result<Option<TimesheetEntry>, AppError> {
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            "SELECT {TIMESHEET_COLUMNS} FROM timesheet_entries WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TimesheetRow::into_entry).transpose()
    }

    async fn list(
        &self,
        tenant_id: i64,
        filter: EntryFilter,
    ) -> Result<Vec<TimesheetEntry>, AppError> {
        let rows = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            SELECT {TIMESHEET_COLUMNS}
            FROM timesheet_entries
            WHERE tenant_id = $1
              AND ($2::BIGINT IS NULL OR user_id = $2)
              AND ($3::VARCHAR IS NULL OR status = $3)
              AND ($4::DATE IS NULL OR work_date >= $4)
              AND ($5::DATE IS NULL OR work_date <= $5)
            ORDER BY work_date DESC, start_time DESC
            LIMIT $6
            "#
        ))
        .bind(tenant_id)
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TimesheetRow::into_entry).collect()
    }

    async fn find_for_user_on(
        &self,
        tenant_id: i64,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, AppError> {
        let rows = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            SELECT {TIMESHEET_COLUMNS}
            FROM timesheet_entries
            WHERE tenant_id = $1 AND user_id = $2 AND work_date = $3
            ORDER BY start_time
            "#
        ))
        .bind(tenant_id)
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TimesheetRow::into_entry).collect()
    }

    async fn create(&self, entry: &TimesheetEntry) -> Result<TimesheetEntry, AppError> {
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            INSERT INTO timesheet_entries (
                id, tenant_id, user_id, work_date, start_time, end_time, break_minutes,
                project, client_name, description, hourly_rate_cents, billable, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(entry.id)
        .bind(entry.tenant_id)
        .bind(entry.user_id)
        .bind(entry.work_date)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.break_minutes)
        .bind(&entry.project)
        .bind(&entry.client_name)
        .bind(&entry.description)
        .bind(entry.hourly_rate_cents)
        .bind(entry.billable)
        .bind(entry.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.into_entry()
    }

    async fn update(&self, entry: &TimesheetEntry) -> Result<TimesheetEntry, AppError> {
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            UPDATE timesheet_entries
            SET work_date = $3,
                start_time = $4,
                end_time = $5,
                break_minutes = $6,
                project = $7,
                client_name = $8,
                description = $9,
                billable = $10,
                status = $11,
                approved_by = $12,
                rejection_reason = $13,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(entry.tenant_id)
        .bind(entry.id)
        .bind(entry.work_date)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.break_minutes)
        .bind(&entry.project)
        .bind(&entry.client_name)
        .bind(&entry.description)
        .bind(entry.billable)
        .bind(entry.status.as_str())
        .bind(entry.approved_by)
        .bind(&entry.rejection_reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Timesheet entry {} not found", entry.id)))?;

        row.into_entry()
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM timesheet_entries WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Timesheet entry {} not found", id)));
        }

        Ok(())
    }
}
