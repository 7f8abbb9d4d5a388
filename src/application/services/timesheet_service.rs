//! Timesheet Service
//!
//! Time entries, their approval workflow and weekly overtime summaries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde_json::json;
use tracing::info;

use super::access_control::AccessControl;
use super::actor::Actor;
use super::audit_service::{clamp_limit, AuditService};
use crate::application::dto::request::{EntryListQuery, TimesheetRequest};
use crate::domain::services::timesheet_calculator::{self, ShiftError, WeeklySummary};
use crate::domain::services::PermissionService;
use crate::domain::value_objects::InvalidTransition;
use crate::domain::{
    AuditRepository, EntryFilter, Permissions, RoleRepository, TimesheetEntry, TimesheetRepository,
    UserRepository, WorkflowStatus,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::sanitize::{sanitize_opt, sanitize_text};
use crate::shared::snowflake::SnowflakeGenerator;

/// Maximum page size of an entry listing
pub const MAX_ENTRY_LIMIT: i64 = 100;

/// Upper bound on entries read for one week
const WEEK_ENTRY_LIMIT: i64 = 500;

/// Weekly summary of one user
#[derive(Debug, Clone)]
pub struct WeekReport {
    pub user_id: i64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub summary: WeeklySummary,
}

/// Timesheet service trait
#[async_trait]
pub trait TimesheetService: Send + Sync {
    async fn create_entry(
        &self,
        actor: &Actor,
        request: TimesheetRequest,
    ) -> Result<TimesheetEntry, TimesheetError>;

    async fn get_entry(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError>;

    async fn list_entries(
        &self,
        actor: &Actor,
        query: EntryListQuery,
    ) -> Result<Vec<TimesheetEntry>, TimesheetError>;

    async fn update_entry(
        &self,
        actor: &Actor,
        entry_id: i64,
        request: TimesheetRequest,
    ) -> Result<TimesheetEntry, TimesheetError>;

    async fn delete_entry(&self, actor: &Actor, entry_id: i64) -> Result<(), TimesheetError>;

    async fn submit_entry(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError>;

    async fn approve_entry(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError>;

    async fn reject_entry(
        &self,
        actor: &Actor,
        entry_id: i64,
        reason: &str,
    ) -> Result<TimesheetEntry, TimesheetError>;

    /// Totals of the ISO week containing `week_of` (defaults to the caller)
    async fn weekly_summary(
        &self,
        actor: &Actor,
        user_id: Option<i64>,
        week_of: NaiveDate,
    ) -> Result<WeekReport, TimesheetError>;
}

/// Timesheet service errors
#[derive(Debug, thiserror::Error)]
pub enum TimesheetError {
    #[error("Timesheet entry not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    InvalidShift(#[from] ShiftError),

    #[error("Entry overlaps entry {0} on the same day")]
    Overlap(i64),

    #[error("Entry is {0} and can no longer be changed")]
    NotEditable(WorkflowStatus),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("A rejection reason is required")]
    ReasonRequired,

    #[error("An entry cannot be approved by its owner")]
    SelfApproval,

    #[error("Only the owner can submit an entry")]
    NotOwner,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<TimesheetError> for AppError {
    fn from(e: TimesheetError) -> Self {
        match e {
            TimesheetError::NotFound => AppError::NotFound("Timesheet entry not found".into()),
            TimesheetError::UserNotFound => AppError::NotFound("User not found".into()),
            e @ (TimesheetError::Overlap(_)
            | TimesheetError::NotEditable(_)
            | TimesheetError::InvalidTransition(_)) => AppError::Conflict(e.to_string()),
            e @ (TimesheetError::InvalidShift(_)
            | TimesheetError::ReasonRequired
            | TimesheetError::InvalidFilter(_)) => AppError::validation(e.to_string()),
            e @ (TimesheetError::SelfApproval | TimesheetError::NotOwner) => {
                AppError::Forbidden(e.to_string())
            }
            TimesheetError::Store(e) => e,
        }
    }
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// TimesheetService implementation
pub struct TimesheetServiceImpl<T, U, R, A>
where
    T: TimesheetRepository,
    U: UserRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    timesheet_repo: Arc<T>,
    user_repo: Arc<U>,
    access: Arc<AccessControl<R>>,
    audit: AuditService<A>,
    id_generator: Arc<SnowflakeGenerator>,
    overtime_threshold_hours: f64,
}

impl<T, U, R, A> TimesheetServiceImpl<T, U, R, A>
where
    T: TimesheetRepository,
    U: UserRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    pub fn new(
        timesheet_repo: Arc<T>,
        user_repo: Arc<U>,
        access: Arc<AccessControl<R>>,
        audit: AuditService<A>,
        id_generator: Arc<SnowflakeGenerator>,
        overtime_threshold_hours: f64,
    ) -> Self {
        Self {
            timesheet_repo,
            user_repo,
            access,
            audit,
            id_generator,
            overtime_threshold_hours,
        }
    }

    async fn load(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError> {
        self.timesheet_repo
            .find_by_id(actor.tenant_id, entry_id)
            .await?
            .ok_or(TimesheetError::NotFound)
    }

    fn apply_request(entry: &mut TimesheetEntry, request: TimesheetRequest) -> Result<(), TimesheetError> {
        timesheet_calculator::worked_hours(request.start_time, request.end_time, request.break_minutes)?;

        entry.work_date = request.work_date;
        entry.start_time = request.start_time;
        entry.end_time = request.end_time;
        entry.break_minutes = request.break_minutes;
        entry.project = sanitize_opt(request.project);
        entry.client_name = sanitize_text(&request.client_name);
        entry.description = sanitize_opt(request.description);
        entry.billable = request.billable.unwrap_or(true);
        Ok(())
    }

    /// Reject the entry if it overlaps another entry of the same user and day
    async fn ensure_no_overlap(&self, entry: &TimesheetEntry) -> Result<(), TimesheetError> {
        let same_day = self
            .timesheet_repo
            .find_for_user_on(entry.tenant_id, entry.user_id, entry.work_date)
            .await?;

        match same_day
            .iter()
            .find(|other| other.id != entry.id && entry.overlaps(other))
        {
            Some(other) => Err(TimesheetError::Overlap(other.id)),
            None => Ok(()),
        }
    }

    async fn transition(
        &self,
        actor: &Actor,
        mut entry: TimesheetEntry,
        to: WorkflowStatus,
        action: &str,
    ) -> Result<TimesheetEntry, TimesheetError> {
        let from = entry.status;
        entry.status = from.transition(to)?;
        entry.updated_at = Utc::now();

        let saved = self.timesheet_repo.update(&entry).await?;
        metrics::record_transition("timesheet", to.as_str());
        self.audit
            .record(
                actor,
                action,
                "timesheet",
                Some(saved.id),
                json!({ "from": from, "to": to }),
            )
            .await;
        Ok(saved)
    }

    async fn review(
        &self,
        actor: &Actor,
        entry_id: i64,
    ) -> Result<TimesheetEntry, TimesheetError> {
        let entry = self.load(actor, entry_id).await?;
        let effective = self
            .access
            .authorize(actor, Permissions::APPROVE_TIMESHEETS, actor.tenant_scope())
            .await?;
        if entry.user_id == actor.user_id && !Permissions::from_bits(effective).is_admin() {
            return Err(TimesheetError::SelfApproval);
        }
        Ok(entry)
    }
}

#[async_trait]
impl<T, U, R, A> TimesheetService for TimesheetServiceImpl<T, U, R, A>
where
    T: TimesheetRepository + 'static,
    U: UserRepository + 'static,
    R: RoleRepository + 'static,
    A: AuditRepository + 'static,
{
    async fn create_entry(
        &self,
        actor: &Actor,
        request: TimesheetRequest,
    ) -> Result<TimesheetEntry, TimesheetError> {
        self.access
            .authorize(actor, Permissions::EDIT_TIMESHEETS, actor.tenant_scope())
            .await?;

        let user = self
            .user_repo
            .find_by_id(actor.tenant_id, actor.user_id)
            .await?
            .ok_or(TimesheetError::UserNotFound)?;

        let now = Utc::now();
        let mut entry = TimesheetEntry {
            id: self.id_generator.generate(),
            tenant_id: actor.tenant_id,
            user_id: actor.user_id,
            work_date: request.work_date,
            start_time: request.start_time,
            end_time: request.end_time,
            break_minutes: 0,
            project: None,
            client_name: String::new(),
            description: None,
            hourly_rate_cents: user.hourly_rate_cents,
            billable: true,
            status: WorkflowStatus::Draft,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        Self::apply_request(&mut entry, request)?;
        self.ensure_no_overlap(&entry).await?;

        let saved = self.timesheet_repo.create(&entry).await?;
        self.audit
            .record(
                actor,
                "timesheet.create",
                "timesheet",
                Some(saved.id),
                json!({ "work_date": saved.work_date, "client": saved.client_name }),
            )
            .await;
        info!(tenant_id = actor.tenant_id, user_id = actor.user_id, entry_id = saved.id, "Timesheet entry created");
        Ok(saved)
    }

    async fn get_entry(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError> {
        let entry = self.load(actor, entry_id).await?;
        self.access
            .authorize(actor, Permissions::VIEW_TIMESHEETS, actor.record_scope(entry.user_id))
            .await?;
        Ok(entry)
    }

    async fn list_entries(
        &self,
        actor: &Actor,
        query: EntryListQuery,
    ) -> Result<Vec<TimesheetEntry>, TimesheetError> {
        let effective = self
            .access
            .authorize(actor, Permissions::VIEW_TIMESHEETS, actor.tenant_scope())
            .await?;

        let filter = entry_filter(actor, effective, query, MAX_ENTRY_LIMIT)
            .map_err(TimesheetError::InvalidFilter)?;
        Ok(self.timesheet_repo.list(actor.tenant_id, filter).await?)
    }

    async fn update_entry(
        &self,
        actor: &Actor,
        entry_id: i64,
        request: TimesheetRequest,
    ) -> Result<TimesheetEntry, TimesheetError> {
        let mut entry = self.load(actor, entry_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_TIMESHEETS, actor.record_scope(entry.user_id))
            .await?;

        if !entry.status.is_editable() {
            return Err(TimesheetError::NotEditable(entry.status));
        }
        if entry.status == WorkflowStatus::Rejected {
            entry.status = entry.status.transition(WorkflowStatus::Draft)?;
            entry.rejection_reason = None;
        }

        Self::apply_request(&mut entry, request)?;
        self.ensure_no_overlap(&entry).await?;
        entry.updated_at = Utc::now();

        let saved = self.timesheet_repo.update(&entry).await?;
        self.audit
            .record(actor, "timesheet.update", "timesheet", Some(saved.id), json!({}))
            .await;
        Ok(saved)
    }

    async fn delete_entry(&self, actor: &Actor, entry_id: i64) -> Result<(), TimesheetError> {
        let entry = self.load(actor, entry_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_TIMESHEETS, actor.record_scope(entry.user_id))
            .await?;

        if !entry.status.is_editable() {
            return Err(TimesheetError::NotEditable(entry.status));
        }

        self.timesheet_repo.delete(actor.tenant_id, entry.id).await?;
        self.audit
            .record(
                actor,
                "timesheet.delete",
                "timesheet",
                Some(entry.id),
                json!({ "work_date": entry.work_date }),
            )
            .await;
        Ok(())
    }

    async fn submit_entry(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError> {
        let mut entry = self.load(actor, entry_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_TIMESHEETS, actor.record_scope(entry.user_id))
            .await?;
        if entry.user_id != actor.user_id {
            return Err(TimesheetError::NotOwner);
        }

        if entry.status == WorkflowStatus::Rejected {
            entry.status = entry.status.transition(WorkflowStatus::Draft)?;
        }
        self.transition(actor, entry, WorkflowStatus::Submitted, "timesheet.submit")
            .await
    }

    async fn approve_entry(&self, actor: &Actor, entry_id: i64) -> Result<TimesheetEntry, TimesheetError> {
        let mut entry = self.review(actor, entry_id).await?;
        entry.approved_by = Some(actor.user_id);
        entry.rejection_reason = None;
        self.transition(actor, entry, WorkflowStatus::Approved, "timesheet.approve")
            .await
    }

    async fn reject_entry(
        &self,
        actor: &Actor,
        entry_id: i64,
        reason: &str,
    ) -> Result<TimesheetEntry, TimesheetError> {
        let reason = sanitize_text(reason);
        if reason.is_empty() {
            return Err(TimesheetError::ReasonRequired);
        }

        let mut entry = self.review(actor, entry_id).await?;
        entry.rejection_reason = Some(reason);
        self.transition(actor, entry, WorkflowStatus::Rejected, "timesheet.reject")
            .await
    }

    async fn weekly_summary(
        &self,
        actor: &Actor,
        user_id: Option<i64>,
        week_of: NaiveDate,
    ) -> Result<WeekReport, TimesheetError> {
        let user_id = user_id.unwrap_or(actor.user_id);
        self.access
            .authorize(actor, Permissions::VIEW_TIMESHEETS, actor.record_scope(user_id))
            .await?;

        let start = week_start(week_of);
        let end = start + Duration::days(6);
        let entries = self
            .timesheet_repo
            .list(
                actor.tenant_id,
                EntryFilter {
                    user_id: Some(user_id),
                    status: None,
                    from: Some(start),
                    to: Some(end),
                    limit: WEEK_ENTRY_LIMIT,
                },
            )
            .await?;

        // Rejected time is not worked time until it is resubmitted
        let counted: Vec<TimesheetEntry> = entries
            .into_iter()
            .filter(|e| e.status != WorkflowStatus::Rejected)
            .collect();

        Ok(WeekReport {
            user_id,
            week_start: start,
            week_end: end,
            summary: timesheet_calculator::weekly_summary(&counted, self.overtime_threshold_hours),
        })
    }
}

/// Build a listing filter, forcing the caller's own records without ACCESS_ALL_RECORDS.
pub(crate) fn entry_filter(
    actor: &Actor,
    effective: i64,
    query: EntryListQuery,
    max_limit: i64,
) -> Result<EntryFilter, String> {
    let status = query
        .status
        .as_deref()
        .map(WorkflowStatus::parse)
        .transpose()
        .map_err(|e| e.to_string())?;
    let requested_user = query
        .user_id
        .as_deref()
        .map(str::parse::<i64>)
        .transpose()
        .map_err(|_| "user_id must be a user id".to_string())?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err("from must not be after to".into());
        }
    }

    let user_id = if PermissionService::own_records_only(effective) {
        Some(actor.user_id)
    } else {
        requested_user
    };

    Ok(EntryFilter {
        user_id,
        status,
        from: query.from,
        to: query.to,
        limit: clamp_limit(query.limit.unwrap_or(0), max_limit),
    })
}
