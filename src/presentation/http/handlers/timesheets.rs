//! Timesheet Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, parse_opt_id};
use crate::application::dto::request::{
    EntryListQuery, RejectRequest, TimesheetRequest, WeeklySummaryQuery,
};
use crate::application::dto::response::{TimesheetResponse, WeeklySummaryResponse};
use crate::application::services::{TimesheetService, TimesheetServiceImpl};
use crate::infrastructure::repositories::{
    PgAuditRepository, PgRoleRepository, PgTimesheetRepository, PgUserRepository,
};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

fn timesheet_service(
    state: &AppState,
) -> TimesheetServiceImpl<PgTimesheetRepository, PgUserRepository, PgRoleRepository, PgAuditRepository>
{
    TimesheetServiceImpl::new(
        Arc::new(PgTimesheetRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.access_control(),
        state.audit(),
        state.snowflake.clone(),
        state.settings.timesheet.weekly_overtime_threshold_hours,
    )
}

pub async fn create_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<TimesheetRequest>,
) -> Result<(StatusCode, Json<TimesheetResponse>), AppError> {
    validate_request(&body)?;

    let entry = timesheet_service(&state).create_entry(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(TimesheetResponse::from(entry))))
}

/// List entries; without ACCESS_ALL_RECORDS only the caller's own
pub async fn list_entries(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<Vec<TimesheetResponse>>, AppError> {
    let entries = timesheet_service(&state).list_entries(&actor, query).await?;
    Ok(Json(entries.into_iter().map(TimesheetResponse::from).collect()))
}

pub async fn get_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entry_id): Path<String>,
) -> Result<Json<TimesheetResponse>, AppError> {
    let entry_id = parse_id(&entry_id, "timesheet")?;
    let entry = timesheet_service(&state).get_entry(&actor, entry_id).await?;
    Ok(Json(TimesheetResponse::from(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entry_id): Path<String>,
    Json(body): Json<TimesheetRequest>,
) -> Result<Json<TimesheetResponse>, AppError> {
    validate_request(&body)?;
    let entry_id = parse_id(&entry_id, "timesheet")?;

    let entry = timesheet_service(&state)
        .update_entry(&actor, entry_id, body)
        .await?;
    Ok(Json(TimesheetResponse::from(entry)))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let entry_id = parse_id(&entry_id, "timesheet")?;
    timesheet_service(&state).delete_entry(&actor, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entry_id): Path<String>,
) -> Result<Json<TimesheetResponse>, AppError> {
    let entry_id = parse_id(&entry_id, "timesheet")?;
    let entry = timesheet_service(&state).submit_entry(&actor, entry_id).await?;
    Ok(Json(TimesheetResponse::from(entry)))
}

pub async fn approve_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entry_id): Path<String>,
) -> Result<Json<TimesheetResponse>, AppError> {
    let entry_id = parse_id(&entry_id, "timesheet")?;
    let entry = timesheet_service(&state).approve_entry(&actor, entry_id).await?;
    Ok(Json(TimesheetResponse::from(entry)))
}

pub async fn reject_entry(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entry_id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<TimesheetResponse>, AppError> {
    validate_request(&body)?;
    let entry_id = parse_id(&entry_id, "timesheet")?;

    let entry = timesheet_service(&state)
        .reject_entry(&actor, entry_id, &body.reason)
        .await?;
    Ok(Json(TimesheetResponse::from(entry)))
}

/// Regular, overtime and billable totals for one week
pub async fn weekly_summary(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<WeeklySummaryQuery>,
) -> Result<Json<WeeklySummaryResponse>, AppError> {
    let user_id = parse_opt_id(query.user_id.as_deref(), "user")?;

    let report = timesheet_service(&state)
        .weekly_summary(&actor, user_id, query.week_start)
        .await?;
    Ok(Json(WeeklySummaryResponse::from(report)))
}
