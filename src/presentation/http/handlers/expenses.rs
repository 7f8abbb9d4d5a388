//! Expense Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::parse_id;
use crate::application::dto::request::{EntryListQuery, ExpenseRequest, RejectRequest};
use crate::application::dto::response::ExpenseResponse;
use crate::application::services::{ExpenseService, ExpenseServiceImpl};
use crate::infrastructure::repositories::{PgAuditRepository, PgExpenseRepository, PgRoleRepository};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

fn expense_service(
    state: &AppState,
) -> ExpenseServiceImpl<PgExpenseRepository, PgRoleRepository, PgAuditRepository> {
    ExpenseServiceImpl::new(
        Arc::new(PgExpenseRepository::new(state.db.clone())),
        state.access_control(),
        state.audit(),
        state.snowflake.clone(),
        state.settings.expense.clone(),
    )
}

pub async fn create_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), AppError> {
    validate_request(&body)?;

    let expense = expense_service(&state).create_expense(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(ExpenseResponse::from(expense))))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<Vec<ExpenseResponse>>, AppError> {
    let expenses = expense_service(&state).list_expenses(&actor, query).await?;
    Ok(Json(expenses.into_iter().map(ExpenseResponse::from).collect()))
}

pub async fn get_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(expense_id): Path<String>,
) -> Result<Json<ExpenseResponse>, AppError> {
    let expense_id = parse_id(&expense_id, "expense")?;
    let expense = expense_service(&state).get_expense(&actor, expense_id).await?;
    Ok(Json(ExpenseResponse::from(expense)))
}

pub async fn update_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(expense_id): Path<String>,
    Json(body): Json<ExpenseRequest>,
) -> Result<Json<ExpenseResponse>, AppError> {
    validate_request(&body)?;
    let expense_id = parse_id(&expense_id, "expense")?;

    let expense = expense_service(&state)
        .update_expense(&actor, expense_id, body)
        .await?;
    Ok(Json(ExpenseResponse::from(expense)))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(expense_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let expense_id = parse_id(&expense_id, "expense")?;
    expense_service(&state).delete_expense(&actor, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(expense_id): Path<String>,
) -> Result<Json<ExpenseResponse>, AppError> {
    let expense_id = parse_id(&expense_id, "expense")?;
    let expense = expense_service(&state).submit_expense(&actor, expense_id).await?;
    Ok(Json(ExpenseResponse::from(expense)))
}

pub async fn approve_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(expense_id): Path<String>,
) -> Result<Json<ExpenseResponse>, AppError> {
    let expense_id = parse_id(&expense_id, "expense")?;
    let expense = expense_service(&state).approve_expense(&actor, expense_id).await?;
    Ok(Json(ExpenseResponse::from(expense)))
}

pub async fn reject_expense(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(expense_id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<ExpenseResponse>, AppError> {
    validate_request(&body)?;
    let expense_id = parse_id(&expense_id, "expense")?;

    let expense = expense_service(&state)
        .reject_expense(&actor, expense_id, &body.reason)
        .await?;
    Ok(Json(ExpenseResponse::from(expense)))
}
