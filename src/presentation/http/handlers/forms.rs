//! AST Form Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::parse_id;
use crate::application::dto::request::{AstFormRequest, FormListQuery, RejectRequest};
use crate::application::dto::response::AstFormResponse;
use crate::application::services::{FormService, FormServiceImpl};
use crate::infrastructure::repositories::{PgAstFormRepository, PgAuditRepository, PgRoleRepository};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

type Service = FormServiceImpl<PgAstFormRepository, PgRoleRepository, PgAuditRepository>;

fn form_service(state: &AppState) -> Service {
    FormServiceImpl::new(
        Arc::new(PgAstFormRepository::new(state.db.clone())),
        state.access_control(),
        state.audit(),
        state.snowflake.clone(),
    )
}

/// Create a draft form
pub async fn create_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<AstFormRequest>,
) -> Result<(StatusCode, Json<AstFormResponse>), AppError> {
    validate_request(&body)?;

    let form = form_service(&state).create_form(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(AstFormResponse::from(form))))
}

/// List forms, newest first
pub async fn list_forms(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<FormListQuery>,
) -> Result<Json<Vec<AstFormResponse>>, AppError> {
    let forms = form_service(&state).list_forms(&actor, query).await?;
    Ok(Json(forms.into_iter().map(AstFormResponse::from).collect()))
}

pub async fn get_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
) -> Result<Json<AstFormResponse>, AppError> {
    let form_id = parse_id(&form_id, "form")?;
    let form = form_service(&state).get_form(&actor, form_id).await?;
    Ok(Json(AstFormResponse::from(form)))
}

/// Replace the content of an editable form
pub async fn update_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
    Json(body): Json<AstFormRequest>,
) -> Result<Json<AstFormResponse>, AppError> {
    validate_request(&body)?;
    let form_id = parse_id(&form_id, "form")?;

    let form = form_service(&state).update_form(&actor, form_id, body).await?;
    Ok(Json(AstFormResponse::from(form)))
}

pub async fn delete_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let form_id = parse_id(&form_id, "form")?;
    form_service(&state).delete_form(&actor, form_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
) -> Result<Json<AstFormResponse>, AppError> {
    let form_id = parse_id(&form_id, "form")?;
    let form = form_service(&state).submit_form(&actor, form_id).await?;
    Ok(Json(AstFormResponse::from(form)))
}

pub async fn approve_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
) -> Result<Json<AstFormResponse>, AppError> {
    let form_id = parse_id(&form_id, "form")?;
    let form = form_service(&state).approve_form(&actor, form_id).await?;
    Ok(Json(AstFormResponse::from(form)))
}

pub async fn reject_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<AstFormResponse>, AppError> {
    validate_request(&body)?;
    let form_id = parse_id(&form_id, "form")?;

    let form = form_service(&state)
        .reject_form(&actor, form_id, &body.reason)
        .await?;
    Ok(Json(AstFormResponse::from(form)))
}

/// Lock an approved form
pub async fn lock_form(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(form_id): Path<String>,
) -> Result<Json<AstFormResponse>, AppError> {
    let form_id = parse_id(&form_id, "form")?;
    let form = form_service(&state).lock_form(&actor, form_id).await?;
    Ok(Json(AstFormResponse::from(form)))
}
