//! Confined-Space Permit Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::parse_id;
use crate::application::dto::request::{CreatePermitRequest, PermitListQuery, ReadingRequest};
use crate::application::dto::response::PermitResponse;
use crate::application::services::{PermitService, PermitServiceImpl};
use crate::domain::services::compliance::{self, ComplianceReport, ProvinceRules};
use crate::domain::Province;
use crate::infrastructure::repositories::{PgAuditRepository, PgPermitRepository, PgRoleRepository};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

fn permit_service(
    state: &AppState,
) -> PermitServiceImpl<PgPermitRepository, PgRoleRepository, PgAuditRepository> {
    PermitServiceImpl::new(
        Arc::new(PgPermitRepository::new(state.db.clone())),
        state.access_control(),
        state.audit(),
        state.snowflake.clone(),
    )
}

/// Create a draft permit
pub async fn create_permit(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<CreatePermitRequest>,
) -> Result<(StatusCode, Json<PermitResponse>), AppError> {
    validate_request(&body)?;

    let permit = permit_service(&state).create_permit(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(PermitResponse::from(permit))))
}

pub async fn list_permits(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<PermitListQuery>,
) -> Result<Json<Vec<PermitResponse>>, AppError> {
    let permits = permit_service(&state).list_permits(&actor, query).await?;
    Ok(Json(permits.into_iter().map(PermitResponse::from).collect()))
}

pub async fn get_permit(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(permit_id): Path<String>,
) -> Result<Json<PermitResponse>, AppError> {
    let permit_id = parse_id(&permit_id, "permit")?;
    let permit = permit_service(&state).get_permit(&actor, permit_id).await?;
    Ok(Json(PermitResponse::from(permit)))
}

/// Record an atmospheric reading
pub async fn add_reading(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(permit_id): Path<String>,
    Json(body): Json<ReadingRequest>,
) -> Result<(StatusCode, Json<PermitResponse>), AppError> {
    validate_request(&body)?;
    let permit_id = parse_id(&permit_id, "permit")?;

    let permit = permit_service(&state)
        .add_reading(&actor, permit_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(PermitResponse::from(permit))))
}

/// Activate a compliant permit; 422 with the report otherwise
pub async fn activate_permit(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(permit_id): Path<String>,
) -> Result<Json<PermitResponse>, AppError> {
    let permit_id = parse_id(&permit_id, "permit")?;
    let permit = permit_service(&state).activate_permit(&actor, permit_id).await?;
    Ok(Json(PermitResponse::from(permit)))
}

pub async fn close_permit(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(permit_id): Path<String>,
) -> Result<Json<PermitResponse>, AppError> {
    let permit_id = parse_id(&permit_id, "permit")?;
    let permit = permit_service(&state).close_permit(&actor, permit_id).await?;
    Ok(Json(PermitResponse::from(permit)))
}

pub async fn cancel_permit(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(permit_id): Path<String>,
) -> Result<Json<PermitResponse>, AppError> {
    let permit_id = parse_id(&permit_id, "permit")?;
    let permit = permit_service(&state).cancel_permit(&actor, permit_id).await?;
    Ok(Json(PermitResponse::from(permit)))
}

/// Live compliance report of a permit
pub async fn compliance_report(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(permit_id): Path<String>,
) -> Result<Json<ComplianceReport>, AppError> {
    let permit_id = parse_id(&permit_id, "permit")?;
    let report = permit_service(&state)
        .compliance_report(&actor, permit_id)
        .await?;
    Ok(Json(report))
}

/// Confined-space rule table of a province
pub async fn regulations(Path(province): Path<String>) -> Result<Json<ProvinceRules>, AppError> {
    let province = Province::parse(&province)
        .map_err(|e| AppError::NotFound(format!("Unknown province: {}", e.0)))?;
    Ok(Json(*compliance::rules_for(province)))
}

/// Rule tables of every supported province
pub async fn all_regulations() -> Json<Vec<ProvinceRules>> {
    Json(compliance::all_rules().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_regulations_lookup_is_case_insensitive() {
        let Json(rules) = regulations(Path("qc".to_string())).await.unwrap();
        assert_eq!(rules.province, Province::parse("QC").unwrap());
    }

    #[tokio::test]
    async fn test_unknown_province_is_not_found() {
        let result = regulations(Path("XX".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_all_regulations_cover_ten_provinces() {
        let Json(all) = all_regulations().await;
        assert_eq!(all.len(), 10);
    }
}
