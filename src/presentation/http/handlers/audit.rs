//! Audit Log Handlers

use axum::{
    extract::{Query, State},
    Json,
};

use super::parse_opt_id;
use crate::application::dto::request::AuditQuery;
use crate::application::dto::response::AuditEntryResponse;
use crate::domain::AuditFilter;
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Newest-first audit trail of the caller's tenant
pub async fn list_audit_entries(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, AppError> {
    let filter = AuditFilter {
        actor_id: parse_opt_id(query.actor_id.as_deref(), "actor")?,
        entity_type: query.entity_type,
        entity_id: parse_opt_id(query.entity_id.as_deref(), "entity")?,
        from: query.from,
        to: query.to,
        limit: query.limit.unwrap_or(0),
    };

    let access = state.access_control();
    let entries = state.audit().list(&access, &actor, filter).await?;
    Ok(Json(entries.into_iter().map(AuditEntryResponse::from).collect()))
}
