//! Billing Handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::application::dto::request::BillingQuery;
use crate::application::services::{BillingService, BillingServiceImpl};
use crate::domain::services::billing_calculator::BillingSummary;
use crate::infrastructure::repositories::{
    PgExpenseRepository, PgRoleRepository, PgTenantRepository, PgTimesheetRepository,
};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Approved billable work of the caller's tenant, taxed for its province
pub async fn billing_summary(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<BillingQuery>,
) -> Result<Json<BillingSummary>, AppError> {
    let service = BillingServiceImpl::<_, _, _, PgRoleRepository>::new(
        Arc::new(PgTimesheetRepository::new(state.db.clone())),
        Arc::new(PgExpenseRepository::new(state.db.clone())),
        Arc::new(PgTenantRepository::new(state.db.clone())),
        state.access_control(),
    );

    let summary = service.summary(&actor, query).await?;
    Ok(Json(summary))
}
