//! Permit Repository Implementation
//!
//! PostgreSQL implementation of the PermitRepository trait. Geometry,
//! hazards, entrants and readings are JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::services::volume_calculator::SpaceGeometry;
use crate::domain::{AtmosphericReading, Permit, PermitFilter, PermitRepository, PermitStatus, Province};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct PermitRow {
    id: i64,
    tenant_id: i64,
    permit_number: String,
    province: String,
    space_description: String,
    geometry: Json<SpaceGeometry>,
    volume_m3: f64,
    hazards: Json<Vec<String>>,
    entrants: Json<Vec<String>>,
    attendant: Option<String>,
    supervisor: Option<String>,
    rescue_plan: bool,
    entrants_trained: bool,
    energy_isolation_confirmed: bool,
    continuous_ventilation: bool,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    readings: Json<Vec<AtmosphericReading>>,
    notes: Option<String>,
    status: String,
    created_by: i64,
    issued_by: Option<i64>,
    issued_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermitRow {
    fn into_permit(self) -> Result<Permit, AppError> {
        let province = Province::parse(&self.province)
            .map_err(|e| AppError::Internal(format!("permit {}: {}", self.id, e)))?;
        let status = PermitStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("permit {}: unknown status {}", self.id, self.status))
        })?;
        Ok(Permit {
            id: self.id,
            tenant_id: self.tenant_id,
            permit_number: self.permit_number,
            province,
            space_description: self.space_description,
            geometry: self.geometry.0,
            volume_m3: self.volume_m3,
            hazards: self.hazards.0,
            entrants: self.entrants.0,
            attendant: self.attendant,
            supervisor: self.supervisor,
            rescue_plan: self.rescue_plan,
            entrants_trained: self.entrants_trained,
            energy_isolation_confirmed: self.energy_isolation_confirmed,
            continuous_ventilation: self.continuous_ventilation,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            readings: self.readings.0,
            notes: self.notes,
            status,
            created_by: self.created_by,
            issued_by: self.issued_by,
            issued_at: self.issued_at,
            closed_at: self.closed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PERMIT_COLUMNS: &str = "id, tenant_id, permit_number, province, space_description, \
     geometry, volume_m3, hazards, entrants, attendant, supervisor, rescue_plan, \
     entrants_trained, energy_isolation_confirmed, continuous_ventilation, valid_from, \
     valid_until, readings, notes, status, created_by, issued_by, issued_at, closed_at, \
     created_at, updated_at";

/// PostgreSQL permit repository.
#[derive(Clone)]
pub struct PgPermitRepository {
    pool: PgPool,
}

impl PgPermitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermitRepository for PgPermitRepository {
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Permit>, AppError> {
        let row = sqlx::query_as::<_, PermitRow>(&format!(
            "SELECT {PERMIT_COLUMNS} FROM permits WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PermitRow::into_permit).transpose()
    }

    async fn list(&self, tenant_id: i64, filter: PermitFilter) -> Result<Vec<Permit>, AppError> {
        let rows = sqlx::query_as::<_, PermitRow>(&format!(
            r#"
            SELECT {PERMIT_COLUMNS}
            FROM permits
            WHERE tenant_id = $1
              AND ($2::VARCHAR IS NULL OR status = $2)
            ORDER BY id DESC
            LIMIT $3
            "#
        ))
        .bind(tenant_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PermitRow::into_permit).collect()
    }

    async fn create(&self, permit: &Permit) -> Result<Permit, AppError> {
        let row = sqlx::query_as::<_, PermitRow>(&format!(
            r#"
            INSERT INTO permits (
                id, tenant_id, permit_number, province, space_description, geometry, volume_m3,
                hazards, entrants, attendant, supervisor, rescue_plan, entrants_trained,
                energy_isolation_confirmed, continuous_ventilation, valid_from, valid_until,
                readings, notes, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21)
            RETURNING {PERMIT_COLUMNS}
            "#
        ))
        .bind(permit.id)
        .bind(permit.tenant_id)
        .bind(&permit.permit_number)
        .bind(permit.province.code())
        .bind(&permit.space_description)
        .bind(Json(&permit.geometry))
        .bind(permit.volume_m3)
        .bind(Json(&permit.hazards))
        .bind(Json(&permit.entrants))
        .bind(&permit.attendant)
        .bind(&permit.supervisor)
        .bind(permit.rescue_plan)
        .bind(permit.entrants_trained)
        .bind(permit.energy_isolation_confirmed)
        .bind(permit.continuous_ventilation)
        .bind(permit.valid_from)
        .bind(permit.valid_until)
        .bind(Json(&permit.readings))
        .bind(&permit.notes)
        .bind(permit.status.as_str())
        .bind(permit.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(format!("Permit number {} already exists", permit.permit_number))
            }
            _ => AppError::Database(e),
        })?;

        row.into_permit()
    }

    async fn update(&self, permit: &Permit) -> Result<Permit, AppError> {
        let row = sqlx::query_as::<_, PermitRow>(&format!(
            r#"
            UPDATE permits
            SET space_description = $3,
                hazards = $4,
                entrants = $5,
                attendant = $6,
                supervisor = $7,
                rescue_plan = $8,
                entrants_trained = $9,
                energy_isolation_confirmed = $10,
                continuous_ventilation = $11,
                valid_from = $12,
                valid_until = $13,
                readings = $14,
                notes = $15,
                status = $16,
                issued_by = $17,
                issued_at = $18,
                closed_at = $19,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {PERMIT_COLUMNS}
            "#
        ))
        .bind(permit.tenant_id)
        .bind(permit.id)
        .bind(&permit.space_description)
        .bind(Json(&permit.hazards))
        .bind(Json(&permit.entrants))
        .bind(&permit.attendant)
        .bind(&permit.supervisor)
        .bind(permit.rescue_plan)
        .bind(permit.entrants_trained)
        .bind(permit.energy_isolation_confirmed)
        .bind(permit.continuous_ventilation)
        .bind(permit.valid_from)
        .bind(permit.valid_until)
        .bind(Json(&permit.readings))
        .bind(&permit.notes)
        .bind(permit.status.as_str())
        .bind(permit.issued_by)
        .bind(permit.issued_at)
        .bind(permit.closed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Permit with id {} not found", permit.id)))?;

        row.into_permit()
    }
}
