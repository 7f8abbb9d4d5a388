//! AST Form Repository Implementation
//!
//! PostgreSQL implementation of the AstFormRepository trait. Hazards,
//! controls, lockout points and team members are stored as JSONB.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    AstForm, AstFormRepository, ControlMeasure, FormFilter, Hazard, LockoutPoint, TeamMember,
    WorkflowStatus,
};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct AstFormRow {
    id: i64,
    tenant_id: i64,
    form_number: String,
    created_by: i64,
    client_name: String,
    work_location: String,
    task_description: String,
    work_date: NaiveDate,
    status: String,
    hazards: Json<Vec<Hazard>>,
    controls: Json<Vec<ControlMeasure>>,
    lockout_points: Json<Vec<LockoutPoint>>,
    team_members: Json<Vec<TeamMember>>,
    payload: serde_json::Value,
    rejection_reason: Option<String>,
    approved_by: Option<i64>,
    approved_at: Option<DateTime<Utc>>,
    locked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AstFormRow {
    fn into_form(self) -> Result<AstForm, AppError> {
        let status = WorkflowStatus::parse(&self.status)
            .map_err(|e| AppError::Internal(format!("form {}: {}", self.id, e)))?;
        Ok(AstForm {
            id: self.id,
            tenant_id: self.tenant_id,
            form_number: self.form_number,
            created_by: self.created_by,
            client_name: self.client_name,
            work_location: self.work_location,
            task_description: self.task_description,
            work_date: self.work_date,
            status,
            hazards: self.hazards.0,
            controls: self.controls.0,
            lockout_points: self.lockout_points.0,
            team_members: self.team_members.0,
            payload: self.payload,
            rejection_reason: self.rejection_reason,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            locked_at: self.locked_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const FORM_COLUMNS: &str = "id, tenant_id, form_number, created_by, client_name, work_location, \
     task_description, work_date, status, hazards, controls, lockout_points, team_members, \
     payload, rejection_reason, approved_by, approved_at, locked_at, created_at, updated_at";

/// PostgreSQL AST form repository.
#[derive(Clone)]
pub struct PgAstFormRepository {
    pool: PgPool,
}

impl PgAstFormRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AstFormRepository for PgAstFormRepository {
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<AstForm>, AppError> {
        let row = sqlx::query_as::<_, AstFormRow>(&format!(
            "SELECT {FORM_COLUMNS} FROM ast_forms WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AstFormRow::into_form).transpose()
    }

    async fn list(&self, tenant_id: i64, filter: FormFilter) -> Result<Vec<AstForm>, AppError> {
        let rows = sqlx::query_as::<_, AstFormRow>(&format!(
            r#"
            SELECT {FORM_COLUMNS}
            FROM ast_forms
            WHERE tenant_id = $1
              AND ($2::VARCHAR IS NULL OR status = $2)
              AND ($3::BIGINT IS NULL OR created_by = $3)
              AND ($4::BIGINT IS NULL OR id < $4)
            ORDER BY id DESC
            LIMIT $5
            "#
        ))
        .bind(tenant_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.created_by)
        .bind(filter.before)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AstFormRow::into_form).collect()
    }

    async fn create(&self, form: &AstForm) -> Result<AstForm, AppError> {
        let row = sqlx::query_as::<_, AstFormRow>(&format!(
            r#"
            INSERT INTO ast_forms (
                id, tenant_id, form_number, created_by, client_name, work_location,
                task_description, work_date, status, hazards, controls, lockout_points,
                team_members, payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {FORM_COLUMNS}
            "#
        ))
        .bind(form.id)
        .bind(form.tenant_id)
        .bind(&form.form_number)
        .bind(form.created_by)
        .bind(&form.client_name)
        .bind(&form.work_location)
        .bind(&form.task_description)
        .bind(form.work_date)
        .bind(form.status.as_str())
        .bind(Json(&form.hazards))
        .bind(Json(&form.controls))
        .bind(Json(&form.lockout_points))
        .bind(Json(&form.team_members))
        .bind(&form.payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(format!("Form number {} already exists", form.form_number))
            }
            _ => AppError::Database(e),
        })?;

        row.into_form()
    }

    async fn update(&self, form: &AstForm) -> Result<AstForm, AppError> {
        let row = sqlx::query_as::<_, AstFormRow>(&format!(
            r#"
            UPDATE ast_forms
            SET client_name = $3,
                work_location = $4,
                task_description = $5,
                work_date = $6,
                status = $7,
                hazards = $8,
                controls = $9,
                lockout_points = $10,
                team_members = $11,
                payload = $12,
                rejection_reason = $13,
                approved_by = $14,
                approved_at = $15,
                locked_at = $16,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {FORM_COLUMNS}
            "#
        ))
        .bind(form.tenant_id)
        .bind(form.id)
        .bind(&form.client_name)
        .bind(&form.work_location)
        .bind(&form.task_description)
        .bind(form.work_date)
        .bind(form.status.as_str())
        .bind(Json(&form.hazards))
        .bind(Json(&form.controls))
        .bind(Json(&form.lockout_points))
        .bind(Json(&form.team_members))
        .bind(&form.payload)
        .bind(&form.rejection_reason)
        .bind(form.approved_by)
        .bind(form.approved_at)
        .bind(form.locked_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form with id {} not found", form.id)))?;

        row.into_form()
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM ast_forms WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Form with id {} not found", id)));
        }

        Ok(())
    }

    async fn next_sequence(&self, tenant_id: i64, year: i32) -> Result<i64, AppError> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO form_counters (tenant_id, year, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, year)
            DO UPDATE SET last_value = form_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }
}
