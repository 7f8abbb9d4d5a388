//! Expense Repository Implementation
//!
//! PostgreSQL implementation of the ExpenseRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::{EntryFilter, ExpenseCategory, ExpenseEntry, ExpenseRepository, WorkflowStatus};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: i64,
    tenant_id: i64,
    user_id: i64,
    expense_date: NaiveDate,
    category: String,
    description: String,
    amount_cents: i64,
    distance_km: Option<f64>,
    receipt_url: Option<String>,
    billable: bool,
    client_name: Option<String>,
    status: String,
    approved_by: Option<i64>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExpenseRow {
    fn into_entry(self) -> Result<ExpenseEntry, AppError> {
        let status = WorkflowStatus::parse(&self.status)
            .map_err(|e| AppError::Internal(format!("expense {}: {}", self.id, e)))?;
        let category = ExpenseCategory::parse(&self.category).ok_or_else(|| {
            AppError::Internal(format!("expense {}: unknown category {}", self.id, self.category))
        })?;
        Ok(ExpenseEntry {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            expense_date: self.expense_date,
            category,
            description: self.description,
            amount_cents: self.amount_cents,
            distance_km: self.distance_km,
            receipt_url: self.receipt_url,
            billable: self.billable,
            client_name: self.client_name,
            status,
            approved_by: self.approved_by,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const EXPENSE_COLUMNS: &str = "id, tenant_id, user_id, expense_date, category, description, \
     amount_cents, distance_km, receipt_url, billable, client_name, status, approved_by, \
     rejection_reason, created_at, updated_at";

/// PostgreSQL expense repository.
#[derive(Clone)]
pub struct PgExpenseRepository {
    pool: PgPool,
}

impl PgExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseRepository for PgExpenseRepository {
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<ExpenseEntry>, AppError> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense_entries WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExpenseRow::into_entry).transpose()
    }

    async fn list(
        &self,
        tenant_id: i64,
        filter: EntryFilter,
    ) -> Result<Vec<ExpenseEntry>, AppError> {
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expense_entries
            WHERE tenant_id = $1
              AND ($2::BIGINT IS NULL OR user_id = $2)
              AND ($3::VARCHAR IS NULL OR status = $3)
              AND ($4::DATE IS NULL OR expense_date >= $4)
              AND ($5::DATE IS NULL OR expense_date <= $5)
            ORDER BY expense_date DESC, id DESC
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

        rows.into_iter().map(ExpenseRow::into_entry).collect()
    }

    async fn create(&self, entry: &ExpenseEntry) -> Result<ExpenseEntry, AppError> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            INSERT INTO expense_entries (
                id, tenant_id, user_id, expense_date, category, description, amount_cents,
                distance_km, receipt_url, billable, client_name, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(entry.id)
        .bind(entry.tenant_id)
        .bind(entry.user_id)
        .bind(entry.expense_date)
        .bind(entry.category.as_str())
        .bind(&entry.description)
        .bind(entry.amount_cents)
        .bind(entry.distance_km)
        .bind(&entry.receipt_url)
        .bind(entry.billable)
        .bind(&entry.client_name)
        .bind(entry.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.into_entry()
    }

    async fn update(&self, entry: &ExpenseEntry) -> Result<ExpenseEntry, AppError> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            UPDATE expense_entries
            SET expense_date = $3,
                category = $4,
                description = $5,
                amount_cents = $6,
                distance_km = $7,
                receipt_url = $8,
                billable = $9,
                client_name = $10,
                status = $11,
                approved_by = $12,
                rejection_reason = $13,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(entry.tenant_id)
        .bind(entry.id)
        .bind(entry.expense_date)
        .bind(entry.category.as_str())
        .bind(&entry.description)
        .bind(entry.amount_cents)
        .bind(entry.distance_km)
        .bind(&entry.receipt_url)
        .bind(entry.billable)
        .bind(&entry.client_name)
        .bind(entry.status.as_str())
        .bind(entry.approved_by)
        .bind(&entry.rejection_reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", entry.id)))?;

        row.into_entry()
    }

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM expense_entries WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Expense {} not found", id)));
        }

        Ok(())
    }
}
