//! Expense entry entity and repository trait.
//!
//! Maps to the `expense_entries` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::timesheet::EntryFilter;
use crate::domain::value_objects::WorkflowStatus;
use crate::shared::error::AppError;

/// Expense category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Mileage,
    Meals,
    Lodging,
    Equipment,
    Materials,
    Other,
}

impl ExpenseCategory {
    /// Convert from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mileage" => Some(Self::Mileage),
            "meals" => Some(Self::Meals),
            "lodging" => Some(Self::Lodging),
            "equipment" => Some(Self::Equipment),
            "materials" => Some(Self::Materials),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mileage => "mileage",
            Self::Meals => "meals",
            Self::Lodging => "lodging",
            Self::Equipment => "equipment",
            Self::Materials => "materials",
            Self::Other => "other",
        }
    }
}

/// A reimbursable expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub id: i64,
    pub tenant_id: i64,
    pub user_id: i64,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    /// Amount in cents (computed for mileage)
    pub amount_cents: i64,
    /// Kilometres driven (mileage only)
    pub distance_km: Option<f64>,
    pub receipt_url: Option<String>,
    /// Re-invoiced to the client
    pub billable: bool,
    pub client_name: Option<String>,
    pub status: WorkflowStatus,
    pub approved_by: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for expense entries. Every call is tenant-scoped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<ExpenseEntry>, AppError>;

    /// Ordered by expense date, newest first.
    async fn list(&self, tenant_id: i64, filter: EntryFilter)
        -> Result<Vec<ExpenseEntry>, AppError>;

    async fn create(&self, entry: &ExpenseEntry) -> Result<ExpenseEntry, AppError>;

    async fn update(&self, entry: &ExpenseEntry) -> Result<ExpenseEntry, AppError>;

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<(), AppError>;
}
