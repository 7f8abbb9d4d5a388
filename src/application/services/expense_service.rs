//! Expense Service

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::access_control::AccessControl;
use super::actor::Actor;
use super::audit_service::AuditService;
use super::timesheet_service::entry_filter;
use crate::application::dto::request::{EntryListQuery, ExpenseRequest};
use crate::config::ExpenseSettings;
use crate::domain::value_objects::InvalidTransition;
use crate::domain::{
    AuditRepository, ExpenseCategory, ExpenseEntry, ExpenseRepository, Permissions, RoleRepository,
    WorkflowStatus,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::sanitize::{sanitize_opt, sanitize_text};
use crate::shared::snowflake::SnowflakeGenerator;

/// Maximum page size of an expense listing
pub const MAX_EXPENSE_LIMIT: i64 = 100;

/// Expense service trait
#[async_trait]
pub trait ExpenseService: Send + Sync {
    async fn create_expense(
        &self,
        actor: &Actor,
        request: ExpenseRequest,
    ) -> Result<ExpenseEntry, ExpenseError>;

    async fn get_expense(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError>;

    async fn list_expenses(
        &self,
        actor: &Actor,
        query: EntryListQuery,
    ) -> Result<Vec<ExpenseEntry>, ExpenseError>;

    async fn update_expense(
        &self,
        actor: &Actor,
        expense_id: i64,
        request: ExpenseRequest,
    ) -> Result<ExpenseEntry, ExpenseError>;

    async fn delete_expense(&self, actor: &Actor, expense_id: i64) -> Result<(), ExpenseError>;

    async fn submit_expense(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError>;

    async fn approve_expense(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError>;

    async fn reject_expense(
        &self,
        actor: &Actor,
        expense_id: i64,
        reason: &str,
    ) -> Result<ExpenseEntry, ExpenseError>;
}

/// Expense service errors
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Expense not found")]
    NotFound,

    #[error("Unknown expense category: {0}")]
    UnknownCategory(String),

    #[error("Mileage expenses need a positive distance_km")]
    DistanceRequired,

    #[error("amount_cents must be positive")]
    AmountRequired,

    #[error("A receipt is required for expenses above {0} cents")]
    ReceiptRequired(i64),

    #[error("Expense is {0} and can no longer be changed")]
    NotEditable(WorkflowStatus),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("A rejection reason is required")]
    ReasonRequired,

    #[error("An expense cannot be approved by its owner")]
    SelfApproval,

    #[error("Only the owner can submit an expense")]
    NotOwner,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<ExpenseError> for AppError {
    fn from(e: ExpenseError) -> Self {
        match e {
            ExpenseError::NotFound => AppError::NotFound("Expense not found".into()),
            e @ (ExpenseError::NotEditable(_) | ExpenseError::InvalidTransition(_)) => {
                AppError::Conflict(e.to_string())
            }
            e @ (ExpenseError::SelfApproval | ExpenseError::NotOwner) => {
                AppError::Forbidden(e.to_string())
            }
            e @ ExpenseError::ReceiptRequired(_) => AppError::unprocessable(e.to_string()),
            ExpenseError::Store(e) => e,
            e => AppError::validation(e.to_string()),
        }
    }
}

/// Amount in cents for a request, computing mileage from the configured rate.
pub fn expense_amount(
    category: ExpenseCategory,
    amount_cents: Option<i64>,
    distance_km: Option<f64>,
    settings: &ExpenseSettings,
) -> Result<i64, ExpenseError> {
    match category {
        ExpenseCategory::Mileage => match distance_km {
            Some(km) if km.is_finite() && km > 0.0 => {
                Ok((km * settings.mileage_rate_cents as f64).round() as i64)
            }
            _ => Err(ExpenseError::DistanceRequired),
        },
        _ => match amount_cents {
            Some(cents) if cents > 0 => Ok(cents),
            _ => Err(ExpenseError::AmountRequired),
        },
    }
}

/// ExpenseService implementation
pub struct ExpenseServiceImpl<E, R, A>
where
    E: ExpenseRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    expense_repo: Arc<E>,
    access: Arc<AccessControl<R>>,
    audit: AuditService<A>,
    id_generator: Arc<SnowflakeGenerator>,
    settings: ExpenseSettings,
}

impl<E, R, A> ExpenseServiceImpl<E, R, A>
where
    E: ExpenseRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    pub fn new(
        expense_repo: Arc<E>,
        access: Arc<AccessControl<R>>,
        audit: AuditService<A>,
        id_generator: Arc<SnowflakeGenerator>,
        settings: ExpenseSettings,
    ) -> Self {
        Self {
            expense_repo,
            access,
            audit,
            id_generator,
            settings,
        }
    }

    async fn load(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError> {
        self.expense_repo
            .find_by_id(actor.tenant_id, expense_id)
            .await?
            .ok_or(ExpenseError::NotFound)
    }

    fn apply_request(&self, expense: &mut ExpenseEntry, request: ExpenseRequest) -> Result<(), ExpenseError> {
        let category = ExpenseCategory::parse(&request.category)
            .ok_or_else(|| ExpenseError::UnknownCategory(request.category.clone()))?;
        let amount_cents =
            expense_amount(category, request.amount_cents, request.distance_km, &self.settings)?;

        let receipt_url = request
            .receipt_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if category != ExpenseCategory::Mileage
            && amount_cents > self.settings.receipt_required_above_cents
            && receipt_url.is_none()
        {
            return Err(ExpenseError::ReceiptRequired(self.settings.receipt_required_above_cents));
        }

        expense.expense_date = request.expense_date;
        expense.category = category;
        expense.description = sanitize_text(&request.description);
        expense.amount_cents = amount_cents;
        expense.distance_km = match category {
            ExpenseCategory::Mileage => request.distance_km,
            _ => None,
        };
        expense.receipt_url = receipt_url;
        expense.billable = request.billable.unwrap_or(false);
        expense.client_name = sanitize_opt(request.client_name);
        Ok(())
    }

    async fn transition(
        &self,
        actor: &Actor,
        mut expense: ExpenseEntry,
        to: WorkflowStatus,
        action: &str,
    ) -> Result<ExpenseEntry, ExpenseError> {
        let from = expense.status;
        expense.status = from.transition(to)?;
        expense.updated_at = Utc::now();

        let saved = self.expense_repo.update(&expense).await?;
        metrics::record_transition("expense", to.as_str());
        self.audit
            .record(
                actor,
                action,
                "expense",
                Some(saved.id),
                json!({ "from": from, "to": to, "amount_cents": saved.amount_cents }),
            )
            .await;
        Ok(saved)
    }

    async fn review(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError> {
        let expense = self.load(actor, expense_id).await?;
        let effective = self
            .access
            .authorize(actor, Permissions::APPROVE_EXPENSES, actor.tenant_scope())
            .await?;
        if expense.user_id == actor.user_id && !Permissions::from_bits(effective).is_admin() {
            return Err(ExpenseError::SelfApproval);
        }
        Ok(expense)
    }
}

#[async_trait]
impl<E, R, A> ExpenseService for ExpenseServiceImpl<E, R, A>
where
    E: ExpenseRepository + 'static,
    R: RoleRepository + 'static,
    A: AuditRepository + 'static,
{
    async fn create_expense(
        &self,
        actor: &Actor,
        request: ExpenseRequest,
    ) -> Result<ExpenseEntry, ExpenseError> {
        self.access
            .authorize(actor, Permissions::EDIT_EXPENSES, actor.tenant_scope())
            .await?;

        let now = Utc::now();
        let mut expense = ExpenseEntry {
            id: self.id_generator.generate(),
            tenant_id: actor.tenant_id,
            user_id: actor.user_id,
            expense_date: request.expense_date,
            category: ExpenseCategory::Other,
            description: String::new(),
            amount_cents: 0,
            distance_km: None,
            receipt_url: None,
            billable: false,
            client_name: None,
            status: WorkflowStatus::Draft,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.apply_request(&mut expense, request)?;

        let saved = self.expense_repo.create(&expense).await?;
        self.audit
            .record(
                actor,
                "expense.create",
                "expense",
                Some(saved.id),
                json!({ "category": saved.category, "amount_cents": saved.amount_cents }),
            )
            .await;
        info!(tenant_id = actor.tenant_id, expense_id = saved.id, amount_cents = saved.amount_cents, "Expense created");
        Ok(saved)
    }

    async fn get_expense(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError> {
        let expense = self.load(actor, expense_id).await?;
        self.access
            .authorize(actor, Permissions::VIEW_EXPENSES, actor.record_scope(expense.user_id))
            .await?;
        Ok(expense)
    }

    async fn list_expenses(
        &self,
        actor: &Actor,
        query: EntryListQuery,
    ) -> Result<Vec<ExpenseEntry>, ExpenseError> {
        let effective = self
            .access
            .authorize(actor, Permissions::VIEW_EXPENSES, actor.tenant_scope())
            .await?;

        let filter = entry_filter(actor, effective, query, MAX_EXPENSE_LIMIT)
            .map_err(ExpenseError::InvalidFilter)?;
        Ok(self.expense_repo.list(actor.tenant_id, filter).await?)
    }

    async fn update_expense(
        &self,
        actor: &Actor,
        expense_id: i64,
        request: ExpenseRequest,
    ) -> Result<ExpenseEntry, ExpenseError> {
        let mut expense = self.load(actor, expense_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_EXPENSES, actor.record_scope(expense.user_id))
            .await?;

        if !expense.status.is_editable() {
            return Err(ExpenseError::NotEditable(expense.status));
        }
        if expense.status == WorkflowStatus::Rejected {
            expense.status = expense.status.transition(WorkflowStatus::Draft)?;
            expense.rejection_reason = None;
        }

        self.apply_request(&mut expense, request)?;
        expense.updated_at = Utc::now();

        let saved = self.expense_repo.update(&expense).await?;
        self.audit
            .record(
                actor,
                "expense.update",
                "expense",
                Some(saved.id),
                json!({ "amount_cents": saved.amount_cents }),
            )
            .await;
        Ok(saved)
    }

    async fn delete_expense(&self, actor: &Actor, expense_id: i64) -> Result<(), ExpenseError> {
        let expense = self.load(actor, expense_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_EXPENSES, actor.record_scope(expense.user_id))
            .await?;

        if !expense.status.is_editable() {
            return Err(ExpenseError::NotEditable(expense.status));
        }

        self.expense_repo.delete(actor.tenant_id, expense.id).await?;
        self.audit
            .record(actor, "expense.delete", "expense", Some(expense.id), json!({}))
            .await;
        Ok(())
    }

    async fn submit_expense(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError> {
        let mut expense = self.load(actor, expense_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_EXPENSES, actor.record_scope(expense.user_id))
            .await?;
        if expense.user_id != actor.user_id {
            return Err(ExpenseError::NotOwner);
        }

        if expense.status == WorkflowStatus::Rejected {
            expense.status = expense.status.transition(WorkflowStatus::Draft)?;
        }
        self.transition(actor, expense, WorkflowStatus::Submitted, "expense.submit")
            .await
    }

    async fn approve_expense(&self, actor: &Actor, expense_id: i64) -> Result<ExpenseEntry, ExpenseError> {
        let mut expense = self.review(actor, expense_id).await?;
        expense.approved_by = Some(actor.user_id);
        expense.rejection_reason = None;
        self.transition(actor, expense, WorkflowStatus::Approved, "expense.approve")
            .await
    }

    async fn reject_expense(
        &self,
        actor: &Actor,
        expense_id: i64,
        reason: &str,
    ) -> Result<ExpenseEntry, ExpenseError> {
        let reason = sanitize_text(reason);
        if reason.is_empty() {
            return Err(ExpenseError::ReasonRequired);
        }

        let mut expense = self.review(actor, expense_id).await?;
        expense.rejection_reason = Some(reason);
        self.transition(actor, expense, WorkflowStatus::Rejected, "expense.reject")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::access_control::test_support::access_with_role;
    use crate::domain::entities::mocks::{
        MockAuditRepository, MockExpenseRepository, MockRoleRepository,
    };
    use crate::domain::Role;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const TENANT: i64 = 1;
    const WORKER: i64 = 7;

    fn settings() -> ExpenseSettings {
        ExpenseSettings {
            mileage_rate_cents: 68,
            receipt_required_above_cents: 7500,
        }
    }

    type Service = ExpenseServiceImpl<MockExpenseRepository, MockRoleRepository, MockAuditRepository>;

    fn service(repo: MockExpenseRepository, role: Role) -> Service {
        let mut audit = MockAuditRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        let ids = Arc::new(SnowflakeGenerator::new(1, 0));
        ExpenseServiceImpl::new(
            Arc::new(repo),
            access_with_role(TENANT, role),
            AuditService::new(Arc::new(audit), ids.clone()),
            ids,
            settings(),
        )
    }

    fn request(category: &str, amount_cents: Option<i64>, distance_km: Option<f64>) -> ExpenseRequest {
        ExpenseRequest {
            expense_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            category: category.into(),
            description: "Déplacement chantier".into(),
            amount_cents,
            distance_km,
            receipt_url: None,
            billable: Some(true),
            client_name: Some("Client A".into()),
        }
    }

    fn stored(status: WorkflowStatus) -> ExpenseEntry {
        let now = Utc::now();
        ExpenseEntry {
            id: 5,
            tenant_id: TENANT,
            user_id: WORKER,
            expense_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            category: ExpenseCategory::Meals,
            description: "Lunch".into(),
            amount_cents: 2500,
            distance_km: None,
            receipt_url: None,
            billable: false,
            client_name: None,
            status,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test_case(120.0, 8160 ; "whole kilometres")]
    #[test_case(12.5, 850 ; "fractional kilometres")]
    #[test_case(0.7, 48 ; "rounds to nearest cent")]
    fn test_mileage_amount(km: f64, expected: i64) {
        let amount =
            expense_amount(ExpenseCategory::Mileage, None, Some(km), &settings()).unwrap();
        assert_eq!(amount, expected);
    }

    #[test_case(None ; "missing")]
    #[test_case(Some(0.0) ; "zero")]
    #[test_case(Some(-3.0) ; "negative")]
    #[test_case(Some(f64::NAN) ; "not a number")]
    fn test_mileage_requires_distance(km: Option<f64>) {
        let err = expense_amount(ExpenseCategory::Mileage, Some(100), km, &settings()).unwrap_err();
        assert!(matches!(err, ExpenseError::DistanceRequired));
    }

    #[test]
    fn test_other_categories_require_amount() {
        let err = expense_amount(ExpenseCategory::Meals, Some(0), None, &settings()).unwrap_err();
        assert!(matches!(err, ExpenseError::AmountRequired));
    }

    #[tokio::test]
    async fn test_create_mileage_expense() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_create().returning(|e| Ok(e.clone()));

        let created = service(repo, Role::Worker)
            .create_expense(&Actor::new(WORKER, TENANT), request("mileage", None, Some(120.0)))
            .await
            .unwrap();

        assert_eq!(created.category, ExpenseCategory::Mileage);
        assert_eq!(created.amount_cents, 8160);
        assert_eq!(created.distance_km, Some(120.0));
        assert_eq!(created.status, WorkflowStatus::Draft);
    }

    #[tokio::test]
    async fn test_receipt_required_above_threshold() {
        let err = service(MockExpenseRepository::new(), Role::Worker)
            .create_expense(&Actor::new(WORKER, TENANT), request("lodging", Some(18_000), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::ReceiptRequired(7500)));
        assert!(matches!(AppError::from(err), AppError::Unprocessable { .. }));
    }

    #[tokio::test]
    async fn test_receipt_provided_above_threshold() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_create().returning(|e| Ok(e.clone()));

        let mut req = request("lodging", Some(18_000), None);
        req.receipt_url = Some("https://files.example/receipt.pdf".into());
        let created = service(repo, Role::Worker)
            .create_expense(&Actor::new(WORKER, TENANT), req)
            .await
            .unwrap();
        assert_eq!(created.amount_cents, 18_000);
        assert_eq!(created.distance_km, None);
    }

    #[tokio::test]
    async fn test_unknown_category() {
        let err = service(MockExpenseRepository::new(), Role::Worker)
            .create_expense(&Actor::new(WORKER, TENANT), request("yacht", Some(100), None))
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_worker_cannot_approve() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(stored(WorkflowStatus::Submitted))));

        let err = service(repo, Role::Worker)
            .approve_expense(&Actor::new(8, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_supervisor_cannot_approve_own_expense() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(stored(WorkflowStatus::Submitted))));

        let err = service(repo, Role::Supervisor)
            .approve_expense(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::SelfApproval));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let err = service(MockExpenseRepository::new(), Role::Supervisor)
            .reject_expense(&Actor::new(30, TENANT), 5, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::ReasonRequired));
    }

    #[tokio::test]
    async fn test_resubmit_after_rejection() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(stored(WorkflowStatus::Rejected))));
        repo.expect_update().returning(|e| Ok(e.clone()));

        let submitted = service(repo, Role::Worker)
            .submit_expense(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap();
        assert_eq!(submitted.status, WorkflowStatus::Submitted);
    }

    #[tokio::test]
    async fn test_supervisor_cannot_submit_for_worker() {
        let mut repo = MockExpenseRepository::new();
        repo.expect_find_by_id()
            .returning(|_, _| Ok(Some(stored(WorkflowStatus::Draft))));

        let err = service(repo, Role::Supervisor)
            .submit_expense(&Actor::new(30, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::NotOwner));
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }
}
