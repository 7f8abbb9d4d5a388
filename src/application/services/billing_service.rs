//! Billing Service

use std::sync::Arc;

use async_trait::async_trait;

use super::access_control::AccessControl;
use super::actor::Actor;
use crate::application::dto::request::BillingQuery;
use crate::domain::services::billing_calculator::{self, BillingSummary};
use crate::domain::{
    EntryFilter, ExpenseRepository, Permissions, RoleRepository, TenantRepository,
    TimesheetRepository, WorkflowStatus,
};
use crate::shared::error::AppError;

/// Upper bound on entries of each kind read for one summary
const BILLING_ENTRY_LIMIT: i64 = 10_000;

/// Billing service trait
#[async_trait]
pub trait BillingService: Send + Sync {
    /// Approved billable work of the caller's tenant over a date range
    async fn summary(&self, actor: &Actor, query: BillingQuery) -> Result<BillingSummary, BillingError>;
}

/// Billing service errors
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Tenant not found")]
    TenantNotFound,

    #[error("from must not be after to")]
    InvalidRange,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<BillingError> for AppError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::TenantNotFound => AppError::NotFound("Tenant not found".into()),
            e @ BillingError::InvalidRange => AppError::validation(e.to_string()),
            BillingError::Store(e) => e,
        }
    }
}

/// BillingService implementation
pub struct BillingServiceImpl<T, E, N, R>
where
    T: TimesheetRepository,
    E: ExpenseRepository,
    N: TenantRepository,
    R: RoleRepository,
{
    timesheet_repo: Arc<T>,
    expense_repo: Arc<E>,
    tenant_repo: Arc<N>,
    access: Arc<AccessControl<R>>,
}

impl<T, E, N, R> BillingServiceImpl<T, E, N, R>
where
    T: TimesheetRepository,
    E: ExpenseRepository,
    N: TenantRepository,
    R: RoleRepository,
{
    pub fn new(
        timesheet_repo: Arc<T>,
        expense_repo: Arc<E>,
        tenant_repo: Arc<N>,
        access: Arc<AccessControl<R>>,
    ) -> Self {
        Self {
            timesheet_repo,
            expense_repo,
            tenant_repo,
            access,
        }
    }
}

fn matches_client(name: Option<&str>, client: Option<&str>) -> bool {
    match client {
        Some(wanted) => name.is_some_and(|n| n.trim().eq_ignore_ascii_case(wanted.trim())),
        None => true,
    }
}

#[async_trait]
impl<T, E, N, R> BillingService for BillingServiceImpl<T, E, N, R>
where
    T: TimesheetRepository + 'static,
    E: ExpenseRepository + 'static,
    N: TenantRepository + 'static,
    R: RoleRepository + 'static,
{
    async fn summary(&self, actor: &Actor, query: BillingQuery) -> Result<BillingSummary, BillingError> {
        self.access
            .authorize(actor, Permissions::VIEW_BILLING, actor.tenant_scope())
            .await?;

        if query.from > query.to {
            return Err(BillingError::InvalidRange);
        }

        let tenant = self
            .tenant_repo
            .find_by_id(actor.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;

        let filter = EntryFilter {
            user_id: None,
            status: Some(WorkflowStatus::Approved),
            from: Some(query.from),
            to: Some(query.to),
            limit: BILLING_ENTRY_LIMIT,
        };
        let client = query.client.as_deref();

        let timesheets: Vec<_> = self
            .timesheet_repo
            .list(actor.tenant_id, filter.clone())
            .await?
            .into_iter()
            .filter(|e| matches_client(Some(&e.client_name), client))
            .collect();
        let expenses: Vec<_> = self
            .expense_repo
            .list(actor.tenant_id, filter)
            .await?
            .into_iter()
            .filter(|e| matches_client(e.client_name.as_deref(), client))
            .collect();

        Ok(billing_calculator::summarize(tenant.province, &timesheets, &expenses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::access_control::test_support::access_with_role;
    use crate::domain::entities::fixtures::timesheet::entry;
    use crate::domain::entities::mocks::{
        MockExpenseRepository, MockRoleRepository, MockTenantRepository, MockTimesheetRepository,
    };
    use crate::domain::{Province, Role, Tenant, TenantPlan};
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;

    const TENANT: i64 = 1;

    type Service = BillingServiceImpl<
        MockTimesheetRepository,
        MockExpenseRepository,
        MockTenantRepository,
        MockRoleRepository,
    >;

    fn tenants(province: Province) -> MockTenantRepository {
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |id| {
            let now = Utc::now();
            Ok(Some(Tenant {
                id,
                name: "Acme".into(),
                slug: "acme".into(),
                province,
                plan: TenantPlan::Professional,
                max_users: 50,
                is_active: true,
                created_at: now,
                updated_at: now,
            }))
        });
        tenants
    }

    fn service(role: Role) -> Service {
        let mut timesheets = MockTimesheetRepository::new();
        timesheets
            .expect_list()
            .withf(|_, f| f.status == Some(WorkflowStatus::Approved))
            .returning(|_, _| {
                let mut a = entry(1, 7, (8, 0), (12, 0));
                a.status = WorkflowStatus::Approved;
                let mut b = entry(2, 7, (13, 0), (15, 0));
                b.status = WorkflowStatus::Approved;
                b.client_name = "Client B".into();
                Ok(vec![a, b])
            });
        let mut expenses = MockExpenseRepository::new();
        expenses.expect_list().returning(|_, _| Ok(vec![]));

        BillingServiceImpl::new(
            Arc::new(timesheets),
            Arc::new(expenses),
            Arc::new(tenants(Province::ON)),
            access_with_role(TENANT, role),
        )
    }

    fn query(client: Option<&str>) -> BillingQuery {
        BillingQuery {
            from: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            client: client.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_summary_uses_tenant_province() {
        let summary = service(Role::TenantAdmin)
            .summary(&Actor::new(40, TENANT), query(None))
            .await
            .unwrap();

        assert_eq!(summary.province, Province::ON);
        assert_eq!(summary.clients.len(), 2);
        // 6h at 50.00
        assert_eq!(summary.labour_cents, 30_000);
        assert_eq!(summary.taxes.len(), 1);
        assert_eq!(summary.tax_cents, 3_900);
        assert_eq!(summary.total_cents, 33_900);
    }

    #[tokio::test]
    async fn test_summary_client_filter_is_case_insensitive() {
        let summary = service(Role::Auditor)
            .summary(&Actor::new(50, TENANT), query(Some("client b")))
            .await
            .unwrap();
        assert_eq!(summary.clients.len(), 1);
        assert_eq!(summary.labour_cents, 10_000);
    }

    #[tokio::test]
    async fn test_worker_cannot_view_billing() {
        let err = service(Role::Worker)
            .summary(&Actor::new(7, TENANT), query(None))
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_inverted_range() {
        let mut q = query(None);
        std::mem::swap(&mut q.from, &mut q.to);
        let err = service(Role::TenantAdmin)
            .summary(&Actor::new(40, TENANT), q)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidRange));
    }
}
