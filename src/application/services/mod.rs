//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Login, JWT access tokens, refresh-token rotation
//! - **TenantService**: Tenant provisioning
//! - **UserService**: Users, role assignments and effective permissions
//! - **FormService**: AST forms and their approval workflow
//! - **TimesheetService**: Time entries and weekly overtime summaries
//! - **ExpenseService**: Expense entries and mileage reimbursement
//! - **PermitService**: Confined-space permits and compliance
//! - **BillingService**: Billing summaries with provincial taxes
//!
//! Every service authorizes through [`AccessControl`] and records
//! mutations through [`AuditService`].

pub mod access_control;
pub mod actor;
pub mod audit_service;
pub mod auth_service;
pub mod billing_service;
pub mod expense_service;
pub mod form_service;
pub mod permit_service;
pub mod tenant_service;
pub mod timesheet_service;
pub mod user_service;

pub use access_control::AccessControl;
pub use actor::Actor;
pub use audit_service::{AuditService, MAX_AUDIT_LIMIT};

pub use auth_service::{AuthError, AuthService, AuthServiceImpl, AuthTokens, Claims};
pub use billing_service::{BillingError, BillingService, BillingServiceImpl};
pub use expense_service::{ExpenseError, ExpenseService, ExpenseServiceImpl};
pub use form_service::{FormError, FormService, FormServiceImpl};
pub use permit_service::{PermitError, PermitService, PermitServiceImpl};
pub use tenant_service::{TenantError, TenantService, TenantServiceImpl};
pub use timesheet_service::{TimesheetError, TimesheetService, TimesheetServiceImpl, WeekReport};
pub use user_service::{UserError, UserProfile, UserService, UserServiceImpl};
