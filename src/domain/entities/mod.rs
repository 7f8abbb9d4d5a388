//! # Domain Entities
//!
//! Core domain entities. All entities map directly to their corresponding
//! database tables.
//!
//! ## Tenancy & identity
//!
//! - **Tenant**: A customer organization
//! - **User**: A person signing in to a tenant
//! - **RoleAssignment**: Role grants (with allow/deny adjustments)
//! - **Session**: Refresh token sessions
//!
//! ## Safety & operations
//!
//! - **AstForm**: Job safety analysis with hazards, controls and LOTO points
//! - **Permit**: Confined-space entry permit with atmospheric readings
//! - **TimesheetEntry** / **ExpenseEntry**: Approvable time and cost records
//! - **AuditEntry**: Append-only mutation log
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer.

mod ast_form;
mod audit_log;
mod expense;
mod permit;
mod role_assignment;
mod session;
mod tenant;
mod timesheet;
mod user;

pub use ast_form::{
    AstForm, AstFormRepository, ControlMeasure, ControlType, FormFilter, Hazard, LockoutPoint,
    RiskLevel, TeamMember,
};
pub use audit_log::{AuditEntry, AuditFilter, AuditRepository};
pub use expense::{ExpenseCategory, ExpenseEntry, ExpenseRepository};
pub use permit::{
    AtmosphericReading, Permit, PermitFilter, PermitRepository, PermitStatus,
    READING_CLOCK_SKEW_MINUTES,
};
pub use role_assignment::{RoleAssignment, RoleRepository};
pub use session::{Session, SessionRepository};
pub use tenant::{Tenant, TenantPlan, TenantRepository};
pub use timesheet::{EntryFilter, TimesheetEntry, TimesheetRepository};
pub use user::{User, UserRepository};

#[cfg(test)]
pub(crate) mod mocks {
    pub use super::ast_form::MockAstFormRepository;
    pub use super::audit_log::MockAuditRepository;
    pub use super::expense::MockExpenseRepository;
    pub use super::permit::MockPermitRepository;
    pub use super::role_assignment::MockRoleRepository;
    pub use super::session::MockSessionRepository;
    pub use super::tenant::MockTenantRepository;
    pub use super::timesheet::MockTimesheetRepository;
    pub use super::user::MockUserRepository;
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) use super::ast_form::fixtures as ast_form;
    pub(crate) use super::permit::fixtures as permit;
    pub(crate) use super::timesheet::fixtures as timesheet;
}
