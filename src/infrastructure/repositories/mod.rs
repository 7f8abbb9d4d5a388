//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! Every query on tenant-owned data filters on `tenant_id`, so a repository
//! call can never read or modify another tenant's rows.
//!
//! ## Available Repositories
//!
//! - **PgTenantRepository** - Tenants
//! - **PgUserRepository** - User accounts
//! - **PgRoleRepository** - Role assignments
//! - **PgSessionRepository** - Refresh-token sessions
//! - **PgAstFormRepository** - AST forms and per-tenant form counters
//! - **PgTimesheetRepository** / **PgExpenseRepository** - Time and cost entries
//! - **PgPermitRepository** - Confined-space permits
//! - **PgAuditRepository** - Append-only audit log
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use crate::infrastructure::repositories::{PgUserRepository, PgAstFormRepository};
//!
//! let users = PgUserRepository::new(pool.clone());
//! let forms = PgAstFormRepository::new(pool.clone());
//! ```

pub mod ast_form_repository;
pub mod audit_repository;
pub mod expense_repository;
pub mod permit_repository;
pub mod role_repository;
pub mod session_repository;
pub mod tenant_repository;
pub mod timesheet_repository;
pub mod user_repository;

pub use ast_form_repository::PgAstFormRepository;
pub use audit_repository::PgAuditRepository;
pub use expense_repository::PgExpenseRepository;
pub use permit_repository::PgPermitRepository;
pub use role_repository::PgRoleRepository;
pub use session_repository::PgSessionRepository;
pub use tenant_repository::PgTenantRepository;
pub use timesheet_repository::PgTimesheetRepository;
pub use user_repository::PgUserRepository;
