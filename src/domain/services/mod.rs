//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong
//! to a single entity. They are pure functions over domain entities.
//!
//! ## Services
//!
//! - **PermissionService**: RBAC evaluation over role assignments
//! - **compliance**: Provincial confined-space tables and permit evaluation
//! - **volume_calculator**: Confined-space geometry
//! - **timesheet_calculator**: Shift hours and weekly overtime
//! - **billing_calculator**: Client billing with provincial sales taxes
//! - **journal_processor**: Work-journal keyword classification

pub mod billing_calculator;
pub mod compliance;
pub mod journal_processor;
mod permission_service;
pub mod timesheet_calculator;
pub mod volume_calculator;

pub use permission_service::*;
