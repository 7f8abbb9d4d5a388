//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Permissions / Role / Scope**: RBAC bitfield, built-in roles, check scope
//! - **WorkflowStatus**: draft/submitted/approved/rejected/locked lifecycle
//! - **Province**: supported provinces with their sales taxes

mod permissions;
mod province;
mod workflow;

pub use permissions::*;
pub use province::*;
pub use workflow::*;
