//! # Domain Layer
//!
//! The domain layer contains the core business rules of the safety platform.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (Tenant, User, AstForm, Permit, etc.)
//! - **value_objects**: Immutable value types (Permissions, WorkflowStatus, Province)
//! - **services**: Domain services for calculations and rule evaluation
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Every tenant-owned lookup takes the tenant id

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
