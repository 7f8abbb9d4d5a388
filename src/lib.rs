//! # C-Secur360 Library
//!
//! This crate provides a multi-tenant workplace safety backend with:
//! - AST (job safety analysis) forms with an approval workflow
//! - Confined-space entry permits checked against provincial regulations
//! - Timesheets, expenses and billing summaries with Canadian sales taxes
//! - Role-based access control and an audit log per tenant
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, value objects, repository traits and pure calculators
//! - **Application Layer**: Use-case services and DTOs
//! - **Infrastructure Layer**: PostgreSQL repositories, Redis cache, metrics
//! - **Presentation Layer**: HTTP handlers, routes and middleware
//!
//! ## Module Structure
//!
//! ```text
//! csecur360/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, calculators, repository traits
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Database, cache and metrics
//! +-- presentation/   HTTP routes, handlers and middleware
//! +-- shared/         Errors, snowflake IDs, sanitizer, validation
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
