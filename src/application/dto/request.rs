//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::services::volume_calculator::SpaceGeometry;
use crate::domain::{ControlMeasure, Hazard, LockoutPoint, TeamMember};

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("valid regex"));

// --- Auth ---

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request (also used for logout)
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

// --- Tenants & users ---

/// Create tenant request (super admin)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: String,

    #[validate(
        length(min = 3, max = 64, message = "Slug must be 3-64 characters"),
        regex(path = *SLUG_REGEX, message = "Slug may only contain lowercase letters, digits and dashes")
    )]
    pub slug: String,

    #[validate(length(equal = 2, message = "Province must be a 2-letter code"))]
    pub province: String,

    pub plan: Option<String>,

    #[validate(range(min = 1, max = 100000, message = "max_users must be positive"))]
    pub max_users: Option<i32>,

    #[validate(email(message = "Invalid admin email format"))]
    pub admin_email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub admin_password: String,

    #[validate(length(min = 1, max = 200, message = "Full name must be 1-200 characters"))]
    pub admin_full_name: String,
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 200, message = "Full name must be 1-200 characters"))]
    pub full_name: String,

    #[validate(length(max = 50, message = "Employee number must be at most 50 characters"))]
    pub employee_number: Option<String>,

    #[validate(range(min = 0, message = "Hourly rate cannot be negative"))]
    #[serde(default)]
    pub hourly_rate_cents: i64,

    /// Role names; defaults to `worker`
    #[serde(default)]
    pub roles: Vec<String>,
}

/// One role grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrantRequest {
    pub role: String,
    #[serde(default)]
    pub allow: i64,
    #[serde(default)]
    pub deny: i64,
}

/// Replace a user's roles in the current tenant
#[derive(Debug, Deserialize, Validate)]
pub struct SetRolesRequest {
    #[validate(length(max = 10, message = "At most 10 role grants"))]
    pub roles: Vec<RoleGrantRequest>,
}

// --- AST forms ---

/// Create or replace an AST form
#[derive(Debug, Deserialize, Validate)]
pub struct AstFormRequest {
    #[validate(length(min = 1, max = 200, message = "Client name must be 1-200 characters"))]
    pub client_name: String,

    #[validate(length(min = 1, max = 300, message = "Work location must be 1-300 characters"))]
    pub work_location: String,

    #[validate(length(min = 1, max = 5000, message = "Task description must be 1-5000 characters"))]
    pub task_description: String,

    pub work_date: NaiveDate,

    #[serde(default)]
    pub hazards: Vec<Hazard>,

    #[serde(default)]
    pub controls: Vec<ControlMeasure>,

    #[serde(default)]
    pub lockout_points: Vec<LockoutPoint>,

    #[serde(default)]
    pub team_members: Vec<TeamMember>,

    /// Free-form extra sections
    pub payload: Option<serde_json::Value>,
}

/// Form list query parameters
#[derive(Debug, Deserialize)]
pub struct FormListQuery {
    pub status: Option<String>,
    pub before: Option<String>,
    pub limit: Option<i64>,
}

/// Rejection of a submitted record
#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(min = 1, max = 1000, message = "A rejection reason is required"))]
    pub reason: String,
}

// --- Timesheets & expenses ---

/// Create or replace a timesheet entry
#[derive(Debug, Deserialize, Validate)]
pub struct TimesheetRequest {
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,

    #[validate(range(min = 0, max = 720, message = "Break must be 0-720 minutes"))]
    #[serde(default)]
    pub break_minutes: i32,

    #[validate(length(max = 200, message = "Project must be at most 200 characters"))]
    pub project: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Client name must be 1-200 characters"))]
    pub client_name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub billable: Option<bool>,
}

/// Create or replace an expense entry
#[derive(Debug, Deserialize, Validate)]
pub struct ExpenseRequest {
    pub expense_date: NaiveDate,

    pub category: String,

    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub description: String,

    /// Required for every category except mileage
    pub amount_cents: Option<i64>,

    /// Required for mileage
    pub distance_km: Option<f64>,

    #[validate(url(message = "Receipt must be a valid URL"))]
    pub receipt_url: Option<String>,

    pub billable: Option<bool>,

    #[validate(length(max = 200, message = "Client name must be at most 200 characters"))]
    pub client_name: Option<String>,
}

/// Timesheet / expense list query parameters
#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

/// Weekly timesheet summary query
#[derive(Debug, Deserialize)]
pub struct WeeklySummaryQuery {
    /// Defaults to the caller
    pub user_id: Option<String>,
    /// Any day of the week; normalized to Monday
    pub week_start: NaiveDate,
}

// --- Permits ---

/// Create a confined-space permit
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePermitRequest {
    pub province: String,

    #[validate(length(min = 1, max = 2000, message = "Space description must be 1-2000 characters"))]
    pub space_description: String,

    pub geometry: SpaceGeometry,

    #[serde(default)]
    pub hazards: Vec<String>,

    #[serde(default)]
    pub entrants: Vec<String>,

    pub attendant: Option<String>,
    pub supervisor: Option<String>,

    #[serde(default)]
    pub rescue_plan: bool,
    #[serde(default)]
    pub entrants_trained: bool,
    #[serde(default)]
    pub energy_isolation_confirmed: bool,
    #[serde(default)]
    pub continuous_ventilation: bool,

    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,

    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
}

/// Record an atmospheric reading
#[derive(Debug, Deserialize, Validate)]
pub struct ReadingRequest {
    #[validate(length(min = 1, max = 200, message = "taken_by is required"))]
    pub taken_by: String,

    /// Defaults to now
    pub taken_at: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, max = 100.0, message = "Oxygen must be 0-100%"))]
    pub oxygen_percent: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "LEL must be 0-100%"))]
    pub lel_percent: f64,

    #[validate(range(min = 0.0, message = "H2S cannot be negative"))]
    pub h2s_ppm: f64,

    #[validate(range(min = 0.0, message = "CO cannot be negative"))]
    pub co_ppm: f64,
}

/// Permit list query parameters
#[derive(Debug, Deserialize)]
pub struct PermitListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

// --- Billing & audit ---

/// Billing summary query
#[derive(Debug, Deserialize)]
pub struct BillingQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub client: Option<String>,
}

/// Audit log query
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

// --- Tools ---

/// Journal analysis request
#[derive(Debug, Deserialize, Validate)]
pub struct JournalRequest {
    #[validate(length(min = 1, max = 20000, message = "Text must be 1-20000 characters"))]
    pub text: String,
}
