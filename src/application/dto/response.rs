//! Response DTOs
//!
//! Data structures for API response bodies. Snowflake IDs are serialized
//! as strings so JavaScript clients never lose precision.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::application::services::timesheet_service::WeekReport;
use crate::application::services::user_service::UserProfile;
use crate::application::services::AuthTokens;
use crate::domain::services::timesheet_calculator::WeeklySummary;
use crate::domain::services::volume_calculator::SpaceGeometry;
use crate::domain::{
    AstForm, AtmosphericReading, AuditEntry, ControlMeasure, ExpenseCategory, ExpenseEntry, Hazard,
    LockoutPoint, Permissions, Permit, PermitStatus, Province, Role, RoleAssignment, TeamMember,
    Tenant, TenantPlan, TimesheetEntry, User, WorkflowStatus,
};

fn id_opt(id: Option<i64>) -> Option<String> {
    id.map(|id| id.to_string())
}

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// Login response (user and tokens)
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

/// User response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    pub full_name: String,
    pub employee_number: Option<String>,
    pub hourly_rate_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            tenant_id: user.tenant_id.to_string(),
            email: user.email,
            full_name: user.full_name,
            employee_number: user.employee_number,
            hourly_rate_cents: user.hourly_rate_cents,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Role assignment as shown to clients
#[derive(Debug, Serialize)]
pub struct RoleAssignmentResponse {
    pub role: Role,
    /// `None` for platform-wide assignments
    pub tenant_id: Option<String>,
    /// Permission bitfields as strings (for JavaScript BigInt compatibility)
    pub allow: String,
    pub deny: String,
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(a: RoleAssignment) -> Self {
        Self {
            role: a.role,
            tenant_id: id_opt(a.tenant_id),
            allow: a.allow.to_string(),
            deny: a.deny.to_string(),
        }
    }
}

/// Current user with roles and effective permissions
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub roles: Vec<RoleAssignmentResponse>,
    pub permissions: String,
    pub permission_names: Vec<&'static str>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            user: profile.user.into(),
            roles: profile.roles.into_iter().map(Into::into).collect(),
            permissions: profile.permissions.to_string(),
            permission_names: Permissions::from_bits(profile.permissions).names(),
        }
    }
}

/// Tenant response
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub province: Province,
    pub plan: TenantPlan,
    pub max_users: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats_used: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TenantResponse {
    pub fn new(tenant: Tenant, seats_used: Option<i64>) -> Self {
        Self {
            id: tenant.id.to_string(),
            name: tenant.name,
            slug: tenant.slug,
            province: tenant.province,
            plan: tenant.plan,
            max_users: tenant.max_users,
            seats_used,
            is_active: tenant.is_active,
            created_at: tenant.created_at,
        }
    }
}

/// Tenant creation response (tenant and its first administrator)
#[derive(Debug, Serialize)]
pub struct TenantCreatedResponse {
    pub tenant: TenantResponse,
    pub admin: UserResponse,
}

/// AST form response
#[derive(Debug, Serialize)]
pub struct AstFormResponse {
    pub id: String,
    pub form_number: String,
    pub created_by: String,
    pub client_name: String,
    pub work_location: String,
    pub task_description: String,
    pub work_date: NaiveDate,
    pub status: WorkflowStatus,
    pub hazards: Vec<Hazard>,
    pub controls: Vec<ControlMeasure>,
    pub lockout_points: Vec<LockoutPoint>,
    pub team_members: Vec<TeamMember>,
    pub payload: serde_json::Value,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AstForm> for AstFormResponse {
    fn from(form: AstForm) -> Self {
        Self {
            id: form.id.to_string(),
            form_number: form.form_number,
            created_by: form.created_by.to_string(),
            client_name: form.client_name,
            work_location: form.work_location,
            task_description: form.task_description,
            work_date: form.work_date,
            status: form.status,
            hazards: form.hazards,
            controls: form.controls,
            lockout_points: form.lockout_points,
            team_members: form.team_members,
            payload: form.payload,
            rejection_reason: form.rejection_reason,
            approved_by: id_opt(form.approved_by),
            approved_at: form.approved_at,
            locked_at: form.locked_at,
            created_at: form.created_at,
            updated_at: form.updated_at,
        }
    }
}

/// Timesheet entry response
#[derive(Debug, Serialize)]
pub struct TimesheetResponse {
    pub id: String,
    pub user_id: String,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_minutes: i32,
    /// Worked hours; absent if the stored shift is no longer valid
    pub hours: Option<f64>,
    pub project: Option<String>,
    pub client_name: String,
    pub description: Option<String>,
    pub hourly_rate_cents: i64,
    pub billable: bool,
    pub status: WorkflowStatus,
    pub approved_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TimesheetEntry> for TimesheetResponse {
    fn from(entry: TimesheetEntry) -> Self {
        Self {
            hours: entry.hours().ok(),
            id: entry.id.to_string(),
            user_id: entry.user_id.to_string(),
            work_date: entry.work_date,
            start_time: entry.start_time,
            end_time: entry.end_time,
            break_minutes: entry.break_minutes,
            project: entry.project,
            client_name: entry.client_name,
            description: entry.description,
            hourly_rate_cents: entry.hourly_rate_cents,
            billable: entry.billable,
            status: entry.status,
            approved_by: id_opt(entry.approved_by),
            rejection_reason: entry.rejection_reason,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// Weekly timesheet summary response
#[derive(Debug, Serialize)]
pub struct WeeklySummaryResponse {
    pub user_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    #[serde(flatten)]
    pub summary: WeeklySummary,
}

impl From<WeekReport> for WeeklySummaryResponse {
    fn from(report: WeekReport) -> Self {
        Self {
            user_id: report.user_id.to_string(),
            week_start: report.week_start,
            week_end: report.week_end,
            summary: report.summary,
        }
    }
}

/// Expense entry response
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: String,
    pub user_id: String,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_cents: i64,
    pub distance_km: Option<f64>,
    pub receipt_url: Option<String>,
    pub billable: bool,
    pub client_name: Option<String>,
    pub status: WorkflowStatus,
    pub approved_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExpenseEntry> for ExpenseResponse {
    fn from(e: ExpenseEntry) -> Self {
        Self {
            id: e.id.to_string(),
            user_id: e.user_id.to_string(),
            expense_date: e.expense_date,
            category: e.category,
            description: e.description,
            amount_cents: e.amount_cents,
            distance_km: e.distance_km,
            receipt_url: e.receipt_url,
            billable: e.billable,
            client_name: e.client_name,
            status: e.status,
            approved_by: id_opt(e.approved_by),
            rejection_reason: e.rejection_reason,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Permit response
#[derive(Debug, Serialize)]
pub struct PermitResponse {
    pub id: String,
    pub permit_number: String,
    pub province: Province,
    pub space_description: String,
    pub geometry: SpaceGeometry,
    pub volume_m3: f64,
    pub hazards: Vec<String>,
    pub entrants: Vec<String>,
    pub attendant: Option<String>,
    pub supervisor: Option<String>,
    pub rescue_plan: bool,
    pub entrants_trained: bool,
    pub energy_isolation_confirmed: bool,
    pub continuous_ventilation: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub readings: Vec<AtmosphericReading>,
    pub notes: Option<String>,
    pub status: PermitStatus,
    pub created_by: String,
    pub issued_by: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Permit> for PermitResponse {
    fn from(p: Permit) -> Self {
        Self {
            id: p.id.to_string(),
            permit_number: p.permit_number,
            province: p.province,
            space_description: p.space_description,
            geometry: p.geometry,
            volume_m3: p.volume_m3,
            hazards: p.hazards,
            entrants: p.entrants,
            attendant: p.attendant,
            supervisor: p.supervisor,
            rescue_plan: p.rescue_plan,
            entrants_trained: p.entrants_trained,
            energy_isolation_confirmed: p.energy_isolation_confirmed,
            continuous_ventilation: p.continuous_ventilation,
            valid_from: p.valid_from,
            valid_until: p.valid_until,
            readings: p.readings,
            notes: p.notes,
            status: p.status,
            created_by: p.created_by.to_string(),
            issued_by: id_opt(p.issued_by),
            issued_at: p.issued_at,
            closed_at: p.closed_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Audit log entry response
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub metadata: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: e.id.to_string(),
            actor_id: id_opt(e.actor_id),
            action: e.action,
            entity_type: e.entity_type,
            entity_id: id_opt(e.entity_id),
            metadata: e.metadata,
            ip_address: e.ip_address,
            user_agent: e.user_agent,
            created_at: e.created_at,
        }
    }
}

/// Sanitizer tool response
#[derive(Debug, Serialize)]
pub struct SanitizeResponse {
    pub sanitized: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_serialize_as_strings() {
        let now = Utc::now();
        let response = AuditEntryResponse::from(AuditEntry {
            id: 1_234_567_890_123_456_789,
            tenant_id: 1,
            actor_id: Some(42),
            action: "ast.submit".into(),
            entity_type: "ast_form".into(),
            entity_id: None,
            metadata: json!({}),
            ip_address: None,
            user_agent: None,
            created_at: now,
        });

        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["id"], json!("1234567890123456789"));
        assert_eq!(value["actor_id"], json!("42"));
        assert_eq!(value["entity_id"], json!(null));
    }

    #[test]
    fn test_profile_lists_permission_names() {
        let now = Utc::now();
        let profile = UserProfile {
            user: User {
                id: 5,
                tenant_id: 1,
                email: "w@acme.example".into(),
                password_hash: "secret".into(),
                full_name: "Worker".into(),
                employee_number: None,
                hourly_rate_cents: 0,
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            roles: vec![],
            permissions: Permissions::VIEW_FORMS | Permissions::EDIT_FORMS,
        };

        let value = serde_json::to_value(ProfileResponse::from(profile)).unwrap();
        assert_eq!(value["id"], json!("5"));
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["permission_names"].as_array().map(Vec::len), Some(2));
    }
}
