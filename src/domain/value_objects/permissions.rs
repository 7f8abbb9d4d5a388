//! Permission flags, roles and authorization scopes.
//!
//! Permissions are represented as a 64-bit bitfield where each bit
//! represents a specific capability inside a tenant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit permission bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub i64);

impl Permissions {
    // AST/JSA forms
    /// View safety analysis forms
    pub const VIEW_FORMS: i64 = 1 << 0;
    /// Create and edit safety analysis forms
    pub const EDIT_FORMS: i64 = 1 << 1;
    /// Approve, reject and lock safety analysis forms
    pub const APPROVE_FORMS: i64 = 1 << 2;

    // Time tracking
    /// View timesheet entries
    pub const VIEW_TIMESHEETS: i64 = 1 << 3;
    /// Create and edit timesheet entries
    pub const EDIT_TIMESHEETS: i64 = 1 << 4;
    /// Approve or reject timesheet entries
    pub const APPROVE_TIMESHEETS: i64 = 1 << 5;

    // Expenses
    /// View expense entries
    pub const VIEW_EXPENSES: i64 = 1 << 6;
    /// Create and edit expense entries
    pub const EDIT_EXPENSES: i64 = 1 << 7;
    /// Approve or reject expense entries
    pub const APPROVE_EXPENSES: i64 = 1 << 8;

    // Confined-space permits
    /// View permits and their compliance reports
    pub const VIEW_PERMITS: i64 = 1 << 9;
    /// Draft permits and record atmospheric readings
    pub const EDIT_PERMITS: i64 = 1 << 10;
    /// Activate, close and cancel permits
    pub const ISSUE_PERMITS: i64 = 1 << 11;

    // Administration
    /// View billing summaries
    pub const VIEW_BILLING: i64 = 1 << 12;
    /// Manage billing settings
    pub const MANAGE_BILLING: i64 = 1 << 13;
    /// View the audit log
    pub const VIEW_AUDIT_LOG: i64 = 1 << 14;
    /// Create users and assign roles
    pub const MANAGE_USERS: i64 = 1 << 15;
    /// Act on records owned by other users of the tenant
    pub const ACCESS_ALL_RECORDS: i64 = 1 << 16;
    /// Every permission inside the tenant
    pub const ADMINISTRATOR: i64 = 1 << 30;

    /// All permissions combined
    pub const ALL: i64 = Self::VIEW_FORMS
        | Self::EDIT_FORMS
        | Self::APPROVE_FORMS
        | Self::VIEW_TIMESHEETS
        | Self::EDIT_TIMESHEETS
        | Self::APPROVE_TIMESHEETS
        | Self::VIEW_EXPENSES
        | Self::EDIT_EXPENSES
        | Self::APPROVE_EXPENSES
        | Self::VIEW_PERMITS
        | Self::EDIT_PERMITS
        | Self::ISSUE_PERMITS
        | Self::VIEW_BILLING
        | Self::MANAGE_BILLING
        | Self::VIEW_AUDIT_LOG
        | Self::MANAGE_USERS
        | Self::ACCESS_ALL_RECORDS
        | Self::ADMINISTRATOR;

    /// Create a new empty permission set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create from raw bits.
    pub const fn from_bits(bits: i64) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    pub const fn bits(&self) -> i64 {
        self.0
    }

    /// Check if all the given bits are set. Administrator implies everything.
    pub const fn has(&self, permission: i64) -> bool {
        if self.0 & Self::ADMINISTRATOR != 0 {
            return true;
        }
        self.0 & permission == permission
    }

    /// Check if the Administrator bit is set.
    pub const fn is_admin(&self) -> bool {
        self.0 & Self::ADMINISTRATOR != 0
    }

    /// Add permissions.
    pub const fn add(self, permission: i64) -> Self {
        Self(self.0 | permission)
    }

    /// Remove permissions.
    pub const fn remove(self, permission: i64) -> Self {
        Self(self.0 & !permission)
    }

    /// Apply an allow/deny pair on top of this set. Deny wins.
    pub const fn apply_overrides(self, allow: i64, deny: i64) -> Self {
        Self((self.0 | allow) & !deny)
    }

    /// Human-readable names of the set bits, for API responses.
    pub fn names(&self) -> Vec<&'static str> {
        PERMISSION_NAMES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

const PERMISSION_NAMES: &[(i64, &str)] = &[
    (Permissions::VIEW_FORMS, "forms:view"),
    (Permissions::EDIT_FORMS, "forms:edit"),
    (Permissions::APPROVE_FORMS, "forms:approve"),
    (Permissions::VIEW_TIMESHEETS, "timesheets:view"),
    (Permissions::EDIT_TIMESHEETS, "timesheets:edit"),
    (Permissions::APPROVE_TIMESHEETS, "timesheets:approve"),
    (Permissions::VIEW_EXPENSES, "expenses:view"),
    (Permissions::EDIT_EXPENSES, "expenses:edit"),
    (Permissions::APPROVE_EXPENSES, "expenses:approve"),
    (Permissions::VIEW_PERMITS, "permits:view"),
    (Permissions::EDIT_PERMITS, "permits:edit"),
    (Permissions::ISSUE_PERMITS, "permits:issue"),
    (Permissions::VIEW_BILLING, "billing:view"),
    (Permissions::MANAGE_BILLING, "billing:manage"),
    (Permissions::VIEW_AUDIT_LOG, "audit:view"),
    (Permissions::MANAGE_USERS, "users:manage"),
    (Permissions::ACCESS_ALL_RECORDS, "records:all"),
    (Permissions::ADMINISTRATOR, "administrator"),
];

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Permissions {
    fn from(bits: i64) -> Self {
        Self(bits)
    }
}

/// Built-in roles. Each grants a default permission set within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator; assignments are global
    SuperAdmin,
    /// Customer administrator
    TenantAdmin,
    /// Field supervisor: approves work and issues permits
    Supervisor,
    /// Field worker
    Worker,
    /// Read-only compliance reviewer
    Auditor,
}

impl Role {
    /// Default permission bits granted by this role.
    pub const fn default_permissions(&self) -> i64 {
        match self {
            Role::SuperAdmin | Role::TenantAdmin => Permissions::ADMINISTRATOR,
            Role::Supervisor => {
                Role::Worker.default_permissions()
                    | Permissions::APPROVE_FORMS
                    | Permissions::APPROVE_TIMESHEETS
                    | Permissions::APPROVE_EXPENSES
                    | Permissions::EDIT_PERMITS
                    | Permissions::ISSUE_PERMITS
                    | Permissions::ACCESS_ALL_RECORDS
            }
            Role::Worker => {
                Permissions::VIEW_FORMS
                    | Permissions::EDIT_FORMS
                    | Permissions::VIEW_TIMESHEETS
                    | Permissions::EDIT_TIMESHEETS
                    | Permissions::VIEW_EXPENSES
                    | Permissions::EDIT_EXPENSES
                    | Permissions::VIEW_PERMITS
            }
            Role::Auditor => {
                Permissions::VIEW_FORMS
                    | Permissions::VIEW_TIMESHEETS
                    | Permissions::VIEW_EXPENSES
                    | Permissions::VIEW_PERMITS
                    | Permissions::VIEW_BILLING
                    | Permissions::VIEW_AUDIT_LOG
                    | Permissions::ACCESS_ALL_RECORDS
            }
        }
    }

    /// Convert from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "super_admin" => Some(Self::SuperAdmin),
            "tenant_admin" => Some(Self::TenantAdmin),
            "supervisor" => Some(Self::Supervisor),
            "worker" => Some(Self::Worker),
            "auditor" => Some(Self::Auditor),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::TenantAdmin => "tenant_admin",
            Self::Supervisor => "supervisor",
            Self::Worker => "worker",
            Self::Auditor => "auditor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an authorization check is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Tenant-wide action (listing, creating)
    Tenant { tenant_id: i64 },
    /// Action on a record owned by a specific user
    Record { tenant_id: i64, owner_id: i64 },
}

impl Scope {
    /// Tenant the check applies to.
    pub fn tenant_id(&self) -> i64 {
        match self {
            Scope::Tenant { tenant_id } | Scope::Record { tenant_id, .. } => *tenant_id,
        }
    }
}
