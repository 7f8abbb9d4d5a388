//! AST/JSA form entity and repository trait.
//!
//! Maps to the `ast_forms` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::WorkflowStatus;
use crate::shared::error::AppError;

/// Risk rating of an identified hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A hazard identified for the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub description: String,
    pub risk_level: RiskLevel,
}

/// Level in the hierarchy of controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Elimination,
    Substitution,
    Engineering,
    Administrative,
    Ppe,
}

/// A measure that reduces a hazard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMeasure {
    pub description: String,
    pub control_type: ControlType,
    #[serde(default)]
    pub responsible: Option<String>,
}

/// An energy-isolation (LOTO) point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockoutPoint {
    pub equipment: String,
    /// electrical, hydraulic, pneumatic, thermal, ...
    pub energy_type: String,
    pub isolation_device: String,
    /// Zero-energy verification performed
    #[serde(default)]
    pub verified: bool,
}

/// A worker taking part in the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub trade: Option<String>,
    /// Worker signed the analysis
    #[serde(default)]
    pub signed: bool,
}

/// A job safety analysis form.
///
/// Structured sections are stored as JSONB columns; anything else the form
/// wizard collects lives in `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstForm {
    pub id: i64,
    pub tenant_id: i64,

    /// Human-facing number, e.g. `AST-2026-00042`
    pub form_number: String,

    /// Author
    pub created_by: i64,

    pub client_name: String,
    pub work_location: String,
    pub task_description: String,
    pub work_date: NaiveDate,

    pub status: WorkflowStatus,

    pub hazards: Vec<Hazard>,
    pub controls: Vec<ControlMeasure>,
    pub lockout_points: Vec<LockoutPoint>,
    pub team_members: Vec<TeamMember>,

    /// Free-form wizard data (sanitized)
    pub payload: serde_json::Value,

    pub rejection_reason: Option<String>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AstForm {
    /// Format a form number from its year and per-tenant sequence.
    pub fn format_number(year: i32, sequence: i64) -> String {
        format!("AST-{}-{:05}", year, sequence)
    }

    /// Reasons this form cannot be submitted yet (empty when ready).
    pub fn submission_blockers(&self) -> Vec<String> {
        let mut blockers = Vec::new();
        if self.hazards.is_empty() {
            blockers.push("at least one hazard must be identified".to_string());
        }
        if self.controls.is_empty() {
            blockers.push("at least one control measure is required".to_string());
        }
        if self.team_members.is_empty() {
            blockers.push("at least one team member is required".to_string());
        }
        for point in self.lockout_points.iter().filter(|p| !p.verified) {
            blockers.push(format!(
                "lockout point '{}' has not been verified",
                point.equipment
            ));
        }
        blockers
    }

    /// Highest risk level among the hazards.
    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.hazards
            .iter()
            .map(|h| h.risk_level)
            .max_by_key(|level| match level {
                RiskLevel::Low => 0,
                RiskLevel::Medium => 1,
                RiskLevel::High => 2,
                RiskLevel::Critical => 3,
            })
    }
}

/// Listing filter for forms.
#[derive(Debug, Clone, Default)]
pub struct FormFilter {
    pub status: Option<WorkflowStatus>,
    /// Restrict to a single author
    pub created_by: Option<i64>,
    /// Cursor: only IDs strictly lower than this
    pub before: Option<i64>,
    pub limit: i64,
}

/// Repository trait for AST forms. Every call is tenant-scoped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AstFormRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<AstForm>, AppError>;

    /// Newest first.
    async fn list(&self, tenant_id: i64, filter: FormFilter) -> Result<Vec<AstForm>, AppError>;

    async fn create(&self, form: &AstForm) -> Result<AstForm, AppError>;

    async fn update(&self, form: &AstForm) -> Result<AstForm, AppError>;

    async fn delete(&self, tenant_id: i64, id: i64) -> Result<(), AppError>;

    /// Atomically allocate the next form sequence for a tenant and year.
    async fn next_sequence(&self, tenant_id: i64, year: i32) -> Result<i64, AppError>;
}


#[cfg(test)]
mod tests {
    use super::fixtures::form;
    use super::*;

    #[test]
    fn test_form_number_is_zero_padded() {
        assert_eq!(AstForm::format_number(2026, 42), "AST-2026-00042");
    }

    #[test]
    fn test_complete_form_has_no_blockers() {
        let form = form(1, 1, 1, WorkflowStatus::Draft);
        assert!(form.submission_blockers().is_empty());
    }

    #[test]
    fn test_unverified_lockout_blocks_submission() {
        let mut form = form(1, 1, 1, WorkflowStatus::Draft);
        form.lockout_points.push(LockoutPoint {
            equipment: "Pompe P-101".into(),
            energy_type: "electrical".into(),
            isolation_device: "Sectionneur".into(),
            verified: false,
        });
        let blockers = form.submission_blockers();
        assert_eq!(blockers.len(), 1);
        assert!(blockers[0].contains("Pompe P-101"));
    }

    #[test]
    fn test_empty_form_lists_every_blocker() {
        let mut form = form(1, 1, 1, WorkflowStatus::Draft);
        form.hazards.clear();
        form.controls.clear();
        form.team_members.clear();
        assert_eq!(form.submission_blockers().len(), 3);
    }

    #[test]
    fn test_max_risk() {
        let mut form = form(1, 1, 1, WorkflowStatus::Draft);
        form.hazards.push(Hazard {
            description: "Espace clos".into(),
            risk_level: RiskLevel::Critical,
        });
        assert_eq!(form.max_risk(), Some(RiskLevel::Critical));
    }
}
