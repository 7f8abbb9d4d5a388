//! Approval workflow shared by AST forms, timesheets and expenses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an approvable record.
///
/// ```text
/// draft -> submitted -> approved -> locked
///              |
///              v
///          rejected -> draft
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
    Locked,
}

/// Error for an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown workflow status: {0}")]
pub struct UnknownStatus(pub String);

/// Error for a transition the workflow does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
}

impl WorkflowStatus {
    /// Convert from database string representation.
    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "locked" => Ok(Self::Locked),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Locked => "locked",
        }
    }

    /// Whether the record content may still be changed.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Rejected, Draft)
                | (Approved, Locked)
        )
    }

    /// Validate and perform a transition.
    pub fn transition(self, next: WorkflowStatus) -> Result<WorkflowStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowStatus::*;
    use super::*;
    use test_case::test_case;

    #[test_case(Draft, Submitted ; "submit")]
    #[test_case(Submitted, Approved ; "approve")]
    #[test_case(Submitted, Rejected ; "reject")]
    #[test_case(Rejected, Draft ; "revise")]
    #[test_case(Approved, Locked ; "lock")]
    fn test_allowed_transitions(from: WorkflowStatus, to: WorkflowStatus) {
        assert_eq!(from.transition(to), Ok(to));
    }

    #[test_case(Draft, Approved ; "skip submission")]
    #[test_case(Locked, Draft ; "reopen locked")]
    #[test_case(Approved, Draft ; "edit approved")]
    #[test_case(Submitted, Locked ; "lock unapproved")]
    #[test_case(Rejected, Approved ; "approve rejected")]
    fn test_forbidden_transitions(from: WorkflowStatus, to: WorkflowStatus) {
        assert_eq!(from.transition(to), Err(InvalidTransition { from, to }));
    }

    #[test]
    fn test_editable_states() {
        assert!(Draft.is_editable());
        assert!(Rejected.is_editable());
        assert!(!Submitted.is_editable());
        assert!(!Approved.is_editable());
        assert!(!Locked.is_editable());
    }

    #[test]
    fn test_parse_unknown_is_error() {
        assert_eq!(WorkflowStatus::parse("SUBMITTED"), Ok(Submitted));
        assert!(WorkflowStatus::parse("archived").is_err());
    }
}
