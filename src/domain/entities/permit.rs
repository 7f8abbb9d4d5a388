//! Confined-space entry permit entity and repository trait.
//!
//! Maps to the `permits` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::services::volume_calculator::SpaceGeometry;
use crate::domain::value_objects::Province;
use crate::shared::error::AppError;

/// Tolerated clock drift between field instruments and the server
pub const READING_CLOCK_SKEW_MINUTES: i64 = 5;

/// Permit lifecycle.
///
/// ```text
/// draft -> active <-> suspended
///   |        |            |
///   v        v            v
/// cancelled closed     cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    #[default]
    Draft,
    Active,
    Suspended,
    Closed,
    Cancelled,
}

impl PermitStatus {
    /// Convert from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "closed" => Some(Self::Closed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: PermitStatus) -> bool {
        use PermitStatus::*;
        matches!(
            (self, next),
            (Draft, Active)
                | (Draft, Cancelled)
                | (Active, Suspended)
                | (Active, Closed)
                | (Suspended, Active)
                | (Suspended, Cancelled)
        )
    }

    /// Closed and cancelled permits are read-only.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

impl std::fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One gas-detector reading taken at the entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericReading {
    pub taken_at: DateTime<Utc>,
    pub taken_by: String,
    pub oxygen_percent: f64,
    pub lel_percent: f64,
    pub h2s_ppm: f64,
    pub co_ppm: f64,
}

/// A confined-space entry permit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permit {
    pub id: i64,
    pub tenant_id: i64,

    /// e.g. `CS-QC-20260302-4821`
    pub permit_number: String,

    pub province: Province,
    pub space_description: String,
    pub geometry: SpaceGeometry,
    /// Derived from `geometry` at creation
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

    /// Oldest first
    pub readings: Vec<AtmosphericReading>,

    pub notes: Option<String>,
    pub status: PermitStatus,

    pub created_by: i64,
    pub issued_by: Option<i64>,
    pub issued_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permit {
    /// Most recent reading as of `now`. Readings dated past the clock skew
    /// tolerance are ignored.
    pub fn latest_reading(&self, now: DateTime<Utc>) -> Option<&AtmosphericReading> {
        let horizon = now + Duration::minutes(READING_CLOCK_SKEW_MINUTES);
        self.readings
            .iter()
            .filter(|r| r.taken_at <= horizon)
            .max_by_key(|r| r.taken_at)
    }

    /// Validity window length in hours.
    pub fn validity_hours(&self) -> f64 {
        (self.valid_until - self.valid_from).num_minutes() as f64 / 60.0
    }
}

/// Listing filter for permits.
#[derive(Debug, Clone, Default)]
pub struct PermitFilter {
    pub status: Option<PermitStatus>,
    pub limit: i64,
}

/// Repository trait for permits. Every call is tenant-scoped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermitRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<Permit>, AppError>;

    /// Newest first.
    async fn list(&self, tenant_id: i64, filter: PermitFilter) -> Result<Vec<Permit>, AppError>;

    async fn create(&self, permit: &Permit) -> Result<Permit, AppError>;

    async fn update(&self, permit: &Permit) -> Result<Permit, AppError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    pub fn reading(taken_at: DateTime<Utc>) -> AtmosphericReading {
        AtmosphericReading {
            taken_at,
            taken_by: "Surveillant".into(),
            oxygen_percent: 20.9,
            lel_percent: 0.0,
            h2s_ppm: 0.0,
            co_ppm: 0.0,
        }
    }

    /// A permit that satisfies every provincial rule at `now`.
    pub fn compliant_permit(province: Province, now: DateTime<Utc>) -> Permit {
        Permit {
            id: 10,
            tenant_id: 1,
            permit_number: "CS-QC-20260302-0001".into(),
            province,
            space_description: "Réservoir R-2".into(),
            geometry: SpaceGeometry::Rectangular {
                length: 3.0,
                width: 2.0,
                height: 2.0,
            },
            volume_m3: 12.0,
            hazards: vec!["Atmosphère toxique".into()],
            entrants: vec!["A. Roy".into()],
            attendant: Some("B. Gagnon".into()),
            supervisor: Some("C. Côté".into()),
            rescue_plan: true,
            entrants_trained: true,
            energy_isolation_confirmed: true,
            continuous_ventilation: true,
            valid_from: now - Duration::hours(1),
            valid_until: now + Duration::hours(7),
            readings: vec![reading(now - Duration::minutes(5))],
            notes: None,
            status: PermitStatus::Draft,
            created_by: 5,
            issued_by: None,
            issued_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_permit_transitions() {
        assert!(PermitStatus::Draft.can_transition_to(PermitStatus::Active));
        assert!(PermitStatus::Active.can_transition_to(PermitStatus::Suspended));
        assert!(PermitStatus::Suspended.can_transition_to(PermitStatus::Active));
        assert!(!PermitStatus::Closed.can_transition_to(PermitStatus::Active));
        assert!(!PermitStatus::Active.can_transition_to(PermitStatus::Cancelled));
        assert!(!PermitStatus::Draft.can_transition_to(PermitStatus::Closed));
    }

    #[test]
    fn test_latest_reading_is_most_recent() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::QC, now);
        let mut late = reading(now);
        late.oxygen_percent = 19.0;
        permit.readings.insert(0, late.clone());
        assert_eq!(permit.latest_reading(now), Some(&late));
    }

    #[test]
    fn test_future_reading_is_ignored() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::QC, now);
        let current = permit.readings[0].clone();
        permit.readings.push(reading(now + Duration::days(365)));
        assert_eq!(permit.latest_reading(now), Some(&current));

        let skewed = reading(now + Duration::minutes(2));
        permit.readings.push(skewed.clone());
        assert_eq!(permit.latest_reading(now), Some(&skewed));
    }

    #[test]
    fn test_validity_hours() {
        let now = Utc::now();
        let mut permit = compliant_permit(Province::ON, now);
        permit.valid_from = now;
        permit.valid_until = now + Duration::minutes(90);
        assert!((permit.validity_hours() - 1.5).abs() < f64::EPSILON);
    }
}
