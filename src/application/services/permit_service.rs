//! Permit Service
//!
//! Confined-space entry permits: creation, gas readings, and the
//! compliance-gated lifecycle (activate, suspend, close, cancel).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::json;
use tracing::{info, warn};

use super::access_control::AccessControl;
use super::actor::Actor;
use super::audit_service::{clamp_limit, AuditService};
use crate::application::dto::request::{CreatePermitRequest, PermitListQuery, ReadingRequest};
use crate::domain::services::compliance::{self, ComplianceReport};
use crate::domain::services::volume_calculator::VolumeError;
use crate::domain::{
    AtmosphericReading, AuditRepository, Permissions, Permit, PermitFilter, PermitRepository,
    PermitStatus, Province, RoleRepository, READING_CLOCK_SKEW_MINUTES,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::sanitize::{sanitize_opt, sanitize_text};
use crate::shared::snowflake::SnowflakeGenerator;

/// Maximum page size of a permit listing
pub const MAX_PERMIT_LIMIT: i64 = 100;

/// Permit service trait
#[async_trait]
pub trait PermitService: Send + Sync {
    async fn create_permit(
        &self,
        actor: &Actor,
        request: CreatePermitRequest,
    ) -> Result<Permit, PermitError>;

    async fn get_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError>;

    async fn list_permits(
        &self,
        actor: &Actor,
        query: PermitListQuery,
    ) -> Result<Vec<Permit>, PermitError>;

    /// Append a reading; an active permit with an unsafe reading is suspended
    async fn add_reading(
        &self,
        actor: &Actor,
        permit_id: i64,
        request: ReadingRequest,
    ) -> Result<Permit, PermitError>;

    async fn activate_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError>;

    async fn close_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError>;

    async fn cancel_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError>;

    /// Live compliance report of a permit
    async fn compliance_report(
        &self,
        actor: &Actor,
        permit_id: i64,
    ) -> Result<ComplianceReport, PermitError>;
}

/// Permit service errors
#[derive(Debug, thiserror::Error)]
pub enum PermitError {
    #[error("Permit not found")]
    NotFound,

    #[error("Unknown province: {0}")]
    UnknownProvince(String),

    #[error(transparent)]
    InvalidGeometry(#[from] VolumeError),

    #[error("valid_until must be after valid_from")]
    InvalidWindow,

    #[error("Unknown permit status: {0}")]
    UnknownStatus(String),

    #[error("Permit is {0} and can no longer be changed")]
    Terminal(PermitStatus),

    #[error("cannot move permit from {from} to {to}")]
    InvalidTransition { from: PermitStatus, to: PermitStatus },

    #[error("Permit is not compliant")]
    NotCompliant(Box<ComplianceReport>),

    #[error("taken_at cannot be in the future")]
    FutureReading,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<PermitError> for AppError {
    fn from(e: PermitError) -> Self {
        match e {
            PermitError::NotFound => AppError::NotFound("Permit not found".into()),
            e @ (PermitError::Terminal(_) | PermitError::InvalidTransition { .. }) => {
                AppError::Conflict(e.to_string())
            }
            PermitError::NotCompliant(report) => AppError::Unprocessable {
                message: "Permit is not compliant".into(),
                details: serde_json::to_value(&*report).ok(),
            },
            PermitError::Store(e) => e,
            e => AppError::validation(e.to_string()),
        }
    }
}

/// `CS-{PROVINCE}-{YYYYMMDD}-{NNNN}` with a random four-digit suffix
pub fn permit_number(province: Province, at: DateTime<Utc>) -> String {
    let suffix: u16 = rand::rng().random_range(0..10_000);
    format!("CS-{}-{}-{:04}", province.code(), at.format("%Y%m%d"), suffix)
}

fn sanitize_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|item| sanitize_text(item))
        .filter(|item| !item.is_empty())
        .collect()
}

/// PermitService implementation
pub struct PermitServiceImpl<P, R, A>
where
    P: PermitRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    permit_repo: Arc<P>,
    access: Arc<AccessControl<R>>,
    audit: AuditService<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<P, R, A> PermitServiceImpl<P, R, A>
where
    P: PermitRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    pub fn new(
        permit_repo: Arc<P>,
        access: Arc<AccessControl<R>>,
        audit: AuditService<A>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            permit_repo,
            access,
            audit,
            id_generator,
        }
    }

    async fn load(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError> {
        self.permit_repo
            .find_by_id(actor.tenant_id, permit_id)
            .await?
            .ok_or(PermitError::NotFound)
    }

    async fn transition(
        &self,
        actor: &Actor,
        mut permit: Permit,
        to: PermitStatus,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<Permit, PermitError> {
        let from = permit.status;
        if !from.can_transition_to(to) {
            return Err(PermitError::InvalidTransition { from, to });
        }
        permit.status = to;
        permit.updated_at = now;

        let saved = self.permit_repo.update(&permit).await?;
        metrics::record_transition("permit", to.as_str());
        self.audit
            .record(
                actor,
                action,
                "permit",
                Some(saved.id),
                json!({ "from": from, "to": to, "permit_number": saved.permit_number }),
            )
            .await;
        info!(tenant_id = actor.tenant_id, permit_id = saved.id, from = %from, to = %to, "Permit status changed");
        Ok(saved)
    }
}

#[async_trait]
impl<P, R, A> PermitService for PermitServiceImpl<P, R, A>
where
    P: PermitRepository + 'static,
    R: RoleRepository + 'static,
    A: AuditRepository + 'static,
{
    async fn create_permit(
        &self,
        actor: &Actor,
        request: CreatePermitRequest,
    ) -> Result<Permit, PermitError> {
        self.access
            .authorize(actor, Permissions::EDIT_PERMITS, actor.tenant_scope())
            .await?;

        let province = Province::parse(&request.province)
            .map_err(|_| PermitError::UnknownProvince(request.province.clone()))?;
        let volume = request.geometry.volume()?;
        if request.valid_until <= request.valid_from {
            return Err(PermitError::InvalidWindow);
        }

        let now = Utc::now();
        let permit = Permit {
            id: self.id_generator.generate(),
            tenant_id: actor.tenant_id,
            permit_number: permit_number(province, now),
            province,
            space_description: sanitize_text(&request.space_description),
            geometry: request.geometry,
            volume_m3: volume.cubic_meters,
            hazards: sanitize_list(request.hazards),
            entrants: sanitize_list(request.entrants),
            attendant: sanitize_opt(request.attendant),
            supervisor: sanitize_opt(request.supervisor),
            rescue_plan: request.rescue_plan,
            entrants_trained: request.entrants_trained,
            energy_isolation_confirmed: request.energy_isolation_confirmed,
            continuous_ventilation: request.continuous_ventilation,
            valid_from: request.valid_from,
            valid_until: request.valid_until,
            readings: Vec::new(),
            notes: sanitize_opt(request.notes),
            status: PermitStatus::Draft,
            created_by: actor.user_id,
            issued_by: None,
            issued_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        let saved = self.permit_repo.create(&permit).await?;
        self.audit
            .record(
                actor,
                "permit.create",
                "permit",
                Some(saved.id),
                json!({
                    "permit_number": saved.permit_number,
                    "province": saved.province.code(),
                    "volume_m3": saved.volume_m3,
                }),
            )
            .await;
        info!(tenant_id = actor.tenant_id, permit_id = saved.id, permit_number = %saved.permit_number, "Permit created");
        Ok(saved)
    }

    async fn get_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError> {
        self.access
            .authorize(actor, Permissions::VIEW_PERMITS, actor.tenant_scope())
            .await?;
        self.load(actor, permit_id).await
    }

    async fn list_permits(
        &self,
        actor: &Actor,
        query: PermitListQuery,
    ) -> Result<Vec<Permit>, PermitError> {
        self.access
            .authorize(actor, Permissions::VIEW_PERMITS, actor.tenant_scope())
            .await?;

        let status = query
            .status
            .as_deref()
            .map(|s| PermitStatus::parse(s).ok_or_else(|| PermitError::UnknownStatus(s.to_string())))
            .transpose()?;
        let filter = PermitFilter {
            status,
            limit: clamp_limit(query.limit.unwrap_or(0), MAX_PERMIT_LIMIT),
        };
        Ok(self.permit_repo.list(actor.tenant_id, filter).await?)
    }

    async fn add_reading(
        &self,
        actor: &Actor,
        permit_id: i64,
        request: ReadingRequest,
    ) -> Result<Permit, PermitError> {
        self.access
            .authorize(actor, Permissions::EDIT_PERMITS, actor.tenant_scope())
            .await?;

        let mut permit = self.load(actor, permit_id).await?;
        if permit.status.is_terminal() {
            return Err(PermitError::Terminal(permit.status));
        }

        let now = Utc::now();
        let taken_at = request.taken_at.unwrap_or(now);
        if taken_at > now + Duration::minutes(READING_CLOCK_SKEW_MINUTES) {
            return Err(PermitError::FutureReading);
        }
        let reading = AtmosphericReading {
            taken_at,
            taken_by: sanitize_text(&request.taken_by),
            oxygen_percent: request.oxygen_percent,
            lel_percent: request.lel_percent,
            h2s_ppm: request.h2s_ppm,
            co_ppm: request.co_ppm,
        };
        let violations = compliance::reading_violations(&reading, compliance::rules_for(permit.province));
        permit.readings.push(reading);
        permit.updated_at = now;

        if permit.status == PermitStatus::Active && !violations.is_empty() {
            let codes: Vec<&str> = violations.iter().map(|v| v.code).collect();
            warn!(
                tenant_id = actor.tenant_id,
                permit_id = permit.id,
                violations = ?codes,
                "Unsafe atmosphere, suspending permit"
            );
            return self
                .transition(actor, permit, PermitStatus::Suspended, "permit.suspend", now)
                .await;
        }

        let saved = self.permit_repo.update(&permit).await?;
        self.audit
            .record(
                actor,
                "permit.reading",
                "permit",
                Some(saved.id),
                json!({ "violations": violations.len() }),
            )
            .await;
        Ok(saved)
    }

    async fn activate_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError> {
        self.access
            .authorize(actor, Permissions::ISSUE_PERMITS, actor.tenant_scope())
            .await?;

        let mut permit = self.load(actor, permit_id).await?;
        if !permit.status.can_transition_to(PermitStatus::Active) {
            return Err(PermitError::InvalidTransition {
                from: permit.status,
                to: PermitStatus::Active,
            });
        }

        let now = Utc::now();
        let report = compliance::evaluate(&permit, compliance::rules_for(permit.province), now);
        if !report.compliant {
            return Err(PermitError::NotCompliant(Box::new(report)));
        }

        permit.issued_by = Some(actor.user_id);
        permit.issued_at = Some(now);
        self.transition(actor, permit, PermitStatus::Active, "permit.activate", now)
            .await
    }

    async fn close_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError> {
        self.access
            .authorize(actor, Permissions::ISSUE_PERMITS, actor.tenant_scope())
            .await?;

        let mut permit = self.load(actor, permit_id).await?;
        let now = Utc::now();
        permit.closed_at = Some(now);
        self.transition(actor, permit, PermitStatus::Closed, "permit.close", now)
            .await
    }

    async fn cancel_permit(&self, actor: &Actor, permit_id: i64) -> Result<Permit, PermitError> {
        self.access
            .authorize(actor, Permissions::ISSUE_PERMITS, actor.tenant_scope())
            .await?;

        let mut permit = self.load(actor, permit_id).await?;
        let now = Utc::now();
        permit.closed_at = Some(now);
        self.transition(actor, permit, PermitStatus::Cancelled, "permit.cancel", now)
            .await
    }

    async fn compliance_report(
        &self,
        actor: &Actor,
        permit_id: i64,
    ) -> Result<ComplianceReport, PermitError> {
        let permit = self.get_permit(actor, permit_id).await?;
        Ok(compliance::evaluate(
            &permit,
            compliance::rules_for(permit.province),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::access_control::test_support::access_with_role;
    use crate::domain::entities::fixtures::permit::{compliant_permit, reading};
    use crate::domain::entities::mocks::{
        MockAuditRepository, MockPermitRepository, MockRoleRepository,
    };
    use crate::domain::services::volume_calculator::SpaceGeometry;
    use crate::domain::Role;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    const TENANT: i64 = 1;
    const SUPERVISOR: i64 = 30;

    type Service = PermitServiceImpl<MockPermitRepository, MockRoleRepository, MockAuditRepository>;

    fn service(repo: MockPermitRepository, role: Role) -> Service {
        let mut audit = MockAuditRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        let ids = Arc::new(SnowflakeGenerator::new(1, 0));
        PermitServiceImpl::new(
            Arc::new(repo),
            access_with_role(TENANT, role),
            AuditService::new(Arc::new(audit), ids.clone()),
            ids,
        )
    }

    fn stored(status: PermitStatus) -> MockPermitRepository {
        let mut repo = MockPermitRepository::new();
        repo.expect_find_by_id().returning(move |_, _| {
            let mut permit = compliant_permit(Province::QC, Utc::now());
            permit.status = status;
            Ok(Some(permit))
        });
        repo.expect_update().returning(|p| Ok(p.clone()));
        repo
    }

    fn create_request() -> CreatePermitRequest {
        let now = Utc::now();
        CreatePermitRequest {
            province: "qc".into(),
            space_description: "Regard d'égout <script>alert(1)</script>".into(),
            geometry: SpaceGeometry::Cylindrical {
                diameter: 2.0,
                height: 3.0,
            },
            hazards: vec!["H2S".into(), "<b></b>".into()],
            entrants: vec!["A. Roy".into()],
            attendant: Some("B. Gagnon".into()),
            supervisor: None,
            rescue_plan: true,
            entrants_trained: true,
            energy_isolation_confirmed: true,
            continuous_ventilation: true,
            valid_from: now,
            valid_until: now + Duration::hours(8),
            notes: None,
        }
    }

    fn unsafe_reading() -> ReadingRequest {
        ReadingRequest {
            taken_by: "B. Gagnon".into(),
            taken_at: None,
            oxygen_percent: 17.5,
            lel_percent: 0.0,
            h2s_ppm: 0.0,
            co_ppm: 0.0,
        }
    }

    #[test]
    fn test_permit_number_format() {
        let at = DateTime::parse_from_rfc3339("2026-03-02T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = permit_number(Province::ON, at);
        assert!(number.starts_with("CS-ON-20260302-"));
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_create_computes_volume_and_sanitizes() {
        let mut repo = MockPermitRepository::new();
        repo.expect_create().returning(|p| Ok(p.clone()));

        let permit = service(repo, Role::Supervisor)
            .create_permit(&Actor::new(SUPERVISOR, TENANT), create_request())
            .await
            .unwrap();

        assert_eq!(permit.status, PermitStatus::Draft);
        assert_eq!(permit.volume_m3, 9.425);
        assert_eq!(permit.space_description, "Regard d'égout");
        assert_eq!(permit.hazards, vec!["H2S".to_string()]);
        assert!(permit.permit_number.starts_with("CS-QC-"));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_window() {
        let mut req = create_request();
        req.valid_until = req.valid_from - Duration::hours(1);
        let err = service(MockPermitRepository::new(), Role::Supervisor)
            .create_permit(&Actor::new(SUPERVISOR, TENANT), req)
            .await
            .unwrap_err();
        assert!(matches!(err, PermitError::InvalidWindow));
    }

    #[tokio::test]
    async fn test_worker_cannot_create_permit() {
        let err = service(MockPermitRepository::new(), Role::Worker)
            .create_permit(&Actor::new(7, TENANT), create_request())
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_unsafe_reading_suspends_active_permit() {
        let permit = service(stored(PermitStatus::Active), Role::Supervisor)
            .add_reading(&Actor::new(SUPERVISOR, TENANT), 10, unsafe_reading())
            .await
            .unwrap();
        assert_eq!(permit.status, PermitStatus::Suspended);
        assert_eq!(permit.readings.len(), 2);
    }

    #[tokio::test]
    async fn test_unsafe_reading_on_draft_is_recorded_only() {
        let permit = service(stored(PermitStatus::Draft), Role::Supervisor)
            .add_reading(&Actor::new(SUPERVISOR, TENANT), 10, unsafe_reading())
            .await
            .unwrap();
        assert_eq!(permit.status, PermitStatus::Draft);
    }

    #[tokio::test]
    async fn test_future_dated_reading_is_rejected() {
        let mut request = unsafe_reading();
        request.taken_at = Some(Utc::now() + Duration::days(365));

        let err = service(stored(PermitStatus::Suspended), Role::Supervisor)
            .add_reading(&Actor::new(SUPERVISOR, TENANT), 10, request)
            .await
            .unwrap_err();
        assert!(matches!(err, PermitError::FutureReading));
        assert!(matches!(AppError::from(err), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_reading_on_closed_permit() {
        let err = service(stored(PermitStatus::Closed), Role::Supervisor)
            .add_reading(&Actor::new(SUPERVISOR, TENANT), 10, unsafe_reading())
            .await
            .unwrap_err();
        assert!(matches!(err, PermitError::Terminal(PermitStatus::Closed)));
    }

    #[tokio::test]
    async fn test_activate_compliant_permit() {
        let permit = service(stored(PermitStatus::Draft), Role::Supervisor)
            .activate_permit(&Actor::new(SUPERVISOR, TENANT), 10)
            .await
            .unwrap();
        assert_eq!(permit.status, PermitStatus::Active);
        assert_eq!(permit.issued_by, Some(SUPERVISOR));
    }

    #[tokio::test]
    async fn test_activate_non_compliant_returns_report() {
        let mut repo = MockPermitRepository::new();
        repo.expect_find_by_id().returning(|_, _| {
            let now = Utc::now();
            let mut permit = compliant_permit(Province::QC, now);
            permit.rescue_plan = false;
            permit.readings = vec![reading(now - Duration::hours(6))];
            Ok(Some(permit))
        });

        let err = service(repo, Role::Supervisor)
            .activate_permit(&Actor::new(SUPERVISOR, TENANT), 10)
            .await
            .unwrap_err();
        match AppError::from(err) {
            AppError::Unprocessable { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["compliant"], json!(false));
                assert!(details["issues"].as_array().is_some_and(|i| !i.is_empty()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_active_permit_is_invalid() {
        let err = service(stored(PermitStatus::Active), Role::Supervisor)
            .cancel_permit(&Actor::new(SUPERVISOR, TENANT), 10)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_close_active_permit() {
        let permit = service(stored(PermitStatus::Active), Role::Supervisor)
            .close_permit(&Actor::new(SUPERVISOR, TENANT), 10)
            .await
            .unwrap();
        assert_eq!(permit.status, PermitStatus::Closed);
        assert!(permit.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status() {
        let err = service(MockPermitRepository::new(), Role::Worker)
            .list_permits(
                &Actor::new(7, TENANT),
                PermitListQuery {
                    status: Some("expired".into()),
                    limit: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PermitError::UnknownStatus(_)));
    }
}
