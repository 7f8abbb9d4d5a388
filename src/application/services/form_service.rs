//! AST Form Service
//!
//! Job safety analysis forms and their approval workflow.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::json;
use tracing::info;

use super::access_control::AccessControl;
use super::actor::Actor;
use super::audit_service::{clamp_limit, AuditService};
use crate::application::dto::request::{AstFormRequest, FormListQuery};
use crate::domain::services::PermissionService;
use crate::domain::value_objects::InvalidTransition;
use crate::domain::{
    AstForm, AstFormRepository, AuditRepository, FormFilter, Permissions, RoleRepository,
    WorkflowStatus,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::sanitize::{sanitize_serde, sanitize_text, sanitize_value};
use crate::shared::snowflake::{self, SnowflakeGenerator};

/// Maximum page size of a form listing
pub const MAX_FORM_LIMIT: i64 = 100;

/// AST form service trait
#[async_trait]
pub trait FormService: Send + Sync {
    async fn create_form(&self, actor: &Actor, request: AstFormRequest) -> Result<AstForm, FormError>;

    async fn get_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError>;

    /// Newest first; restricted to the caller's forms without ACCESS_ALL_RECORDS
    async fn list_forms(&self, actor: &Actor, query: FormListQuery) -> Result<Vec<AstForm>, FormError>;

    /// Replace the content of a draft or rejected form
    async fn update_form(
        &self,
        actor: &Actor,
        form_id: i64,
        request: AstFormRequest,
    ) -> Result<AstForm, FormError>;

    async fn submit_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError>;

    async fn approve_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError>;

    async fn reject_form(&self, actor: &Actor, form_id: i64, reason: &str) -> Result<AstForm, FormError>;

    async fn lock_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError>;

    /// Drafts only
    async fn delete_form(&self, actor: &Actor, form_id: i64) -> Result<(), FormError>;
}

/// AST form service errors
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Form not found")]
    NotFound,

    #[error("Form is {0} and can no longer be changed")]
    NotEditable(WorkflowStatus),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Form is incomplete")]
    Incomplete(Vec<String>),

    #[error("A rejection reason is required")]
    ReasonRequired,

    #[error("The author of a form cannot approve it")]
    SelfApproval,

    #[error("Only the author can submit a form")]
    NotOwner,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid form content: {0}")]
    InvalidContent(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        match e {
            FormError::NotFound => AppError::NotFound("Form not found".into()),
            e @ (FormError::NotEditable(_) | FormError::InvalidTransition(_)) => {
                AppError::Conflict(e.to_string())
            }
            FormError::Incomplete(blockers) => AppError::Unprocessable {
                message: "Form is incomplete".into(),
                details: Some(json!({ "blockers": blockers })),
            },
            e @ (FormError::ReasonRequired
            | FormError::InvalidFilter(_)
            | FormError::InvalidContent(_)) => AppError::validation(e.to_string()),
            e @ (FormError::SelfApproval | FormError::NotOwner) => {
                AppError::Forbidden(e.to_string())
            }
            FormError::Store(e) => e,
        }
    }
}

/// FormService implementation
pub struct FormServiceImpl<F, R, A>
where
    F: AstFormRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    form_repo: Arc<F>,
    access: Arc<AccessControl<R>>,
    audit: AuditService<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<F, R, A> FormServiceImpl<F, R, A>
where
    F: AstFormRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    pub fn new(
        form_repo: Arc<F>,
        access: Arc<AccessControl<R>>,
        audit: AuditService<A>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            form_repo,
            access,
            audit,
            id_generator,
        }
    }

    async fn load(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError> {
        self.form_repo
            .find_by_id(actor.tenant_id, form_id)
            .await?
            .ok_or(FormError::NotFound)
    }

    /// Copy sanitized request content into a form
    fn apply_content(form: &mut AstForm, request: AstFormRequest) -> Result<(), FormError> {
        let invalid = |e: serde_json::Error| FormError::InvalidContent(e.to_string());

        form.client_name = sanitize_text(&request.client_name);
        form.work_location = sanitize_text(&request.work_location);
        form.task_description = sanitize_text(&request.task_description);
        form.work_date = request.work_date;
        form.hazards = sanitize_serde(request.hazards).map_err(invalid)?;
        form.controls = sanitize_serde(request.controls).map_err(invalid)?;
        form.lockout_points = sanitize_serde(request.lockout_points).map_err(invalid)?;
        form.team_members = sanitize_serde(request.team_members).map_err(invalid)?;
        form.payload = request.payload.map(sanitize_value).unwrap_or_else(|| json!({}));
        Ok(())
    }

    async fn transition(
        &self,
        actor: &Actor,
        mut form: AstForm,
        to: WorkflowStatus,
        action: &str,
    ) -> Result<AstForm, FormError> {
        let from = form.status;
        form.status = from.transition(to)?;
        form.updated_at = Utc::now();

        let saved = self.form_repo.update(&form).await?;
        metrics::record_transition("ast_form", to.as_str());
        self.audit
            .record(
                actor,
                action,
                "ast_form",
                Some(saved.id),
                json!({ "from": from, "to": to, "form_number": saved.form_number }),
            )
            .await;
        Ok(saved)
    }
}

#[async_trait]
impl<F, R, A> FormService for FormServiceImpl<F, R, A>
where
    F: AstFormRepository + 'static,
    R: RoleRepository + 'static,
    A: AuditRepository + 'static,
{
    async fn create_form(&self, actor: &Actor, request: AstFormRequest) -> Result<AstForm, FormError> {
        self.access
            .authorize(actor, Permissions::EDIT_FORMS, actor.tenant_scope())
            .await?;

        let now = Utc::now();
        let sequence = self.form_repo.next_sequence(actor.tenant_id, now.year()).await?;

        let mut form = AstForm {
            id: self.id_generator.generate(),
            tenant_id: actor.tenant_id,
            form_number: AstForm::format_number(now.year(), sequence),
            created_by: actor.user_id,
            client_name: String::new(),
            work_location: String::new(),
            task_description: String::new(),
            work_date: request.work_date,
            status: WorkflowStatus::Draft,
            hazards: Vec::new(),
            controls: Vec::new(),
            lockout_points: Vec::new(),
            team_members: Vec::new(),
            payload: json!({}),
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            locked_at: None,
            created_at: now,
            updated_at: now,
        };
        Self::apply_content(&mut form, request)?;

        let saved = self.form_repo.create(&form).await?;
        self.audit
            .record(
                actor,
                "ast.create",
                "ast_form",
                Some(saved.id),
                json!({ "form_number": saved.form_number }),
            )
            .await;
        info!(tenant_id = actor.tenant_id, form_id = saved.id, form_number = %saved.form_number, "AST form created");
        Ok(saved)
    }

    async fn get_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError> {
        let form = self.load(actor, form_id).await?;
        self.access
            .authorize(actor, Permissions::VIEW_FORMS, actor.record_scope(form.created_by))
            .await?;
        Ok(form)
    }

    async fn list_forms(&self, actor: &Actor, query: FormListQuery) -> Result<Vec<AstForm>, FormError> {
        let effective = self
            .access
            .authorize(actor, Permissions::VIEW_FORMS, actor.tenant_scope())
            .await?;

        let status = query
            .status
            .as_deref()
            .map(WorkflowStatus::parse)
            .transpose()
            .map_err(|e| FormError::InvalidFilter(e.to_string()))?;
        let before = query
            .before
            .as_deref()
            .map(snowflake::from_string)
            .transpose()
            .map_err(|_| FormError::InvalidFilter("before must be a form id".into()))?;

        let filter = FormFilter {
            status,
            created_by: PermissionService::own_records_only(effective).then_some(actor.user_id),
            before,
            limit: clamp_limit(query.limit.unwrap_or(0), MAX_FORM_LIMIT),
        };
        Ok(self.form_repo.list(actor.tenant_id, filter).await?)
    }

    async fn update_form(
        &self,
        actor: &Actor,
        form_id: i64,
        request: AstFormRequest,
    ) -> Result<AstForm, FormError> {
        let mut form = self.load(actor, form_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_FORMS, actor.record_scope(form.created_by))
            .await?;

        if !form.status.is_editable() {
            return Err(FormError::NotEditable(form.status));
        }
        if form.status == WorkflowStatus::Rejected {
            // Editing a rejected form starts a new revision
            form.status = form.status.transition(WorkflowStatus::Draft)?;
            form.rejection_reason = None;
        }

        Self::apply_content(&mut form, request)?;
        form.updated_at = Utc::now();

        let saved = self.form_repo.update(&form).await?;
        self.audit
            .record(actor, "ast.update", "ast_form", Some(saved.id), json!({}))
            .await;
        Ok(saved)
    }

    async fn submit_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError> {
        let mut form = self.load(actor, form_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_FORMS, actor.record_scope(form.created_by))
            .await?;
        if form.created_by != actor.user_id {
            return Err(FormError::NotOwner);
        }

        if form.status == WorkflowStatus::Rejected {
            form.status = form.status.transition(WorkflowStatus::Draft)?;
        }
        if form.status == WorkflowStatus::Draft {
            let blockers = form.submission_blockers();
            if !blockers.is_empty() {
                return Err(FormError::Incomplete(blockers));
            }
        }

        self.transition(actor, form, WorkflowStatus::Submitted, "ast.submit")
            .await
    }

    async fn approve_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError> {
        let mut form = self.load(actor, form_id).await?;
        let effective = self
            .access
            .authorize(actor, Permissions::APPROVE_FORMS, actor.tenant_scope())
            .await?;

        if form.created_by == actor.user_id && !Permissions::from_bits(effective).is_admin() {
            return Err(FormError::SelfApproval);
        }

        form.approved_by = Some(actor.user_id);
        form.approved_at = Some(Utc::now());
        form.rejection_reason = None;
        self.transition(actor, form, WorkflowStatus::Approved, "ast.approve")
            .await
    }

    async fn reject_form(&self, actor: &Actor, form_id: i64, reason: &str) -> Result<AstForm, FormError> {
        let reason = sanitize_text(reason);
        if reason.is_empty() {
            return Err(FormError::ReasonRequired);
        }

        let mut form = self.load(actor, form_id).await?;
        let effective = self
            .access
            .authorize(actor, Permissions::APPROVE_FORMS, actor.tenant_scope())
            .await?;

        if form.created_by == actor.user_id && !Permissions::from_bits(effective).is_admin() {
            return Err(FormError::SelfApproval);
        }

        form.rejection_reason = Some(reason);
        self.transition(actor, form, WorkflowStatus::Rejected, "ast.reject")
            .await
    }

    async fn lock_form(&self, actor: &Actor, form_id: i64) -> Result<AstForm, FormError> {
        let mut form = self.load(actor, form_id).await?;
        self.access
            .authorize(actor, Permissions::APPROVE_FORMS, actor.tenant_scope())
            .await?;

        form.locked_at = Some(Utc::now());
        self.transition(actor, form, WorkflowStatus::Locked, "ast.lock")
            .await
    }

    async fn delete_form(&self, actor: &Actor, form_id: i64) -> Result<(), FormError> {
        let form = self.load(actor, form_id).await?;
        self.access
            .authorize(actor, Permissions::EDIT_FORMS, actor.record_scope(form.created_by))
            .await?;

        if form.status != WorkflowStatus::Draft {
            return Err(FormError::NotEditable(form.status));
        }

        self.form_repo.delete(actor.tenant_id, form.id).await?;
        self.audit
            .record(
                actor,
                "ast.delete",
                "ast_form",
                Some(form.id),
                json!({ "form_number": form.form_number }),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::access_control::test_support::assignment;
    use crate::domain::entities::fixtures::ast_form::form;
    use crate::domain::entities::mocks::{
        MockAstFormRepository, MockAuditRepository, MockRoleRepository,
    };
    use crate::domain::Role;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const TENANT: i64 = 1;
    const WORKER: i64 = 20;
    const OTHER_WORKER: i64 = 21;
    const SUPERVISOR: i64 = 30;
    const ADMIN: i64 = 40;

    fn roles() -> MockRoleRepository {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_for_user().returning(|user_id| {
            let role = match user_id {
                SUPERVISOR => Role::Supervisor,
                ADMIN => Role::TenantAdmin,
                _ => Role::Worker,
            };
            Ok(vec![assignment(user_id, Some(TENANT), role)])
        });
        roles
    }

    fn service(forms: MockAstFormRepository) -> FormServiceImpl<MockAstFormRepository, MockRoleRepository, MockAuditRepository> {
        let mut audit = MockAuditRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        let ids = Arc::new(SnowflakeGenerator::new(1, 0));
        FormServiceImpl::new(
            Arc::new(forms),
            Arc::new(AccessControl::new(Arc::new(roles()), None)),
            AuditService::new(Arc::new(audit), ids.clone()),
            ids,
        )
    }

    fn stored(status: WorkflowStatus, author: i64) -> MockAstFormRepository {
        let mut forms = MockAstFormRepository::new();
        forms
            .expect_find_by_id()
            .returning(move |tenant_id, id| Ok(Some(form(id, tenant_id, author, status))));
        forms.expect_update().returning(|f| Ok(f.clone()));
        forms
    }

    fn request() -> AstFormRequest {
        serde_json::from_value(json!({
            "client_name": "Hydro <i>Client</i>",
            "work_location": "Poste 12",
            "task_description": "<script>alert(1)</script>Remplacement",
            "work_date": "2026-03-02",
            "hazards": [{ "description": "Arc <b>électrique</b>", "risk_level": "high" }],
            "controls": [{ "description": "Cadenassage", "control_type": "engineering" }],
            "team_members": [{ "name": "J. Tremblay", "signed": true }],
            "payload": { "notes": "<img src=x onerror=alert(1)>ok" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_numbers_and_sanitizes() {
        let mut forms = MockAstFormRepository::new();
        forms
            .expect_next_sequence()
            .withf(|tenant_id, _| *tenant_id == TENANT)
            .returning(|_, _| Ok(42));
        forms.expect_create().returning(|f| Ok(f.clone()));

        let created = service(forms)
            .create_form(&Actor::new(WORKER, TENANT), request())
            .await
            .unwrap();

        assert_eq!(created.status, WorkflowStatus::Draft);
        assert_eq!(created.form_number, format!("AST-{}-00042", Utc::now().year()));
        assert_eq!(created.client_name, "Hydro Client");
        assert_eq!(created.task_description, "Remplacement");
        assert_eq!(created.hazards[0].description, "Arc électrique");
        assert_eq!(created.payload, json!({ "notes": "ok" }));
        assert_eq!(created.work_date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[tokio::test]
    async fn test_update_only_while_editable() {
        let err = service(stored(WorkflowStatus::Submitted, WORKER))
            .update_form(&Actor::new(WORKER, TENANT), 5, request())
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::NotEditable(WorkflowStatus::Submitted)));
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_rejected_form_returns_to_draft() {
        let updated = service(stored(WorkflowStatus::Rejected, WORKER))
            .update_form(&Actor::new(WORKER, TENANT), 5, request())
            .await
            .unwrap();
        assert_eq!(updated.status, WorkflowStatus::Draft);
        assert_eq!(updated.rejection_reason, None);
    }

    #[tokio::test]
    async fn test_worker_cannot_edit_someone_elses_form() {
        let err = service(stored(WorkflowStatus::Draft, OTHER_WORKER))
            .update_form(&Actor::new(WORKER, TENANT), 5, request())
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_submit_incomplete_form() {
        let mut forms = MockAstFormRepository::new();
        forms.expect_find_by_id().returning(|tenant_id, id| {
            let mut f = form(id, tenant_id, WORKER, WorkflowStatus::Draft);
            f.controls.clear();
            Ok(Some(f))
        });

        let err = service(forms)
            .submit_form(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap_err();
        match AppError::from(err) {
            AppError::Unprocessable { details, .. } => {
                let blockers = details.unwrap()["blockers"].as_array().unwrap().len();
                assert_eq!(blockers, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_then_approve() {
        let submitted = service(stored(WorkflowStatus::Draft, WORKER))
            .submit_form(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap();
        assert_eq!(submitted.status, WorkflowStatus::Submitted);

        let approved = service(stored(WorkflowStatus::Submitted, WORKER))
            .approve_form(&Actor::new(SUPERVISOR, TENANT), 5)
            .await
            .unwrap();
        assert_eq!(approved.status, WorkflowStatus::Approved);
        assert_eq!(approved.approved_by, Some(SUPERVISOR));
    }

    #[tokio::test]
    async fn test_author_cannot_approve_unless_admin() {
        let err = service(stored(WorkflowStatus::Submitted, SUPERVISOR))
            .approve_form(&Actor::new(SUPERVISOR, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::SelfApproval));

        let approved = service(stored(WorkflowStatus::Submitted, ADMIN))
            .approve_form(&Actor::new(ADMIN, TENANT), 5)
            .await
            .unwrap();
        assert_eq!(approved.status, WorkflowStatus::Approved);
    }

    #[tokio::test]
    async fn test_worker_cannot_approve() {
        let err = service(stored(WorkflowStatus::Submitted, OTHER_WORKER))
            .approve_form(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let err = service(MockAstFormRepository::new())
            .reject_form(&Actor::new(SUPERVISOR, TENANT), 5, "  <b></b> ")
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::ReasonRequired));

        let rejected = service(stored(WorkflowStatus::Submitted, WORKER))
            .reject_form(&Actor::new(SUPERVISOR, TENANT), 5, "Missing PPE")
            .await
            .unwrap();
        assert_eq!(rejected.status, WorkflowStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Missing PPE"));
    }

    #[tokio::test]
    async fn test_author_cannot_reject_own_form() {
        let err = service(stored(WorkflowStatus::Submitted, SUPERVISOR))
            .reject_form(&Actor::new(SUPERVISOR, TENANT), 5, "Redo hazards")
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::SelfApproval));

        let rejected = service(stored(WorkflowStatus::Submitted, ADMIN))
            .reject_form(&Actor::new(ADMIN, TENANT), 5, "Redo hazards")
            .await
            .unwrap();
        assert_eq!(rejected.status, WorkflowStatus::Rejected);
    }

    #[tokio::test]
    async fn test_only_author_submits() {
        let err = service(stored(WorkflowStatus::Draft, WORKER))
            .submit_form(&Actor::new(SUPERVISOR, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::NotOwner));
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_lock_requires_approved() {
        let err = service(stored(WorkflowStatus::Submitted, WORKER))
            .lock_form(&Actor::new(SUPERVISOR, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidTransition(_)));

        let locked = service(stored(WorkflowStatus::Approved, WORKER))
            .lock_form(&Actor::new(SUPERVISOR, TENANT), 5)
            .await
            .unwrap();
        assert_eq!(locked.status, WorkflowStatus::Locked);
        assert!(locked.locked_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_drafts_only() {
        let err = service(stored(WorkflowStatus::Approved, WORKER))
            .delete_form(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::NotEditable(WorkflowStatus::Approved)));

        let mut forms = stored(WorkflowStatus::Draft, WORKER);
        forms
            .expect_delete()
            .withf(|tenant_id, id| *tenant_id == TENANT && *id == 5)
            .times(1)
            .returning(|_, _| Ok(()));
        service(forms)
            .delete_form(&Actor::new(WORKER, TENANT), 5)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_worker_listing_is_restricted_to_own_forms() {
        let mut forms = MockAstFormRepository::new();
        forms
            .expect_list()
            .withf(|_, filter| filter.created_by == Some(WORKER) && filter.limit == MAX_FORM_LIMIT)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let query = FormListQuery {
            status: Some("draft".into()),
            before: None,
            limit: Some(1000),
        };
        service(forms)
            .list_forms(&Actor::new(WORKER, TENANT), query)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_supervisor_lists_everything() {
        let mut forms = MockAstFormRepository::new();
        forms
            .expect_list()
            .withf(|_, filter| filter.created_by.is_none())
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let query = FormListQuery {
            status: None,
            before: None,
            limit: None,
        };
        service(forms)
            .list_forms(&Actor::new(SUPERVISOR, TENANT), query)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_status_filter() {
        let query = FormListQuery {
            status: Some("archived".into()),
            before: None,
            limit: None,
        };
        let err = service(MockAstFormRepository::new())
            .list_forms(&Actor::new(WORKER, TENANT), query)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidFilter(_)));
    }
}
