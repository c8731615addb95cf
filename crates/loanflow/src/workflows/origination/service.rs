use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::assessment::{Assessment, AssessmentEngine, ScoringError};
use super::audit;
use super::domain::{
    Actor, ActorId, ApplicantProfile, Application, ApplicationId, AuditAction, Capability,
    DecisionOutcome, FinancialSnapshot, LoanRequest, NoteCategory, RequestContext, Resource,
};
use super::lifecycle::{
    attempt_transition, DocumentUpload, FieldUpdate, LoanAction, TransitionError,
};
use super::permissions::has_permission;
use super::repository::{ApplicationRepository, RepositoryError};

/// Intake payload for a new draft application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationIntake {
    pub applicant: ApplicantProfile,
    pub loan: LoanRequest,
    #[serde(default)]
    pub financial: FinancialSnapshot,
}

/// Error raised by the origination service.
#[derive(Debug, thiserror::Error)]
pub enum OriginationError {
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> (ApplicationId, u64) {
    let record_id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    (ApplicationId(format!("LN-{record_id:06}")), record_id)
}

/// Service composing the permission model, lifecycle state machine,
/// assessment engine, and audit recorder over a repository.
pub struct LoanApplicationService<R> {
    repository: Arc<R>,
    engine: Arc<AssessmentEngine>,
}

impl<R> LoanApplicationService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<AssessmentEngine>) -> Self {
        Self { repository, engine }
    }

    /// Open a new draft application on behalf of `actor`.
    pub fn create(
        &self,
        intake: ApplicationIntake,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.require(actor, Capability::Create)?;

        if intake.applicant.full_name.trim().is_empty() {
            return Err(TransitionError::Validation(
                "applicant name is required".to_owned(),
            )
            .into());
        }

        let now = Utc::now();
        let (id, record_id) = next_application_id();
        let mut application = Application::draft(
            id,
            record_id,
            intake.applicant,
            intake.loan,
            intake.financial,
            now,
        );
        let status_detail = audit::detail("status", application.status.label());
        audit::record(
            &mut application,
            AuditAction::ApplicationCreated,
            actor,
            status_detail,
            request,
            now,
        );

        let stored = self.repository.insert(application)?;
        Ok(stored)
    }

    /// Run one lifecycle action against a stored application.
    ///
    /// The fetch-check-mutate-store sequence relies on the repository's
    /// optimistic version check: a concurrent writer surfaces as `Conflict`
    /// and nothing from this attempt is persisted.
    pub fn act(
        &self,
        id: &ApplicationId,
        action: LoanAction,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        let mut application = self
            .repository
            .fetch(id)?
            .ok_or(OriginationError::NotFound)?;

        attempt_transition(&mut application, action, actor, request, Utc::now())?;

        application.version += 1;
        self.repository.update(application.clone())?;
        Ok(application)
    }

    pub fn submit(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::Submit, actor, request)
    }

    pub fn assign(
        &self,
        id: &ApplicationId,
        assignee: ActorId,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::Assign { assignee }, actor, request)
    }

    pub fn update_fields(
        &self,
        id: &ApplicationId,
        update: FieldUpdate,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::Update(update), actor, request)
    }

    pub fn request_documents(
        &self,
        id: &ApplicationId,
        reason: String,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::RequestDocuments { reason }, actor, request)
    }

    pub fn attach_document(
        &self,
        id: &ApplicationId,
        upload: DocumentUpload,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::AttachDocument(upload), actor, request)
    }

    pub fn add_note(
        &self,
        id: &ApplicationId,
        category: NoteCategory,
        body: String,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::AddNote { category, body }, actor, request)
    }

    pub fn decide(
        &self,
        id: &ApplicationId,
        outcome: DecisionOutcome,
        reason: String,
        conditions: Vec<String>,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(
            id,
            LoanAction::Decide {
                outcome,
                reason,
                conditions,
            },
            actor,
            request,
        )
    }

    pub fn withdraw(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Application, OriginationError> {
        self.act(id, LoanAction::Withdraw, actor, request)
    }

    /// Compute and attach a fresh assessment.
    ///
    /// Re-analysis replaces the stored assessment; the audit entries from
    /// earlier computations remain in the trail.
    pub fn analyze(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Result<Assessment, OriginationError> {
        self.require(actor, Capability::Update)?;

        let mut application = self
            .repository
            .fetch(id)?
            .ok_or(OriginationError::NotFound)?;

        let now = Utc::now();
        let assessment = self.engine.assess(&application, now);

        let mut details = audit::detail("model_version", assessment.model_version.clone());
        details.insert(
            "credit_score".to_owned(),
            assessment.risk.credit_score.to_string(),
        );
        details.insert(
            "fraud_score".to_owned(),
            assessment.fraud.fraud_score.to_string(),
        );

        application.assessment = Some(assessment.clone());
        audit::record(
            &mut application,
            AuditAction::AssessmentCompleted,
            actor,
            details,
            request,
            now,
        );

        application.version += 1;
        self.repository.update(application)?;

        info!(
            application = %id,
            credit_score = assessment.risk.credit_score,
            band = assessment.risk.band.label(),
            "assessment completed"
        );

        Ok(assessment)
    }

    /// Assess a batch of applications, isolating each outcome so one
    /// failure never aborts the rest.
    pub fn analyze_batch(
        &self,
        ids: &[ApplicationId],
        actor: &Actor,
        request: Option<RequestContext>,
    ) -> Vec<(ApplicationId, Result<Assessment, OriginationError>)> {
        ids.iter()
            .map(|id| (id.clone(), self.analyze(id, actor, request.clone())))
            .collect()
    }

    /// Fetch an application for API responses.
    pub fn get(
        &self,
        id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, OriginationError> {
        self.require(actor, Capability::Read)?;
        self.repository
            .fetch(id)?
            .ok_or(OriginationError::NotFound)
    }

    fn require(&self, actor: &Actor, action: Capability) -> Result<(), OriginationError> {
        if has_permission(actor, Resource::Applications, action) {
            Ok(())
        } else {
            Err(TransitionError::Unauthorized {
                actor: actor.id.clone(),
                requirement: format!("applications:{}", action.label()),
            }
            .into())
        }
    }
}
