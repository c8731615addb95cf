use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit;
use super::domain::{
    Actor, ActorId, Application, ApplicationStatus, AuditAction, Capability, DecisionOutcome,
    DocumentCategory, DocumentRecord, LoanPurpose, NoteCategory, RequestContext, Resource,
    ReviewAssignment, ReviewDecision, ReviewNote,
};
use super::permissions::{can_assign_reviews, has_permission};

/// Allow-listed field update applied by the `update` action.
///
/// Protected fields (status, identifiers, audit trail, timestamps) are not
/// representable here, so an edit can never reach them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub loan_amount: Option<f64>,
    pub loan_term_years: Option<f64>,
    pub loan_purpose: Option<LoanPurpose>,
    pub collateral_value: Option<f64>,
    pub annual_income: Option<f64>,
    pub debt_to_income: Option<f64>,
    pub employment_years: Option<f64>,
    pub months_at_current_address: Option<u32>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.loan_amount.is_some() {
            fields.push("loan_amount");
        }
        if self.loan_term_years.is_some() {
            fields.push("loan_term_years");
        }
        if self.loan_purpose.is_some() {
            fields.push("loan_purpose");
        }
        if self.collateral_value.is_some() {
            fields.push("collateral_value");
        }
        if self.annual_income.is_some() {
            fields.push("annual_income");
        }
        if self.debt_to_income.is_some() {
            fields.push("debt_to_income");
        }
        if self.employment_years.is_some() {
            fields.push("employment_years");
        }
        if self.months_at_current_address.is_some() {
            fields.push("months_at_current_address");
        }
        fields
    }
}

/// Document payload accepted by the attach action; storage happens upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub name: String,
    pub category: DocumentCategory,
    pub storage_key: String,
}

/// Every action the lifecycle admits. Anything not representable here is
/// not a legal mutation of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LoanAction {
    Submit,
    Assign {
        assignee: ActorId,
    },
    Update(FieldUpdate),
    RequestDocuments {
        reason: String,
    },
    AttachDocument(DocumentUpload),
    AddNote {
        category: NoteCategory,
        body: String,
    },
    Decide {
        outcome: DecisionOutcome,
        reason: String,
        conditions: Vec<String>,
    },
    Withdraw,
}

impl LoanAction {
    pub fn label(&self) -> &'static str {
        match self {
            LoanAction::Submit => "submit",
            LoanAction::Assign { .. } => "assign",
            LoanAction::Update(_) => "update",
            LoanAction::RequestDocuments { .. } => "request_documents",
            LoanAction::AttachDocument(_) => "attach_document",
            LoanAction::AddNote { .. } => "add_note",
            LoanAction::Decide { .. } => "decide",
            LoanAction::Withdraw => "withdraw",
        }
    }
}

/// Rejection raised before any mutation takes place.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("actor {actor} is not permitted to {requirement}")]
    Unauthorized { actor: ActorId, requirement: String },
    #[error("{action} is not allowed while the application is {status}")]
    IllegalTransition {
        action: &'static str,
        status: ApplicationStatus,
    },
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Whether `action` is legal from `status`, independent of the actor.
pub fn action_allowed(status: ApplicationStatus, action: &LoanAction) -> bool {
    match action {
        LoanAction::Submit => status == ApplicationStatus::Draft,
        LoanAction::Assign { .. } => matches!(
            status,
            ApplicationStatus::Submitted | ApplicationStatus::UnderReview
        ),
        LoanAction::RequestDocuments { .. } => status == ApplicationStatus::UnderReview,
        LoanAction::Update(_)
        | LoanAction::AttachDocument(_)
        | LoanAction::AddNote { .. }
        | LoanAction::Decide { .. }
        | LoanAction::Withdraw => !status.is_terminal(),
    }
}

/// Validate, authorize, and apply one action as a single unit.
///
/// Checks run strictly before the first write: a rejected attempt leaves the
/// entity and its audit trail untouched. An accepted attempt applies the
/// mutation and appends exactly one audit entry.
pub fn attempt_transition(
    application: &mut Application,
    action: LoanAction,
    actor: &Actor,
    request: Option<RequestContext>,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    let status = application.status;

    if !action_allowed(status, &action) {
        return Err(TransitionError::IllegalTransition {
            action: action.label(),
            status,
        });
    }

    authorize(&action, actor)?;
    validate(&action, application)?;

    match action {
        LoanAction::Submit => {
            application.status = ApplicationStatus::Submitted;
            application.submitted_at = Some(now);
            audit::record(
                application,
                AuditAction::ApplicationSubmitted,
                actor,
                audit::status_change(status.label(), ApplicationStatus::Submitted.label()),
                request,
                now,
            );
        }
        LoanAction::Assign { assignee } => {
            let notes = application
                .review
                .take()
                .map(|review| review.notes)
                .unwrap_or_default();
            application.review = Some(ReviewAssignment {
                assigned_to: assignee.clone(),
                assigned_at: now,
                notes,
                decision: None,
            });
            application.status = ApplicationStatus::UnderReview;
            audit::record(
                application,
                AuditAction::ApplicationAssigned,
                actor,
                audit::detail("assignee", assignee.0),
                request,
                now,
            );
        }
        LoanAction::Update(update) => {
            let changed = update.changed_fields().join(",");
            apply_update(application, update);
            audit::record(
                application,
                AuditAction::ApplicationUpdated,
                actor,
                audit::detail("fields", changed),
                request,
                now,
            );
        }
        LoanAction::RequestDocuments { reason } => {
            application.status = ApplicationStatus::PendingDocuments;
            audit::record(
                application,
                AuditAction::DocumentsRequested,
                actor,
                audit::detail("reason", reason),
                request,
                now,
            );
        }
        LoanAction::AttachDocument(upload) => {
            let mut details = audit::detail("name", upload.name.clone());
            details.insert(
                "category".to_owned(),
                format!("{:?}", upload.category).to_ascii_lowercase(),
            );
            application.documents.push(DocumentRecord {
                name: upload.name,
                category: upload.category,
                storage_key: upload.storage_key,
                uploaded_by: actor.id.clone(),
                uploaded_at: now,
            });
            // An upload satisfies an outstanding document request.
            if application.status == ApplicationStatus::PendingDocuments {
                application.status = ApplicationStatus::UnderReview;
            }
            audit::record(
                application,
                AuditAction::DocumentUploaded,
                actor,
                details,
                request,
                now,
            );
        }
        LoanAction::AddNote { category, body } => {
            // validate() already rejected note additions without a review.
            if let Some(review) = application.review.as_mut() {
                review.notes.push(ReviewNote {
                    author: actor.id.clone(),
                    created_at: now,
                    category,
                    body,
                });
            }
            audit::record(
                application,
                AuditAction::NoteAdded,
                actor,
                audit::detail("category", format!("{category:?}").to_ascii_lowercase()),
                request,
                now,
            );
        }
        LoanAction::Decide {
            outcome,
            reason,
            conditions,
        } => {
            let (next_status, audit_action) = match outcome {
                DecisionOutcome::Approved => {
                    (ApplicationStatus::Approved, AuditAction::ApplicationApproved)
                }
                DecisionOutcome::Denied => {
                    (ApplicationStatus::Denied, AuditAction::ApplicationDenied)
                }
            };

            let review = application.review.get_or_insert_with(|| ReviewAssignment {
                assigned_to: actor.id.clone(),
                assigned_at: now,
                notes: Vec::new(),
                decision: None,
            });
            review.decision = Some(ReviewDecision {
                outcome,
                reason: reason.clone(),
                conditions,
                decided_by: actor.id.clone(),
                decided_at: now,
            });

            application.status = next_status;
            application.completed_at = Some(now);

            let mut details = audit::status_change(status.label(), next_status.label());
            details.insert("reason".to_owned(), reason);
            audit::record(application, audit_action, actor, details, request, now);
        }
        LoanAction::Withdraw => {
            application.status = ApplicationStatus::Withdrawn;
            application.completed_at = Some(now);
            audit::record(
                application,
                AuditAction::ApplicationWithdrawn,
                actor,
                audit::status_change(status.label(), ApplicationStatus::Withdrawn.label()),
                request,
                now,
            );
        }
    }

    Ok(())
}

fn authorize(action: &LoanAction, actor: &Actor) -> Result<(), TransitionError> {
    match action {
        LoanAction::Assign { .. } | LoanAction::RequestDocuments { .. } => {
            if !can_assign_reviews(actor) {
                return Err(TransitionError::Unauthorized {
                    actor: actor.id.clone(),
                    requirement: "manage review assignments".to_owned(),
                });
            }
        }
        LoanAction::Decide { .. } => {
            require(actor, Resource::Applications, Capability::Approve)?;
        }
        LoanAction::Submit
        | LoanAction::Update(_)
        | LoanAction::AttachDocument(_)
        | LoanAction::AddNote { .. }
        | LoanAction::Withdraw => {
            require(actor, Resource::Applications, Capability::Update)?;
        }
    }

    Ok(())
}

fn require(actor: &Actor, resource: Resource, action: Capability) -> Result<(), TransitionError> {
    if has_permission(actor, resource, action) {
        Ok(())
    } else {
        Err(TransitionError::Unauthorized {
            actor: actor.id.clone(),
            requirement: format!("applications:{}", action.label()),
        })
    }
}

fn validate(action: &LoanAction, application: &Application) -> Result<(), TransitionError> {
    match action {
        LoanAction::Submit => {
            if application.applicant.full_name.trim().is_empty() {
                return Err(TransitionError::Validation(
                    "applicant name is required before submission".to_owned(),
                ));
            }
            match application.loan.amount {
                Some(amount) if amount.is_finite() && amount > 0.0 => {}
                _ => {
                    return Err(TransitionError::Validation(
                        "a positive loan amount is required before submission".to_owned(),
                    ))
                }
            }
            match application.financial.annual_income {
                Some(income) if income.is_finite() && income > 0.0 => {}
                _ => {
                    return Err(TransitionError::Validation(
                        "declared annual income is required before submission".to_owned(),
                    ))
                }
            }
        }
        LoanAction::Update(update) => {
            if update.is_empty() {
                return Err(TransitionError::Validation(
                    "update contains no fields".to_owned(),
                ));
            }
            if let Some(amount) = update.loan_amount {
                if !amount.is_finite() || amount <= 0.0 {
                    return Err(TransitionError::Validation(
                        "loan amount must be positive".to_owned(),
                    ));
                }
            }
        }
        LoanAction::RequestDocuments { reason } => {
            if reason.trim().is_empty() {
                return Err(TransitionError::Validation(
                    "a reason is required when requesting documents".to_owned(),
                ));
            }
        }
        LoanAction::AddNote { body, .. } => {
            if application.review.is_none() {
                return Err(TransitionError::Validation(
                    "no active review to attach the note to".to_owned(),
                ));
            }
            if body.trim().is_empty() {
                return Err(TransitionError::Validation(
                    "note body must not be empty".to_owned(),
                ));
            }
        }
        LoanAction::AttachDocument(upload) => {
            if upload.name.trim().is_empty() || upload.storage_key.trim().is_empty() {
                return Err(TransitionError::Validation(
                    "document name and storage key are required".to_owned(),
                ));
            }
        }
        LoanAction::Decide { reason, .. } => {
            if reason.trim().is_empty() {
                return Err(TransitionError::Validation(
                    "a decision reason is required".to_owned(),
                ));
            }
        }
        LoanAction::Assign { .. } | LoanAction::Withdraw => {}
    }

    Ok(())
}

fn apply_update(application: &mut Application, update: FieldUpdate) {
    if let Some(amount) = update.loan_amount {
        application.loan.amount = Some(amount);
    }
    if let Some(term) = update.loan_term_years {
        application.loan.term_years = Some(term);
    }
    if let Some(purpose) = update.loan_purpose {
        application.loan.purpose = Some(purpose);
    }
    if let Some(collateral) = update.collateral_value {
        application.loan.collateral_value = Some(collateral);
    }
    if let Some(income) = update.annual_income {
        application.financial.annual_income = Some(income);
    }
    if let Some(ratio) = update.debt_to_income {
        application.financial.debt_to_income = Some(ratio);
    }
    if let Some(years) = update.employment_years {
        application.applicant.employment_years = Some(years);
    }
    if let Some(months) = update.months_at_current_address {
        application.applicant.months_at_current_address = Some(months);
    }
}
