use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for loan applications, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for actors (registered users of the platform).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status tracked throughout the origination workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    PendingDocuments,
    Approved,
    Denied,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::PendingDocuments => "pending_documents",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Denied => "denied",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Terminal statuses admit no outbound transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved | ApplicationStatus::Denied | ApplicationStatus::Withdrawn
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Applicant identity and employment snapshot captured at intake.
///
/// Only the fields the assessment engines read are structured; everything
/// else about the applicant stays with the intake collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub full_name: String,
    pub email: Option<String>,
    pub age: Option<u8>,
    pub employment_years: Option<f64>,
    pub months_at_current_address: Option<u32>,
}

/// Requested loan terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub amount: Option<f64>,
    pub term_years: Option<f64>,
    pub purpose: Option<LoanPurpose>,
    pub collateral_value: Option<f64>,
}

/// Declared purpose categories, each carrying a fixed rubric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanPurpose {
    HomePurchase,
    HomeImprovement,
    Education,
    AutoLoan,
    Medical,
    DebtConsolidation,
    Business,
    Vacation,
    Other,
}

impl LoanPurpose {
    /// Rubric score consumed by the feature extractor.
    pub const fn category_score(self) -> f64 {
        match self {
            LoanPurpose::HomePurchase => 9.0,
            LoanPurpose::HomeImprovement => 8.0,
            LoanPurpose::Education => 8.0,
            LoanPurpose::AutoLoan => 7.0,
            LoanPurpose::Medical => 7.0,
            LoanPurpose::DebtConsolidation => 6.0,
            LoanPurpose::Business => 5.0,
            LoanPurpose::Other => 5.0,
            LoanPurpose::Vacation => 3.0,
        }
    }
}

/// Declared financial position used by scoring and fraud screening.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub credit_score: Option<u16>,
    pub annual_income: Option<f64>,
    pub debt_to_income: Option<f64>,
    pub payment_history_score: Option<f64>,
    pub credit_utilization: Option<f64>,
    pub open_accounts: Option<u32>,
    pub recent_inquiries: Option<u32>,
}

/// Review assignment metadata, populated when an underwriter takes the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub assigned_to: ActorId,
    pub assigned_at: DateTime<Utc>,
    pub notes: Vec<ReviewNote>,
    pub decision: Option<ReviewDecision>,
}

/// Ordered note attached to a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewNote {
    pub author: ActorId,
    pub created_at: DateTime<Utc>,
    pub category: NoteCategory,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteCategory {
    General,
    Income,
    Credit,
    Fraud,
    Documents,
}

/// Terminal decision recorded on the review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub outcome: DecisionOutcome,
    pub reason: String,
    pub conditions: Vec<String>,
    pub decided_by: ActorId,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Denied,
}

/// Metadata for an uploaded document; blob storage is a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub name: String,
    pub category: DocumentCategory,
    pub storage_key: String,
    pub uploaded_by: ActorId,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identification,
    IncomeVerification,
    BankStatement,
    CollateralAppraisal,
    Misc,
}

/// Caller-supplied request metadata recorded alongside audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Immutable audit-trail entry. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub performed_by: ActorId,
    pub timestamp: DateTime<Utc>,
    pub details: BTreeMap<String, String>,
    pub request: Option<RequestContext>,
}

/// Actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApplicationCreated,
    ApplicationSubmitted,
    ApplicationAssigned,
    ApplicationUpdated,
    DocumentsRequested,
    DocumentUploaded,
    NoteAdded,
    AssessmentCompleted,
    ApplicationApproved,
    ApplicationDenied,
    ApplicationWithdrawn,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::ApplicationCreated => "application_created",
            AuditAction::ApplicationSubmitted => "application_submitted",
            AuditAction::ApplicationAssigned => "application_assigned",
            AuditAction::ApplicationUpdated => "application_updated",
            AuditAction::DocumentsRequested => "documents_requested",
            AuditAction::DocumentUploaded => "document_uploaded",
            AuditAction::NoteAdded => "note_added",
            AuditAction::AssessmentCompleted => "assessment_completed",
            AuditAction::ApplicationApproved => "application_approved",
            AuditAction::ApplicationDenied => "application_denied",
            AuditAction::ApplicationWithdrawn => "application_withdrawn",
        }
    }
}

/// The central origination entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub record_id: u64,
    pub status: ApplicationStatus,
    pub applicant: ApplicantProfile,
    pub loan: LoanRequest,
    pub financial: FinancialSnapshot,
    pub assessment: Option<super::assessment::Assessment>,
    pub review: Option<ReviewAssignment>,
    pub documents: Vec<DocumentRecord>,
    pub audit_trail: Vec<AuditEntry>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Application {
    /// Construct a fresh draft; the caller records the creation audit entry.
    pub fn draft(
        id: ApplicationId,
        record_id: u64,
        applicant: ApplicantProfile,
        loan: LoanRequest,
        financial: FinancialSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            record_id,
            status: ApplicationStatus::Draft,
            applicant,
            loan,
            financial,
            assessment: None,
            review: None,
            documents: Vec::new(),
            audit_trail: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            completed_at: None,
        }
    }
}

/// Platform roles, each mapped to a default grant set at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Underwriter,
    Analyst,
    Viewer,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Underwriter => "underwriter",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
        }
    }
}

/// Resources permission grants can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Applications,
    Users,
    Reports,
    Settings,
}

/// Capabilities a grant can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
    Approve,
}

impl Capability {
    pub const fn label(self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Approve => "approve",
        }
    }
}

/// Explicit grant of capabilities on a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub resource: Resource,
    pub actions: Vec<Capability>,
}

/// Authenticated identity performing actions on applications.
///
/// The core trusts the actor it is handed; session validation happens
/// upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
    pub role: Role,
    pub grants: Vec<PermissionGrant>,
    pub is_active: bool,
    pub failed_logins: u32,
}

impl Actor {
    /// Build an actor carrying the default grant set for its role.
    pub fn with_role(id: ActorId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            grants: super::permissions::default_grants(role),
            is_active: true,
            failed_logins: 0,
        }
    }
}
