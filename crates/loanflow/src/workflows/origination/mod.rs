//! Loan-application origination: lifecycle state machine, permission model,
//! risk and fraud assessment, and the append-only audit trail.

pub mod assessment;
pub mod audit;
pub mod domain;
pub mod lifecycle;
pub mod permissions;
pub mod repository;
pub mod router;
pub mod service;
pub mod throttle;

#[cfg(test)]
mod tests;

pub use assessment::{
    Assessment, AssessmentEngine, FeatureVector, FraudAssessment, FraudRiskLevel, NoNoise,
    ProcessingRecommendation, Recommendation, RecommendationCode, RecommendationPriority,
    RiskBand, RiskFactor, RiskModel, RiskScore, ScoreNoise, ScoringError, UniformNoise,
    MODEL_VERSION,
};
pub use domain::{
    Actor, ActorId, ApplicantProfile, Application, ApplicationId, ApplicationStatus, AuditAction,
    AuditEntry, Capability, DecisionOutcome, DocumentCategory, DocumentRecord, FinancialSnapshot,
    LoanPurpose, LoanRequest, NoteCategory, PermissionGrant, RequestContext, Resource,
    ReviewAssignment, ReviewDecision, ReviewNote, Role,
};
pub use lifecycle::{
    action_allowed, attempt_transition, DocumentUpload, FieldUpdate, LoanAction, TransitionError,
};
pub use permissions::{can_assign_reviews, default_grants, has_permission};
pub use repository::{
    ActorDirectory, ApplicationRepository, ApplicationStatusView, RepositoryError,
};
pub use router::{application_router, OriginationState, ACTOR_HEADER, MAX_FAILED_RESOLUTIONS};
pub use service::{ApplicationIntake, LoanApplicationService, OriginationError};
pub use throttle::{AttemptTracker, Clock, SystemClock};
