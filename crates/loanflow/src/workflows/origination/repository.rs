use serde::Serialize;

use super::domain::{Actor, ActorId, Application, ApplicationId, ApplicationStatus};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `update` carries an optimistic version check: the stored record's version
/// must be exactly one behind the incoming record, otherwise the write is a
/// `Conflict` and the caller retries from a fresh fetch. This serializes
/// concurrent mutations per application without a process-wide lock.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn by_status(
        &self,
        status: ApplicationStatus,
        limit: usize,
    ) -> Result<Vec<Application>, RepositoryError>;
}

/// Lookup for authenticated actors; registration and credential handling
/// live with the identity collaborator.
pub trait ActorDirectory: Send + Sync {
    fn fetch(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError>;
}

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of an application's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub audit_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_band: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_level: Option<&'static str>,
    pub decision_rationale: String,
}

impl ApplicationStatusView {
    pub fn of(application: &Application) -> Self {
        let assessment = application.assessment.as_ref();
        Self {
            application_id: application.id.clone(),
            status: application.status.label(),
            audit_entries: application.audit_trail.len(),
            credit_score: assessment.map(|a| a.risk.credit_score),
            risk_band: assessment.map(|a| a.risk.band.label()),
            fraud_level: assessment.map(|a| a.fraud.risk_level.label()),
            decision_rationale: decision_rationale(application),
        }
    }
}

fn decision_rationale(application: &Application) -> String {
    match application
        .review
        .as_ref()
        .and_then(|review| review.decision.as_ref())
    {
        Some(decision) => {
            if decision.conditions.is_empty() {
                format!("{:?}: {}", decision.outcome, decision.reason).to_lowercase()
            } else {
                format!(
                    "{:?}: {} (conditions: {})",
                    decision.outcome,
                    decision.reason,
                    decision.conditions.join(", ")
                )
                .to_lowercase()
            }
        }
        None => "pending decision".to_owned(),
    }
}
