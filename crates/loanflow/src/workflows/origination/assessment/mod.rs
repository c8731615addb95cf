//! Risk assessment pipeline: feature extraction, heuristic scoring, and the
//! independent fraud screen, combined into a versioned assessment record.

pub mod features;
pub mod fraud;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::Application;
pub use features::{extract, FeatureVector, FEATURE_COUNT};
pub use fraud::{FraudAssessment, FraudRiskLevel, ProcessingRecommendation};
pub use scoring::{
    FactorImpact, NoNoise, Recommendation, RecommendationCode, RecommendationPriority, RiskBand,
    RiskFactor, RiskModel, RiskScore, ScoreNoise, UniformNoise, MODEL_VERSION,
};

/// Combined risk and fraud output attached to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
    pub features: FeatureVector,
    pub risk: RiskScore,
    pub fraud: FraudAssessment,
}

/// Raised when the configured scoring model cannot be provided.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring model '{0}' is not available")]
    UnavailableModel(String),
}

/// Stateless engine turning application data into assessments.
///
/// Scoring is side-effect free, so one engine instance may serve any number
/// of applications concurrently without coordination.
pub struct AssessmentEngine {
    model: RiskModel,
}

impl AssessmentEngine {
    pub fn new(model: RiskModel) -> Self {
        Self { model }
    }

    /// Resolve an engine for the requested model version.
    ///
    /// Only the current heuristic model ships with the service; asking for
    /// anything else surfaces as a scoring-unavailable error at startup
    /// rather than at request time.
    pub fn for_version(version: &str, model: RiskModel) -> Result<Self, ScoringError> {
        if version != MODEL_VERSION {
            return Err(ScoringError::UnavailableModel(version.to_owned()));
        }
        Ok(Self::new(model))
    }

    pub fn assess(&self, application: &Application, now: DateTime<Utc>) -> Assessment {
        let features = extract(
            &application.applicant,
            &application.loan,
            &application.financial,
        );

        Assessment {
            model_version: MODEL_VERSION.to_owned(),
            generated_at: now,
            features,
            risk: self.model.score(&features),
            fraud: fraud::evaluate(&application.applicant, &application.financial),
        }
    }
}
