use rand::Rng;
use serde::{Deserialize, Serialize};

use super::features::{idx, FeatureVector, FEATURE_COUNT};

/// Version tag stamped on every assessment produced by this model.
pub const MODEL_VERSION: &str = "heuristic-1.2.0";

/// Fixed weights for the linear combination, positionally aligned with the
/// feature vector. Credit score and income dominate; debt-to-income and
/// utilization pull the estimate down.
const WEIGHTS: [f64; FEATURE_COUNT] = [
    2.6,  // credit score
    1.9,  // annual income
    -1.8, // debt-to-income
    0.6,  // employment years
    -0.5, // loan amount
    0.2,  // loan term
    1.4,  // payment history
    -1.2, // credit utilization
    -0.4, // open accounts
    -0.6, // recent inquiries
    0.5,  // collateral value
    0.4,  // loan purpose
];

const BIAS: f64 = -2.0;

const SCORE_FLOOR: f64 = 300.0;
const SCORE_SPAN: f64 = 550.0;

/// Perturbation strategy applied to the raw probability.
///
/// The production model adds bounded symmetric noise to emulate estimation
/// uncertainty; tests substitute [`NoNoise`] so outcomes are reproducible.
pub trait ScoreNoise: Send + Sync {
    fn perturb(&self, probability: f64) -> f64;
}

/// Identity strategy: the probability passes through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl ScoreNoise for NoNoise {
    fn perturb(&self, probability: f64) -> f64 {
        probability
    }
}

/// Adds a uniform random term in `[-amplitude, amplitude]` and clamps the
/// result back into [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct UniformNoise {
    amplitude: f64,
}

impl UniformNoise {
    pub fn new(amplitude: f64) -> Self {
        Self {
            amplitude: amplitude.abs(),
        }
    }
}

impl Default for UniformNoise {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl ScoreNoise for UniformNoise {
    fn perturb(&self, probability: f64) -> f64 {
        if self.amplitude == 0.0 {
            return probability.clamp(0.0, 1.0);
        }

        let jitter = rand::thread_rng().gen_range(-self.amplitude..=self.amplitude);
        (probability + jitter).clamp(0.0, 1.0)
    }
}

/// Risk band derived from the estimated credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskBand {
    pub const fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "LOW",
            RiskBand::Medium => "MEDIUM",
            RiskBand::High => "HIGH",
            RiskBand::VeryHigh => "VERY_HIGH",
        }
    }

    /// Fixed threshold table over the estimated credit score.
    pub const fn for_credit_score(credit_score: u16) -> Self {
        if credit_score >= 750 {
            RiskBand::Low
        } else if credit_score >= 650 {
            RiskBand::Medium
        } else if credit_score >= 550 {
            RiskBand::High
        } else {
            RiskBand::VeryHigh
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorImpact {
    Positive,
    Negative,
}

/// One flagged contribution to the estimate, for transparent review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub impact: FactorImpact,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationCode {
    ApproveStandard,
    RequireCosigner,
    ReduceLoanAmount,
}

/// Rule-derived guidance attached to the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub code: RecommendationCode,
    pub priority: RecommendationPriority,
    pub message: String,
}

/// Output of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub credit_score: u16,
    pub band: RiskBand,
    pub probability: f64,
    pub factors: Vec<RiskFactor>,
    pub recommendations: Vec<Recommendation>,
}

/// Heuristic scoring model: weighted linear combination, logistic squash,
/// pluggable perturbation, threshold banding.
pub struct RiskModel {
    noise: Box<dyn ScoreNoise>,
}

impl RiskModel {
    pub fn new(noise: Box<dyn ScoreNoise>) -> Self {
        Self { noise }
    }

    /// Production configuration with the documented ±0.05 perturbation.
    pub fn randomized() -> Self {
        Self::new(Box::new(UniformNoise::default()))
    }

    /// Reproducible configuration for tests and replays.
    pub fn deterministic() -> Self {
        Self::new(Box::new(NoNoise))
    }

    pub fn score(&self, features: &FeatureVector) -> RiskScore {
        let linear = features
            .as_slice()
            .iter()
            .zip(WEIGHTS.iter())
            .fold(BIAS, |sum, (feature, weight)| sum + feature * weight);

        let probability = self.noise.perturb(sigmoid(linear)).clamp(0.0, 1.0);
        let credit_score = (SCORE_FLOOR + probability * SCORE_SPAN).round() as u16;
        let band = RiskBand::for_credit_score(credit_score);

        RiskScore {
            credit_score,
            band,
            probability,
            factors: flag_factors(features),
            recommendations: recommend(credit_score, features),
        }
    }
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

/// Threshold checks over individual features. A factor is emitted only when
/// its threshold is crossed.
fn flag_factors(features: &FeatureVector) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    if features[idx::CREDIT_SCORE] < 0.6 {
        factors.push(RiskFactor {
            name: "Credit Score".to_owned(),
            impact: FactorImpact::Negative,
            description: "reported credit score is well below prime".to_owned(),
        });
    }

    if features[idx::ANNUAL_INCOME] > 0.8 {
        factors.push(RiskFactor {
            name: "Income".to_owned(),
            impact: FactorImpact::Positive,
            description: "annual income is strong relative to the book".to_owned(),
        });
    }

    if features[idx::DEBT_TO_INCOME] > 0.4 {
        factors.push(RiskFactor {
            name: "Debt-to-Income".to_owned(),
            impact: FactorImpact::Negative,
            description: "existing obligations consume a high share of income".to_owned(),
        });
    }

    if features[idx::PAYMENT_HISTORY] > 0.9 {
        factors.push(RiskFactor {
            name: "Payment History".to_owned(),
            impact: FactorImpact::Positive,
            description: "near-perfect repayment record".to_owned(),
        });
    }

    if features[idx::CREDIT_UTILIZATION] > 0.7 {
        factors.push(RiskFactor {
            name: "Credit Utilization".to_owned(),
            impact: FactorImpact::Negative,
            description: "revolving balances close to their limits".to_owned(),
        });
    }

    if features[idx::RECENT_INQUIRIES] > 0.5 {
        factors.push(RiskFactor {
            name: "Recent Inquiries".to_owned(),
            impact: FactorImpact::Negative,
            description: "several hard pulls inside the lookback window".to_owned(),
        });
    }

    factors
}

fn recommend(credit_score: u16, features: &FeatureVector) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if credit_score < 650 {
        recommendations.push(Recommendation {
            code: RecommendationCode::RequireCosigner,
            priority: RecommendationPriority::High,
            message: "request a co-signer or additional collateral before proceeding".to_owned(),
        });
    }

    if features[idx::DEBT_TO_INCOME] > 0.4 {
        recommendations.push(Recommendation {
            code: RecommendationCode::ReduceLoanAmount,
            priority: RecommendationPriority::Medium,
            message: "consider a reduced loan amount to bring obligations in line".to_owned(),
        });
    }

    if credit_score >= 750 {
        recommendations.push(Recommendation {
            code: RecommendationCode::ApproveStandard,
            priority: RecommendationPriority::Low,
            message: "approve with standard terms".to_owned(),
        });
    }

    recommendations
}
