use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicantProfile, FinancialSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudRiskLevel {
    Low,
    Medium,
    High,
}

impl FraudRiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            FraudRiskLevel::Low => "LOW",
            FraudRiskLevel::Medium => "MEDIUM",
            FraudRiskLevel::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingRecommendation {
    AutomatedProcessing,
    ManualReview,
}

/// Outcome of the rule-based fraud screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub fraud_score: u32,
    pub risk_level: FraudRiskLevel,
    pub risk_factors: Vec<String>,
    pub recommendation: ProcessingRecommendation,
}

const HIGH_INCOME_THRESHOLD: f64 = 200_000.0;
const SHORT_EMPLOYMENT_YEARS: f64 = 1.0;
const SHORT_RESIDENCE_MONTHS: u32 = 6;
const YOUNG_APPLICANT_AGE: u8 = 21;
const PRIME_CREDIT_SCORE: u16 = 750;
const INQUIRY_SPIKE: u32 = 5;

/// Additive, order-independent rule set over raw applicant data.
///
/// Every applicable rule fires and contributes its fixed point value; rules
/// whose inputs are absent simply do not fire.
pub fn evaluate(applicant: &ApplicantProfile, financial: &FinancialSnapshot) -> FraudAssessment {
    let mut fraud_score = 0u32;
    let mut risk_factors = Vec::new();

    if let (Some(income), Some(employment)) =
        (financial.annual_income, applicant.employment_years)
    {
        if income > HIGH_INCOME_THRESHOLD && employment < SHORT_EMPLOYMENT_YEARS {
            fraud_score += 30;
            risk_factors.push("high income with short employment history".to_owned());
        }
    }

    if let Some(months) = applicant.months_at_current_address {
        if months < SHORT_RESIDENCE_MONTHS {
            fraud_score += 10;
            risk_factors.push("less than six months at current address".to_owned());
        }
    }

    if let (Some(age), Some(credit)) = (applicant.age, financial.credit_score) {
        if age < YOUNG_APPLICANT_AGE && credit > PRIME_CREDIT_SCORE {
            fraud_score += 20;
            risk_factors.push("prime credit score at an unusually young age".to_owned());
        }
    }

    if let Some(inquiries) = financial.recent_inquiries {
        if inquiries > INQUIRY_SPIKE {
            fraud_score += 15;
            risk_factors.push("spike in recent credit inquiries".to_owned());
        }
    }

    let risk_level = if fraud_score > 50 {
        FraudRiskLevel::High
    } else if fraud_score > 25 {
        FraudRiskLevel::Medium
    } else {
        FraudRiskLevel::Low
    };

    let recommendation = if fraud_score > 50 {
        ProcessingRecommendation::ManualReview
    } else {
        ProcessingRecommendation::AutomatedProcessing
    };

    FraudAssessment {
        fraud_score,
        risk_level,
        risk_factors,
        recommendation,
    }
}
