use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicantProfile, FinancialSnapshot, LoanRequest};

pub const FEATURE_COUNT: usize = 12;

/// Positional indexes into the feature vector, shared with the scoring
/// weights and factor thresholds.
pub mod idx {
    pub const CREDIT_SCORE: usize = 0;
    pub const ANNUAL_INCOME: usize = 1;
    pub const DEBT_TO_INCOME: usize = 2;
    pub const EMPLOYMENT_YEARS: usize = 3;
    pub const LOAN_AMOUNT: usize = 4;
    pub const LOAN_TERM: usize = 5;
    pub const PAYMENT_HISTORY: usize = 6;
    pub const CREDIT_UTILIZATION: usize = 7;
    pub const OPEN_ACCOUNTS: usize = 8;
    pub const RECENT_INQUIRIES: usize = 9;
    pub const COLLATERAL_VALUE: usize = 10;
    pub const LOAN_PURPOSE: usize = 11;
}

/// Fixed-length normalized encoding of applicant, loan, and financial data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

const DEFAULT_CREDIT_SCORE: f64 = 600.0;
const DEFAULT_ANNUAL_INCOME: f64 = 50_000.0;
const DEFAULT_DEBT_TO_INCOME: f64 = 0.3;
const DEFAULT_EMPLOYMENT_YEARS: f64 = 2.0;
const DEFAULT_LOAN_AMOUNT: f64 = 50_000.0;
const DEFAULT_LOAN_TERM_YEARS: f64 = 15.0;
const DEFAULT_PAYMENT_HISTORY: f64 = 80.0;
const DEFAULT_CREDIT_UTILIZATION: f64 = 0.3;
const DEFAULT_OPEN_ACCOUNTS: f64 = 5.0;
const DEFAULT_RECENT_INQUIRIES: f64 = 2.0;
const DEFAULT_PURPOSE_SCORE: f64 = 5.0;

/// Map raw application data onto the 12-feature vector.
///
/// Missing or non-finite inputs fall back to the documented defaults; the
/// extractor never errors on incomplete data. Every feature is clamped to
/// [0, 1] after scaling (debt-to-income and utilization are already
/// fractional and pass through un-rescaled).
pub fn extract(
    applicant: &ApplicantProfile,
    loan: &LoanRequest,
    financial: &FinancialSnapshot,
) -> FeatureVector {
    let credit_score = financial
        .credit_score
        .map(f64::from)
        .unwrap_or(DEFAULT_CREDIT_SCORE);
    let annual_income = finite_or(financial.annual_income, DEFAULT_ANNUAL_INCOME);
    let debt_to_income = finite_or(financial.debt_to_income, DEFAULT_DEBT_TO_INCOME);
    let employment_years = finite_or(applicant.employment_years, DEFAULT_EMPLOYMENT_YEARS);
    let loan_amount = finite_or(loan.amount, DEFAULT_LOAN_AMOUNT);
    let term_years = finite_or(loan.term_years, DEFAULT_LOAN_TERM_YEARS);
    let payment_history = finite_or(financial.payment_history_score, DEFAULT_PAYMENT_HISTORY);
    let utilization = finite_or(financial.credit_utilization, DEFAULT_CREDIT_UTILIZATION);
    let open_accounts = financial
        .open_accounts
        .map(f64::from)
        .unwrap_or(DEFAULT_OPEN_ACCOUNTS);
    let inquiries = financial
        .recent_inquiries
        .map(f64::from)
        .unwrap_or(DEFAULT_RECENT_INQUIRIES);
    let collateral = finite_or(loan.collateral_value, 0.0);
    let purpose_score = loan
        .purpose
        .map(|purpose| purpose.category_score())
        .unwrap_or(DEFAULT_PURPOSE_SCORE);

    FeatureVector([
        unit(credit_score / 800.0),
        unit(annual_income / 200_000.0),
        unit(debt_to_income),
        unit(employment_years / 20.0),
        unit(loan_amount / 500_000.0),
        unit(term_years / 30.0),
        unit(payment_history / 100.0),
        unit(utilization),
        unit(open_accounts / 20.0),
        unit(inquiries / 10.0),
        unit(collateral / 1_000_000.0),
        unit(purpose_score / 10.0),
    ])
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

fn unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
