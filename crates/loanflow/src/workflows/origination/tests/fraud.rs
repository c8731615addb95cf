use crate::workflows::origination::assessment::fraud::{
    evaluate, FraudRiskLevel, ProcessingRecommendation,
};
use crate::workflows::origination::domain::{ApplicantProfile, FinancialSnapshot};

fn applicant() -> ApplicantProfile {
    ApplicantProfile {
        full_name: "Morgan Blake".to_string(),
        email: None,
        age: Some(35),
        employment_years: Some(8.0),
        months_at_current_address: Some(36),
    }
}

fn financial() -> FinancialSnapshot {
    FinancialSnapshot {
        credit_score: Some(700),
        annual_income: Some(90_000.0),
        debt_to_income: Some(0.25),
        payment_history_score: Some(85.0),
        credit_utilization: Some(0.3),
        open_accounts: Some(6),
        recent_inquiries: Some(2),
    }
}

#[test]
fn clean_profile_scores_zero() {
    let assessment = evaluate(&applicant(), &financial());

    assert_eq!(assessment.fraud_score, 0);
    assert_eq!(assessment.risk_level, FraudRiskLevel::Low);
    assert!(assessment.risk_factors.is_empty());
    assert_eq!(
        assessment.recommendation,
        ProcessingRecommendation::AutomatedProcessing
    );
}

#[test]
fn high_income_with_short_employment_plus_inquiry_spike_is_medium() {
    let mut applicant = applicant();
    applicant.employment_years = Some(0.5);
    let mut financial = financial();
    financial.annual_income = Some(250_000.0);
    financial.recent_inquiries = Some(6);

    let assessment = evaluate(&applicant, &financial);

    // 30 (income/employment) + 15 (inquiries): over 25 but not over 50.
    assert_eq!(assessment.fraud_score, 45);
    assert_eq!(assessment.risk_level, FraudRiskLevel::Medium);
    assert_eq!(assessment.risk_factors.len(), 2);
    assert_eq!(
        assessment.recommendation,
        ProcessingRecommendation::AutomatedProcessing
    );
}

#[test]
fn all_rules_firing_escalates_to_manual_review() {
    let applicant = ApplicantProfile {
        full_name: "Alex Crane".to_string(),
        email: None,
        age: Some(19),
        employment_years: Some(0.4),
        months_at_current_address: Some(3),
    };
    let financial = FinancialSnapshot {
        credit_score: Some(780),
        annual_income: Some(250_000.0),
        debt_to_income: Some(0.2),
        payment_history_score: Some(90.0),
        credit_utilization: Some(0.1),
        open_accounts: Some(4),
        recent_inquiries: Some(7),
    };

    let assessment = evaluate(&applicant, &financial);

    assert_eq!(assessment.fraud_score, 30 + 10 + 20 + 15);
    assert_eq!(assessment.risk_level, FraudRiskLevel::High);
    assert_eq!(assessment.risk_factors.len(), 4);
    assert_eq!(
        assessment.recommendation,
        ProcessingRecommendation::ManualReview
    );
}

#[test]
fn rules_with_absent_inputs_do_not_fire() {
    let applicant = ApplicantProfile {
        full_name: "Unknown Fields".to_string(),
        email: None,
        age: None,
        employment_years: None,
        months_at_current_address: None,
    };
    let financial = FinancialSnapshot {
        // High income alone is not enough without an employment length.
        annual_income: Some(250_000.0),
        ..FinancialSnapshot::default()
    };

    let assessment = evaluate(&applicant, &financial);

    assert_eq!(assessment.fraud_score, 0);
    assert_eq!(assessment.risk_level, FraudRiskLevel::Low);
}

#[test]
fn rule_boundaries_are_strict() {
    let mut applicant = applicant();
    applicant.months_at_current_address = Some(6);
    let mut financial = financial();
    financial.recent_inquiries = Some(5);

    // Exactly six months and exactly five inquiries sit outside both rules.
    let assessment = evaluate(&applicant, &financial);
    assert_eq!(assessment.fraud_score, 0);

    applicant.months_at_current_address = Some(5);
    financial.recent_inquiries = Some(6);
    let assessment = evaluate(&applicant, &financial);
    assert_eq!(assessment.fraud_score, 10 + 15);
}

#[test]
fn scoring_is_additive_and_order_independent() {
    // Each rule contributes its fixed value regardless of the others; the
    // banding depends only on the sum.
    let mut applicant = applicant();
    applicant.months_at_current_address = Some(2);
    let financial = financial();

    let assessment = evaluate(&applicant, &financial);
    assert_eq!(assessment.fraud_score, 10);
    assert_eq!(assessment.risk_level, FraudRiskLevel::Low);

    let mut financial = financial;
    financial.recent_inquiries = Some(9);
    let assessment = evaluate(&applicant, &financial);
    assert_eq!(assessment.fraud_score, 10 + 15);
    assert_eq!(assessment.risk_level, FraudRiskLevel::Low);
}
