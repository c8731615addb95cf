use crate::infra::{InMemoryActorDirectory, InMemoryApplicationRepository};
use clap::Args;
use loanflow::error::AppError;
use loanflow::workflows::origination::{
    ActorDirectory, ActorId, ApplicantProfile, ApplicationIntake, ApplicationStatusView,
    AssessmentEngine, DecisionOutcome, FinancialSnapshot, LoanApplicationService, LoanPurpose,
    LoanRequest, OriginationError, RiskModel,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Walk the denial path instead of an approval.
    #[arg(long)]
    pub(crate) deny: bool,
    /// Use the randomized scoring model instead of the deterministic one.
    #[arg(long)]
    pub(crate) randomized: bool,
}

fn demo_intake(deny: bool) -> ApplicationIntake {
    if deny {
        ApplicationIntake {
            applicant: ApplicantProfile {
                full_name: "Casey Reyes".to_string(),
                email: None,
                age: Some(28),
                employment_years: Some(1.5),
                months_at_current_address: Some(8),
            },
            loan: LoanRequest {
                amount: Some(250_000.0),
                term_years: Some(20.0),
                purpose: Some(LoanPurpose::Vacation),
                collateral_value: None,
            },
            financial: FinancialSnapshot {
                credit_score: Some(430),
                annual_income: Some(32_000.0),
                debt_to_income: Some(0.52),
                payment_history_score: Some(55.0),
                credit_utilization: Some(0.88),
                open_accounts: Some(11),
                recent_inquiries: Some(7),
            },
        }
    } else {
        ApplicationIntake {
            applicant: ApplicantProfile {
                full_name: "Jordan Miles".to_string(),
                email: Some("jordan.miles@example.com".to_string()),
                age: Some(34),
                employment_years: Some(10.0),
                months_at_current_address: Some(48),
            },
            loan: LoanRequest {
                amount: Some(200_000.0),
                term_years: Some(15.0),
                purpose: Some(LoanPurpose::HomePurchase),
                collateral_value: Some(300_000.0),
            },
            financial: FinancialSnapshot {
                credit_score: Some(750),
                annual_income: Some(180_000.0),
                debt_to_income: Some(0.1),
                payment_history_score: Some(95.0),
                credit_utilization: Some(0.2),
                open_accounts: Some(5),
                recent_inquiries: Some(1),
            },
        }
    }
}

fn print_view(step: &str, view: &ApplicationStatusView) {
    match serde_json::to_string_pretty(view) {
        Ok(rendered) => println!("== {step}\n{rendered}"),
        Err(err) => println!("== {step} (render failed: {err})"),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let directory = InMemoryActorDirectory::seeded();
    let model = if args.randomized {
        RiskModel::randomized()
    } else {
        RiskModel::deterministic()
    };
    let service = LoanApplicationService::new(repository, Arc::new(AssessmentEngine::new(model)));

    let analyst = directory
        .fetch(&ActorId("analyst-1".to_string()))
        .map_err(OriginationError::from)?
        .ok_or(OriginationError::NotFound)?;
    let underwriter = directory
        .fetch(&ActorId("uw-1".to_string()))
        .map_err(OriginationError::from)?
        .ok_or(OriginationError::NotFound)?;

    let record = service.create(demo_intake(args.deny), &analyst, None)?;
    print_view("draft created", &ApplicationStatusView::of(&record));

    let record = service.submit(&record.id, &analyst, None)?;
    print_view("submitted", &ApplicationStatusView::of(&record));

    let record = service.assign(&record.id, underwriter.id.clone(), &underwriter, None)?;
    print_view("assigned for review", &ApplicationStatusView::of(&record));

    let assessment = service.analyze(&record.id, &underwriter, None)?;
    println!(
        "== assessment: credit score {} ({}), fraud {} ({})",
        assessment.risk.credit_score,
        assessment.risk.band.label(),
        assessment.fraud.fraud_score,
        assessment.fraud.risk_level.label(),
    );

    let (outcome, reason) = if args.deny {
        (
            DecisionOutcome::Denied,
            "credit profile below policy floor".to_string(),
        )
    } else {
        (
            DecisionOutcome::Approved,
            "qualified borrower with standard terms".to_string(),
        )
    };
    let record = service.decide(&record.id, outcome, reason, Vec::new(), &underwriter, None)?;
    print_view("decision recorded", &ApplicationStatusView::of(&record));

    println!("== audit trail");
    for entry in &record.audit_trail {
        println!(
            "  {} {} by {}",
            entry.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            entry.action.label(),
            entry.performed_by,
        );
    }

    Ok(())
}
