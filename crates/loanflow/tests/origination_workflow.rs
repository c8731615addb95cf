use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use loanflow::workflows::origination::{
    ActorId, ApplicantProfile, Application, ApplicationId, ApplicationIntake, ApplicationRepository,
    ApplicationStatus, AssessmentEngine, DecisionOutcome, DocumentCategory, DocumentUpload,
    FinancialSnapshot, LoanApplicationService, LoanPurpose, LoanRequest, NoteCategory,
    RepositoryError, RiskModel, Role,
};

#[derive(Default)]
struct MemoryRepository {
    records: Mutex<HashMap<ApplicationId, Application>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&application.id) {
            Some(stored) if application.version == stored.version + 1 => {
                guard.insert(application.id.clone(), application);
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn by_status(
        &self,
        status: ApplicationStatus,
        limit: usize,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| application.status == status)
            .take(limit)
            .cloned()
            .collect())
    }
}

fn intake() -> ApplicationIntake {
    ApplicationIntake {
        applicant: ApplicantProfile {
            full_name: "Dana Whitfield".to_string(),
            email: Some("dana@example.com".to_string()),
            age: Some(41),
            employment_years: Some(12.0),
            months_at_current_address: Some(60),
        },
        loan: LoanRequest {
            amount: Some(320_000.0),
            term_years: Some(30.0),
            purpose: Some(LoanPurpose::HomePurchase),
            collateral_value: Some(400_000.0),
        },
        financial: FinancialSnapshot {
            credit_score: Some(720),
            annual_income: Some(140_000.0),
            debt_to_income: Some(0.22),
            payment_history_score: Some(92.0),
            credit_utilization: Some(0.25),
            open_accounts: Some(7),
            recent_inquiries: Some(2),
        },
    }
}

#[test]
fn an_application_walks_the_full_review_path() {
    let repository = Arc::new(MemoryRepository::default());
    let engine = Arc::new(AssessmentEngine::new(RiskModel::deterministic()));
    let service = LoanApplicationService::new(repository.clone(), engine);

    let analyst = loanflow::workflows::origination::Actor::with_role(
        ActorId("analyst-7".to_string()),
        "Priya Nair",
        Role::Analyst,
    );
    let underwriter = loanflow::workflows::origination::Actor::with_role(
        ActorId("uw-3".to_string()),
        "Marcus Webb",
        Role::Underwriter,
    );

    let record = service
        .create(intake(), &analyst, None)
        .expect("draft created");
    assert_eq!(record.status, ApplicationStatus::Draft);

    service
        .submit(&record.id, &analyst, None)
        .expect("submitted");
    service
        .assign(&record.id, underwriter.id.clone(), &underwriter, None)
        .expect("assigned");
    service
        .request_documents(
            &record.id,
            "need a current bank statement".to_string(),
            &underwriter,
            None,
        )
        .expect("documents requested");

    let pending = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(pending.status, ApplicationStatus::PendingDocuments);

    service
        .attach_document(
            &record.id,
            DocumentUpload {
                name: "Bank statement June".to_string(),
                category: DocumentCategory::BankStatement,
                storage_key: "s3://loanflow/docs/dana/statement.pdf".to_string(),
            },
            &analyst,
            None,
        )
        .expect("document attached");
    service
        .add_note(
            &record.id,
            NoteCategory::Documents,
            "statement verified against declared income".to_string(),
            &underwriter,
            None,
        )
        .expect("note added");

    let assessment = service
        .analyze(&record.id, &underwriter, None)
        .expect("analyzed");
    assert!((300..=850).contains(&assessment.risk.credit_score));

    service
        .decide(
            &record.id,
            DecisionOutcome::Approved,
            "qualified borrower with verified documents".to_string(),
            vec!["maintain homeowners insurance".to_string()],
            &underwriter,
            None,
        )
        .expect("approved");

    let stored = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.documents.len(), 1);
    assert!(stored.assessment.is_some());

    let labels: Vec<&str> = stored
        .audit_trail
        .iter()
        .map(|entry| entry.action.label())
        .collect();
    assert_eq!(
        labels,
        vec![
            "application_created",
            "application_submitted",
            "application_assigned",
            "documents_requested",
            "document_uploaded",
            "note_added",
            "assessment_completed",
            "application_approved",
        ]
    );

    // Terminal applications stay terminal.
    let result = service.withdraw(&record.id, &analyst, None);
    assert!(result.is_err());
    let unchanged = repository
        .fetch(&record.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(unchanged.audit_trail.len(), stored.audit_trail.len());
    assert_eq!(unchanged.completed_at, stored.completed_at);
}
