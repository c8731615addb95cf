use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::origination::assessment::{AssessmentEngine, RiskModel};
use crate::workflows::origination::domain::{
    Actor, ActorId, ApplicantProfile, Application, ApplicationId, ApplicationStatus,
    FinancialSnapshot, LoanPurpose, LoanRequest, Role,
};
use crate::workflows::origination::repository::{
    ActorDirectory, ApplicationRepository, RepositoryError,
};
use crate::workflows::origination::router::{application_router, OriginationState};
use crate::workflows::origination::service::{ApplicationIntake, LoanApplicationService};
use crate::workflows::origination::throttle::Clock;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn admin() -> Actor {
    Actor::with_role(ActorId("admin-1".to_string()), "Avery Okafor", Role::Admin)
}

pub(super) fn underwriter() -> Actor {
    Actor::with_role(
        ActorId("uw-1".to_string()),
        "Riley Donovan",
        Role::Underwriter,
    )
}

pub(super) fn analyst() -> Actor {
    Actor::with_role(ActorId("analyst-1".to_string()), "Sam Vo", Role::Analyst)
}

pub(super) fn viewer() -> Actor {
    Actor::with_role(ActorId("viewer-1".to_string()), "Quinn Harper", Role::Viewer)
}

/// Intake for a well-qualified applicant: prime credit, strong income, low
/// leverage.
pub(super) fn strong_intake() -> ApplicationIntake {
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

/// Intake for a marginal applicant: subprime credit, thin income, heavy
/// revolving usage.
pub(super) fn weak_intake() -> ApplicationIntake {
    ApplicationIntake {
        applicant: ApplicantProfile {
            full_name: "Casey Reyes".to_string(),
            email: None,
            age: Some(28),
            employment_years: Some(2.0),
            months_at_current_address: Some(10),
        },
        loan: LoanRequest {
            amount: Some(250_000.0),
            term_years: Some(15.0),
            purpose: Some(LoanPurpose::Vacation),
            collateral_value: None,
        },
        financial: FinancialSnapshot {
            credit_score: Some(400),
            annual_income: Some(30_000.0),
            debt_to_income: Some(0.55),
            payment_history_score: Some(50.0),
            credit_utilization: Some(0.85),
            open_accounts: Some(12),
            recent_inquiries: Some(8),
        },
    }
}

/// Fresh draft entity for exercising the state machine directly.
pub(super) fn draft_application(suffix: &str) -> Application {
    let intake = strong_intake();
    Application::draft(
        ApplicationId(format!("LN-{suffix}")),
        1,
        intake.applicant,
        intake.loan,
        intake.financial,
        fixed_now(),
    )
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
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

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _application: Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_status(
        &self,
        _status: ApplicationStatus,
        _limit: usize,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    actors: Arc<Mutex<HashMap<ActorId, Actor>>>,
}

impl MemoryDirectory {
    pub(super) fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.actors.lock().expect("directory mutex poisoned");
            for actor in actors {
                guard.insert(actor.id.clone(), actor);
            }
        }
        directory
    }
}

impl ActorDirectory for MemoryDirectory {
    fn fetch(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError> {
        let guard = self.actors.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) fn build_service() -> (
    Arc<LoanApplicationService<MemoryRepository>>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let engine = Arc::new(AssessmentEngine::new(RiskModel::deterministic()));
    let service = Arc::new(LoanApplicationService::new(repository.clone(), engine));
    (service, repository)
}

pub(super) fn build_router() -> axum::Router {
    let (service, _) = build_service();
    let directory = Arc::new(MemoryDirectory::with_actors([
        admin(),
        underwriter(),
        analyst(),
        viewer(),
    ]));
    application_router(OriginationState::new(service, directory))
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Clock whose readings are driven by the test.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
