use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use loanflow::workflows::origination::{
    Actor, ActorDirectory, ActorId, Application, ApplicationId, ApplicationRepository,
    ApplicationStatus, RepositoryError, Role,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryActorDirectory {
    actors: Arc<Mutex<HashMap<ActorId, Actor>>>,
}

impl InMemoryActorDirectory {
    pub(crate) fn seeded() -> Self {
        let directory = Self::default();
        directory.register(Actor::with_role(
            ActorId("admin-1".to_string()),
            "Platform Admin",
            Role::Admin,
        ));
        directory.register(Actor::with_role(
            ActorId("uw-1".to_string()),
            "Senior Underwriter",
            Role::Underwriter,
        ));
        directory.register(Actor::with_role(
            ActorId("analyst-1".to_string()),
            "Intake Analyst",
            Role::Analyst,
        ));
        directory.register(Actor::with_role(
            ActorId("viewer-1".to_string()),
            "Read-only Auditor",
            Role::Viewer,
        ));
        directory
    }

    pub(crate) fn register(&self, actor: Actor) {
        let mut guard = self.actors.lock().expect("directory mutex poisoned");
        guard.insert(actor.id.clone(), actor);
    }
}

impl ActorDirectory for InMemoryActorDirectory {
    fn fetch(&self, id: &ActorId) -> Result<Option<Actor>, RepositoryError> {
        let guard = self.actors.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}
