use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, ActorId, Application, ApplicationId, DecisionOutcome, NoteCategory, RequestContext,
};
use super::lifecycle::{DocumentUpload, FieldUpdate, TransitionError};
use super::repository::{
    ActorDirectory, ApplicationRepository, ApplicationStatusView, RepositoryError,
};
use super::service::{ApplicationIntake, LoanApplicationService, OriginationError};
use super::throttle::{AttemptTracker, SystemClock};

/// Shared router state: the service, the directory used to resolve the
/// already-authenticated actor id carried in request headers, and the
/// attempt tracker throttling repeated resolution failures per source.
pub struct OriginationState<R, D> {
    pub service: Arc<LoanApplicationService<R>>,
    pub directory: Arc<D>,
    pub throttle: Arc<AttemptTracker>,
}

impl<R, D> OriginationState<R, D> {
    pub fn new(service: Arc<LoanApplicationService<R>>, directory: Arc<D>) -> Self {
        let throttle = Arc::new(AttemptTracker::new(
            chrono::Duration::minutes(15),
            MAX_FAILED_RESOLUTIONS,
            Arc::new(SystemClock),
        ));
        Self::with_throttle(service, directory, throttle)
    }

    pub fn with_throttle(
        service: Arc<LoanApplicationService<R>>,
        directory: Arc<D>,
        throttle: Arc<AttemptTracker>,
    ) -> Self {
        Self {
            service,
            directory,
            throttle,
        }
    }
}

impl<R, D> Clone for OriginationState<R, D> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            directory: Arc::clone(&self.directory),
            throttle: Arc::clone(&self.throttle),
        }
    }
}

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Failed actor resolutions allowed per source inside the moving window.
pub const MAX_FAILED_RESOLUTIONS: u32 = 10;

/// Router builder exposing the origination workflow endpoints.
pub fn application_router<R, D>(state: OriginationState<R, D>) -> Router
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    Router::new()
        .route("/api/v1/loan/applications", post(create_handler::<R, D>))
        .route(
            "/api/v1/loan/applications/analyze-batch",
            post(analyze_batch_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id",
            get(status_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/submit",
            post(submit_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/assign",
            post(assign_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/updates",
            post(update_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/request-documents",
            post(request_documents_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/documents",
            post(document_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/notes",
            post(note_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/decision",
            post(decision_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/withdraw",
            post(withdraw_handler::<R, D>),
        )
        .route(
            "/api/v1/loan/applications/:application_id/analyze",
            post(analyze_handler::<R, D>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) assignee: ActorId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoteRequest {
    pub(crate) category: NoteCategory,
    pub(crate) body: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) outcome: DecisionOutcome,
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) conditions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestDocumentsRequest {
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchAnalyzeRequest {
    pub(crate) ids: Vec<ApplicationId>,
}

fn source_key(headers: &HeaderMap) -> String {
    let source = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");
    format!("auth:{source}")
}

/// Resolve the authenticated actor or reject the request.
///
/// Failed resolutions are counted per source; a source that keeps failing
/// inside the moving window is cut off before the directory is consulted.
fn resolve_actor<D: ActorDirectory>(
    directory: &D,
    throttle: &AttemptTracker,
    headers: &HeaderMap,
) -> Result<Actor, Response> {
    let key = source_key(headers);
    if throttle.is_limited(&key) {
        return Err(too_many_attempts());
    }

    let id = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| ActorId(value.to_owned()));

    let id = match id {
        Some(id) => id,
        None => {
            throttle.record(&key);
            return Err(unauthorized("missing actor header"));
        }
    };

    match directory.fetch(&id) {
        Ok(Some(actor)) => Ok(actor),
        Ok(None) => {
            throttle.record(&key);
            Err(unauthorized("unknown actor"))
        }
        Err(error) => Err(error_response(OriginationError::Repository(error))),
    }
}

/// Optional-authentication variant used by the read-only status endpoint:
/// resolution failures are discarded and treated as "no actor".
fn resolve_actor_optional<D: ActorDirectory>(directory: &D, headers: &HeaderMap) -> Option<Actor> {
    let id = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| ActorId(value.to_owned()))?;

    directory.fetch(&id).ok().flatten()
}

fn request_context(headers: &HeaderMap) -> Option<RequestContext> {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if ip.is_none() && user_agent.is_none() {
        None
    } else {
        Some(RequestContext { ip, user_agent })
    }
}

fn unauthorized(detail: &str) -> Response {
    let payload = json!({ "error": detail });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn too_many_attempts() -> Response {
    let payload = json!({ "error": "too many failed authentication attempts" });
    (StatusCode::TOO_MANY_REQUESTS, axum::Json(payload)).into_response()
}

fn error_response(error: OriginationError) -> Response {
    let status = match &error {
        OriginationError::NotFound => StatusCode::NOT_FOUND,
        OriginationError::Transition(TransitionError::Unauthorized { .. }) => {
            StatusCode::FORBIDDEN
        }
        OriginationError::Transition(TransitionError::IllegalTransition { .. }) => {
            StatusCode::CONFLICT
        }
        OriginationError::Transition(TransitionError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OriginationError::Scoring(_) => StatusCode::SERVICE_UNAVAILABLE,
        OriginationError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        OriginationError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        OriginationError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn view_response(status: StatusCode, application: &Application) -> Response {
    (status, axum::Json(ApplicationStatusView::of(application))).into_response()
}

pub(crate) async fn create_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    axum::Json(intake): axum::Json<ApplicationIntake>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match state
        .service
        .create(intake, &actor, request_context(&headers))
    {
        Ok(application) => view_response(StatusCode::CREATED, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let id = ApplicationId(application_id);

    let actor = match resolve_actor_optional(state.directory.as_ref(), &headers) {
        Some(actor) => actor,
        None => {
            // Anonymous callers learn nothing beyond the id they supplied.
            let payload = json!({
                "application_id": id.0,
                "status": "pending",
                "decision_rationale": "authentication required for full status",
            });
            return (StatusCode::OK, axum::Json(payload)).into_response();
        }
    };

    match state.service.get(&id, &actor) {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state.service.submit(&id, &actor, request_context(&headers)) {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<AssignRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state
        .service
        .assign(&id, payload.assignee, &actor, request_context(&headers))
    {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(update): axum::Json<FieldUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state
        .service
        .update_fields(&id, update, &actor, request_context(&headers))
    {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn request_documents_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<RequestDocumentsRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state
        .service
        .request_documents(&id, payload.reason, &actor, request_context(&headers))
    {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn document_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(upload): axum::Json<DocumentUpload>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state
        .service
        .attach_document(&id, upload, &actor, request_context(&headers))
    {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn note_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<NoteRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state.service.add_note(
        &id,
        payload.category,
        payload.body,
        &actor,
        request_context(&headers),
    ) {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decision_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<DecisionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state.service.decide(
        &id,
        payload.outcome,
        payload.reason,
        payload.conditions,
        &actor,
        request_context(&headers),
    ) {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state
        .service
        .withdraw(&id, &actor, request_context(&headers))
    {
        Ok(application) => view_response(StatusCode::OK, &application),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn analyze_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = ApplicationId(application_id);

    match state
        .service
        .analyze(&id, &actor, request_context(&headers))
    {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn analyze_batch_handler<R, D>(
    State(state): State<OriginationState<R, D>>,
    headers: HeaderMap,
    axum::Json(batch): axum::Json<BatchAnalyzeRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    D: ActorDirectory + 'static,
{
    let actor = match resolve_actor(state.directory.as_ref(), state.throttle.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let outcomes = state
        .service
        .analyze_batch(&batch.ids, &actor, request_context(&headers));

    let results: Vec<serde_json::Value> = outcomes
        .into_iter()
        .map(|(id, outcome)| match outcome {
            Ok(assessment) => json!({
                "application_id": id.0,
                "assessment": assessment,
            }),
            Err(error) => json!({
                "application_id": id.0,
                "error": error.to_string(),
            }),
        })
        .collect();

    (StatusCode::OK, axum::Json(json!({ "results": results }))).into_response()
}
