use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::origination::router::ACTOR_HEADER;

fn post_json(uri: &str, actor: Option<&str>, payload: &Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder
        .body(Body::from(serde_json::to_vec(payload).expect("serialize")))
        .expect("request builds")
}

fn post_empty(uri: &str, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder.body(Body::empty()).expect("request builds")
}

fn get(uri: &str, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder.body(Body::empty()).expect("request builds")
}

fn intake_payload() -> Value {
    serde_json::to_value(strong_intake()).expect("intake serializes")
}

async fn create_application(router: &axum::Router, actor: &str) -> String {
    let response = router
        .clone()
        .oneshot(post_json("/api/v1/loan/applications", Some(actor), &intake_payload()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    body["application_id"]
        .as_str()
        .expect("application id present")
        .to_string()
}

#[tokio::test]
async fn requests_without_actor_header_are_unauthorized() {
    let router = build_router();

    let response = router
        .oneshot(post_json("/api/v1/loan/applications", None, &intake_payload()))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_actors_are_unauthorized() {
    let router = build_router();

    let response = router
        .oneshot(post_json(
            "/api/v1/loan/applications",
            Some("ghost-9"),
            &intake_payload(),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewers_cannot_create_applications() {
    let router = build_router();

    let response = router
        .oneshot(post_json(
            "/api/v1/loan/applications",
            Some("viewer-1"),
            &intake_payload(),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_returns_a_draft_view() {
    let router = build_router();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/loan/applications",
            Some("analyst-1"),
            &intake_payload(),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "draft");
    assert_eq!(body["audit_entries"], 1);
    assert!(body["application_id"]
        .as_str()
        .expect("id present")
        .starts_with("LN-"));
}

#[tokio::test]
async fn lifecycle_routes_drive_an_application_to_approval() {
    let router = build_router();
    let id = create_application(&router, "analyst-1").await;

    let response = router
        .clone()
        .oneshot(post_empty(
            &format!("/api/v1/loan/applications/{id}/submit"),
            Some("analyst-1"),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "submitted");

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/loan/applications/{id}/assign"),
            Some("uw-1"),
            &json!({ "assignee": "uw-1" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "under_review");

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/loan/applications/{id}/decision"),
            Some("uw-1"),
            &json!({ "outcome": "approved", "reason": "strong file" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "approved");

    // Finalized applications reject further edits.
    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/loan/applications/{id}/updates"),
            Some("analyst-1"),
            &json!({ "loan_amount": 100000.0 }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn empty_updates_are_unprocessable() {
    let router = build_router();
    let id = create_application(&router, "analyst-1").await;

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/loan/applications/{id}/updates"),
            Some("analyst-1"),
            &json!({}),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn analyze_route_returns_the_assessment() {
    let router = build_router();
    let id = create_application(&router, "analyst-1").await;

    let response = router
        .clone()
        .oneshot(post_empty(
            &format!("/api/v1/loan/applications/{id}/analyze"),
            Some("analyst-1"),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body["model_version"],
        crate::workflows::origination::MODEL_VERSION
    );
    assert!(body["risk"]["credit_score"].as_u64().expect("score") >= 750);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/loan/applications/{id}"), Some("viewer-1")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["risk_band"], "LOW");
}

#[tokio::test]
async fn anonymous_status_requests_see_a_sanitized_view() {
    let router = build_router();
    let id = create_application(&router, "analyst-1").await;

    let response = router
        .oneshot(get(&format!("/api/v1/loan/applications/{id}"), None))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["application_id"], id);
    assert_eq!(body["status"], "pending");
    assert!(body.get("risk_band").is_none() || body["risk_band"].is_null());
}

#[tokio::test]
async fn batch_route_reports_per_application_outcomes() {
    let router = build_router();
    let id = create_application(&router, "analyst-1").await;

    let response = router
        .oneshot(post_json(
            "/api/v1/loan/applications/analyze-batch",
            Some("analyst-1"),
            &json!({ "ids": [id, "LN-999999"] }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let results = body["results"].as_array().expect("results array");
    assert_eq!(results.len(), 2);
    assert!(results[0]["assessment"].is_object());
    assert_eq!(results[1]["error"], "application not found");
}

#[tokio::test]
async fn repeated_auth_failures_from_one_source_are_throttled() {
    use crate::workflows::origination::router::MAX_FAILED_RESOLUTIONS;

    let router = build_router();

    for _ in 0..MAX_FAILED_RESOLUTIONS {
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/loan/applications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-forwarded-for", "198.51.100.4")
                    .header(ACTOR_HEADER, "ghost-9")
                    .body(Body::from(
                        serde_json::to_vec(&intake_payload()).expect("serialize"),
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/loan/applications")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "198.51.100.4")
                .header(ACTOR_HEADER, "ghost-9")
                .body(Body::from(
                    serde_json::to_vec(&intake_payload()).expect("serialize"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Other sources keep their own budget.
    let response = router
        .oneshot(
            Request::post("/api/v1/loan/applications")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "198.51.100.5")
                .header(ACTOR_HEADER, "analyst-1")
                .body(Body::from(
                    serde_json::to_vec(&intake_payload()).expect("serialize"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn status_for_missing_application_is_not_found() {
    let router = build_router();

    let response = router
        .oneshot(get("/api/v1/loan/applications/LN-404404", Some("viewer-1")))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
