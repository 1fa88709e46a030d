//! HTTP surface tests against the full router with an in-memory database
//! and a stubbed classifier

use amr_catalog::db::init_memory_pool;
use amr_catalog::extract::classifier::{ExtractedDraft, ExtractedHierarchy};
use amr_catalog::extract::{AcquiredContent, DocumentClassifier};
use amr_catalog::{build_router, AppState};
use amr_common::taxonomy::Taxonomy;
use amr_common::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TAXONOMY_YAML: &str = r#"
main_categories:
  Country: [Denmark, Norway, Sweden]
  Domain: [Human, Animal]
resource_type_hierarchy:
  data:
    title: Data
    sub_categories:
      omics_data:
        title: Omics data
        items: [wgs]
"#;

const ADMIN_PASSWORD: &str = "hunter2";
const ADMIN_TOKEN: &str = "test-admin-token";

/// Classifier stub returning a canned draft.
struct StubClassifier(ExtractedDraft);

#[async_trait]
impl DocumentClassifier for StubClassifier {
    async fn classify(
        &self,
        _content: &AcquiredContent,
        _taxonomy: &Taxonomy,
    ) -> Result<ExtractedDraft> {
        Ok(self.0.clone())
    }
}

async fn app_with(classifier: Option<ExtractedDraft>, taxonomy: Taxonomy) -> axum::Router {
    let pool = init_memory_pool().await.unwrap();
    let state = AppState::new(
        pool,
        Arc::new(taxonomy),
        classifier.map(|draft| Arc::new(StubClassifier(draft)) as Arc<dyn DocumentClassifier>),
        amr_catalog::fetch_client(std::time::Duration::from_secs(30)).unwrap(),
        Some(ADMIN_PASSWORD.to_string()),
        Some(ADMIN_TOKEN.to_string()),
    );
    build_router(state)
}

async fn app() -> axum::Router {
    app_with(None, Taxonomy::from_yaml_str(TAXONOMY_YAML).unwrap()).await
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", ADMIN_TOKEN).parse().unwrap(),
    );
    request
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_submission() -> Value {
    json!({
        "resource_name": "Swedish omics registry",
        "countries": ["Sweden"],
        "domains": ["Human"],
        "primary_hierarchy_path": {"resource_type": "data", "category": "omics_data"}
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app()
        .await
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "amr-catalog");
    assert_eq!(body["taxonomy_available"], true);
}

#[tokio::test]
async fn taxonomy_endpoint_serves_the_tree() {
    let response = app()
        .await
        .oneshot(Request::get("/api/taxonomy").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["resource_type_hierarchy"][0]["key"], "data");
    assert_eq!(body["countries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn empty_taxonomy_answers_service_unavailable() {
    let app = app_with(None, Taxonomy::empty()).await;
    let response = app
        .oneshot(Request::get("/api/taxonomy").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn submit_and_moderate_through_the_api() {
    let app = app().await;

    // Public submit
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/submissions", valid_submission()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let submission_id = body["submission_id"].as_i64().unwrap();
    assert_eq!(body["status"], "pending");

    // Admin queue shows it
    let response = app
        .clone()
        .oneshot(admin(
            Request::get("/api/admin/submissions?status=pending")
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    // Approve
    let uri = format!("/api/admin/submissions/{}/approve", submission_id);
    let response = app
        .clone()
        .oneshot(admin(json_request("POST", &uri, json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let external_id = body_json(response).await["data_source_id"]
        .as_str()
        .unwrap()
        .to_string();

    // The entry is publicly readable
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/resources/{}", external_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry = body_json(response).await;
    assert_eq!(entry["repository"], "Unknown");

    // Second approval of the consumed submission is a 404
    let response = app
        .oneshot(admin(json_request("POST", &uri, json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_submission_returns_the_full_violation_list() {
    let response = app()
        .await
        .oneshot(json_request(
            "POST",
            "/api/submissions",
            json!({"resource_name": "", "countries": [], "domains": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn admin_routes_require_the_token() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/admin/submissions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = Request::get("/api/admin/submissions")
        .body(Body::empty())
        .unwrap();
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer wrong-token".parse().unwrap(),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_exchanges_password_for_token() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            json!({"password": ADMIN_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["token"], ADMIN_TOKEN);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            json!({"password": "guess"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn extract_without_classifier_is_unavailable() {
    let response = app()
        .await
        .oneshot(json_request(
            "POST",
            "/api/extract",
            json!({"url": "https://example.org", "mode": "prefill"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

fn upload_request(mode: &str) -> Request<Body> {
    let text = base64::engine::general_purpose::STANDARD
        .encode("Annual report on resistance in Swedish isolates.");
    json_request(
        "POST",
        "/api/extract",
        json!({
            "file_base64": text,
            "filename": "report.txt",
            "mode": mode,
        }),
    )
}

#[tokio::test]
async fn direct_submit_with_missing_domains_falls_back_to_prefill() {
    // Classifier output missing `domains`
    let canned = ExtractedDraft {
        resource_name: Some("Swedish omics registry".to_string()),
        countries: vec!["Sweden".to_string()],
        primary_hierarchy: ExtractedHierarchy {
            level1: Some("data".to_string()),
            level2: Some("omics_data".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let app = app_with(
        Some(canned),
        Taxonomy::from_yaml_str(TAXONOMY_YAML).unwrap(),
    )
    .await;

    let response = app
        .clone()
        .oneshot(upload_request("direct_submit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["action"], "prefill");
    assert_eq!(body["missing"], json!(["domains"]));

    // No pending record was created
    let response = app
        .oneshot(admin(
            Request::get("/api/admin/submissions")
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn complete_extraction_direct_submits_to_the_queue() {
    let canned = ExtractedDraft {
        resource_name: Some("Swedish omics registry".to_string()),
        countries: vec!["sweden".to_string()],
        domains: vec!["Human".to_string()],
        primary_hierarchy: ExtractedHierarchy {
            level1: Some("data".to_string()),
            level2: Some("Omics data".to_string()),
            ..Default::default()
        },
        year_start: Some(2015),
        year_end: Some(2023),
        ..Default::default()
    };
    let app = app_with(
        Some(canned),
        Taxonomy::from_yaml_str(TAXONOMY_YAML).unwrap(),
    )
    .await;

    let response = app
        .clone()
        .oneshot(upload_request("direct_submit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["action"], "submitted");
    let submission_id = body["submission_id"].as_i64().unwrap();

    // The queued submission carries the reconciled, canonicalized values
    let response = app
        .oneshot(admin(
            Request::get("/api/admin/submissions?status=pending")
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    let queue = body_json(response).await;
    let entry = &queue.as_array().unwrap()[0];
    assert_eq!(entry["submission_id"].as_i64().unwrap(), submission_id);
    assert_eq!(entry["countries"], json!(["Sweden"]));
    assert_eq!(
        entry["primary_hierarchy_path"]["category"],
        json!("omics_data")
    );
}

#[tokio::test]
async fn one_character_search_returns_empty() {
    let response = app()
        .await
        .oneshot(
            Request::get("/api/resources/search?q=a&limit=15")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}
