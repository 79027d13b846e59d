use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use challenge_hub::api::{create_router, AppState};
use challenge_hub::config::Config;
use challenge_hub::crypto::PasswordScheme;
use challenge_hub::db::{self, CompanyRepository, NewSubmission, SubmissionRepository};
use challenge_hub::error::AppError;
use challenge_hub::llm::{ConversationTurn, LanguageModel, Role};

/// Answers chat turns with a numbered reply and extraction prompts with a fixed record.
struct CannedModel;

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, AppError> {
        if turns.len() == 1 && turns[0].role == Role::System {
            return Ok(r#"{"event_name": "Hack1", "cash_prize": null}"#.to_string());
        }
        Ok(format!("reply after {} turns", turns.len()))
    }
}

struct TestApp {
    router: axum::Router,
    state: AppState,
    _context: tempfile::NamedTempFile,
}

/// Never answers within the request timeout.
struct StalledModel;

#[async_trait]
impl LanguageModel for StalledModel {
    async fn complete(&self, _turns: &[ConversationTurn]) -> Result<String, AppError> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

async fn build_app(
    password_scheme: PasswordScheme,
    llm: Arc<dyn LanguageModel>,
    request_timeout_secs: u64,
) -> TestApp {
    let mut context = tempfile::NamedTempFile::new().unwrap();
    context.write_all(b"You help companies draft challenges.").unwrap();

    let config = Config {
        server_host: "127.0.0.1".into(),
        server_port: 0,
        database_url: "sqlite::memory:".into(),
        db_max_connections: 1,
        db_min_connections: 1,
        session_expiry_hours: 24,
        request_timeout_secs,
        password_scheme,
        llm_api_key: "sk-test".into(),
        llm_base_url: "http://127.0.0.1:9".into(),
        llm_model: "test-model".into(),
        initial_context_path: context.path().to_path_buf(),
        machine_purge_interval_secs: 0,
    };

    let state = AppState {
        db: db::connect_in_memory().await.unwrap(),
        llm,
        config: Arc::new(config),
    };

    TestApp {
        router: create_router(state.clone()),
        state,
        _context: context,
    }
}

async fn app_with_scheme(password_scheme: PasswordScheme) -> TestApp {
    build_app(password_scheme, Arc::new(CannedModel), 30).await
}

async fn app() -> TestApp {
    app_with_scheme(PasswordScheme::Legacy).await
}

/// Send a JSON body and return (status, parsed body).
async fn send(app: &TestApp, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    send_raw(app, method, uri, "application/json", body.to_string()).await
}

async fn send_raw(
    app: &TestApp,
    method: &str,
    uri: &str,
    content_type: &str,
    body: String,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    let resp = app.router.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register(app: &TestApp, email: &str, machine_id: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/companies/register",
        json!({
            "email": email,
            "password": "pw",
            "name": "Acme",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "machine_id": machine_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body
}

async fn create_event(app: &TestApp, company: &Value) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/companies/events",
        json!({
            "access_code": company["access_code"],
            "id": company["id"],
            "event_name": "Hack1",
            "short_description": "x",
            "long_description": "y",
            "prize": 100,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create event failed: {body}");
    body
}

async fn expire_all_sessions(app: &TestApp) {
    sqlx::query("UPDATE company_machines SET valid_until = ?")
        .bind(db::now() - 1)
        .execute(&app.state.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn health_reports_version() {
    let app = app().await;
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_then_machine_access_returns_same_company() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;
    assert!(company["access_code"].as_str().is_some_and(|c| !c.is_empty()));
    assert_eq!(company["email"], "a@b.com");
    assert_eq!(company["name"], "Acme");

    let (status, body) =
        send(&app, "PUT", "/companies/machine-access", json!({ "machine_id": "m1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], company["id"]);
    assert_eq!(body["access_code"], company["access_code"]);
}

#[tokio::test]
async fn machine_access_rejects_expired_session() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;
    expire_all_sessions(&app).await;

    let (status, _) =
        send(&app, "PUT", "/companies/machine-access", json!({ "machine_id": "m1" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/companies/machine-access",
        json!({ "access_code": company["access_code"] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_rejects_duplicates_and_blanks() {
    let app = app().await;
    register(&app, "a@b.com", "m1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/companies/register",
        json!({
            "email": " a@b.com ",
            "password": "other",
            "name": "Acme Two",
            "first_name": "Grace",
            "last_name": "Hopper",
            "machine_id": "m2",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email already registered");

    let (status, _) = send(
        &app,
        "POST",
        "/companies/register",
        json!({ "email": "c@d.com", "password": "  ", "name": "Acme" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/companies/register", json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "invalid method");

    let (status, _) = send(&app, "POST", "/companies/login", json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&app, "DELETE", "/companies/events", json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn login_with_password() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "a@b.com", "password": "pw", "machine_id": "m2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], company["id"]);
    assert_ne!(body["access_code"], company["access_code"]);

    let id = company["id"].as_i64().unwrap();
    let stored = CompanyRepository::get_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert!(stored.last_login.is_some());
}

#[tokio::test]
async fn login_with_wrong_password_changes_nothing() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "a@b.com", "password": "nope", "machine_id": "m2" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "invalid creds");

    let (status, _) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "x@y.com", "password": "pw", "machine_id": "m2" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = company["id"].as_i64().unwrap();
    let stored = CompanyRepository::get_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert!(stored.last_login.is_none());

    let (status, _) =
        send(&app, "PUT", "/companies/machine-access", json!({ "machine_id": "m2" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_prefers_access_code_then_machine_id() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "access_code": company["access_code"], "email": "a@b.com", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], company["id"]);

    let (status, body) = send(&app, "PUT", "/companies/login", json!({ "machine_id": "m1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], company["id"]);

    let (status, _) = send(&app, "PUT", "/companies/login", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "a@b.com", "password": "pw" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn argon2_scheme_round_trips_through_login() {
    let app = app_with_scheme(PasswordScheme::Argon2).await;
    let company = register(&app, "a@b.com", "m1").await;

    let id = company["id"].as_i64().unwrap();
    let stored = CompanyRepository::get_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert!(stored.hashed_password.starts_with("argon2id$"));

    let (status, _) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "a@b.com", "password": "pw", "machine_id": "m1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signout_is_idempotent() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/companies/signout",
        json!({ "access_code": company["access_code"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Signed out");

    let (status, _) =
        send(&app, "PUT", "/companies/machine-access", json!({ "machine_id": "m1" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", "/companies/signout", json!({ "machine_id": "m1" })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn event_create_then_sparse_update() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;
    let event = create_event(&app, &company).await;
    assert!(event["event_id"].as_i64().is_some());
    assert_eq!(event["prize"], 100);

    let (status, updated) = send(
        &app,
        "POST",
        "/companies/events",
        json!({
            "access_code": company["access_code"],
            "id": company["id"],
            "event_id": event["event_id"],
            "prize": 200,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["event_id"], event["event_id"]);
    assert_eq!(updated["prize"], 200);
    assert_eq!(updated["event_name"], "Hack1");
    assert_eq!(updated["short_description"], "x");
    assert_eq!(updated["long_description"], "y");

    let (status, listed) = send(
        &app,
        "PUT",
        "/companies/events",
        json!({ "access_code": company["access_code"], "id": company["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["prize"], 200);
}

#[tokio::test]
async fn event_create_requires_fields() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;

    let (status, _) = send(
        &app,
        "POST",
        "/companies/events",
        json!({
            "access_code": company["access_code"],
            "id": company["id"],
            "event_name": "Hack1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resources_require_matching_token() {
    let app = app().await;
    let acme = register(&app, "a@b.com", "m1").await;
    let rival = register(&app, "c@d.com", "m2").await;
    let event = create_event(&app, &acme).await;

    // rival's code, acme's id
    let (status, body) = send(
        &app,
        "PUT",
        "/companies/events",
        json!({ "access_code": rival["access_code"], "id": acme["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid token");

    let (status, _) = send(&app, "PUT", "/companies/submissions", json!({ "id": acme["id"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // rival cannot patch acme's event through its own valid token
    let (status, _) = send(
        &app,
        "POST",
        "/companies/events",
        json!({
            "access_code": rival["access_code"],
            "id": rival["id"],
            "event_id": event["event_id"],
            "event_name": "Mine",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    expire_all_sessions(&app).await;
    let (status, _) = send(
        &app,
        "PUT",
        "/companies/events",
        json!({ "access_code": acme["access_code"], "id": acme["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submissions_are_listed_and_deleted_by_owner() {
    let app = app().await;
    let acme = register(&app, "a@b.com", "m1").await;
    let rival = register(&app, "c@d.com", "m2").await;
    let event = create_event(&app, &acme).await;
    let event_id = event["event_id"].as_i64().unwrap();

    let submission = SubmissionRepository::create(
        &app.state.db,
        NewSubmission {
            event_id,
            user_id: Some(3),
            project_name: "Rocket".into(),
            project_description: "goes up".into(),
            project_link: "https://example.com/rocket".into(),
            project_video_link: None,
            resume_link: None,
            additional_links: None,
        },
    )
    .await
    .unwrap();

    let (status, listed) = send(
        &app,
        "PUT",
        "/companies/submissions",
        json!({ "access_code": acme["access_code"], "id": acme["id"], "event_id": event_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["project_name"], "Rocket");
    assert_eq!(listed[0]["events"]["event_name"], "Hack1");

    let (status, listed) = send(
        &app,
        "PUT",
        "/companies/submissions",
        json!({ "access_code": rival["access_code"], "id": rival["id"], "event_id": event_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "DELETE",
        "/companies/submissions",
        json!({ "access_code": acme["access_code"], "id": acme["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cannot delete submission without its id"));

    let (status, _) = send(
        &app,
        "DELETE",
        "/companies/submissions",
        json!({
            "access_code": rival["access_code"],
            "id": rival["id"],
            "submission_id": submission.submission_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, deleted) = send(
        &app,
        "DELETE",
        "/companies/submissions",
        json!({
            "access_code": acme["access_code"],
            "id": acme["id"],
            "submission_id": submission.submission_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["submission_id"], submission.submission_id);
}

#[tokio::test]
async fn company_profile_update() {
    let app = app().await;
    let company = register(&app, "a@b.com", "m1").await;

    let (status, _) = send(
        &app,
        "POST",
        "/companies/companies",
        json!({ "access_code": company["access_code"], "id": company["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/companies/companies",
        json!({
            "access_code": company["access_code"],
            "id": company["id"],
            "company_name": "Acme Labs",
            "password": "new-pw",
            "verified": true,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Labs");
    assert_eq!(body["first_name"], "Ada");
    assert_eq!(body["access_code"], company["access_code"]);

    let (status, _) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "a@b.com", "password": "pw", "machine_id": "m1" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/companies/login",
        json!({ "email": "a@b.com", "password": "new-pw", "machine_id": "m1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let id = company["id"].as_i64().unwrap();
    let stored = CompanyRepository::get_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert!(stored.verified);
}

#[tokio::test]
async fn company_email_update_rejects_taken_address() {
    let app = app().await;
    let first = register(&app, "a@b.com", "m1").await;
    register(&app, "c@d.com", "m2").await;

    let (status, body) = send(
        &app,
        "POST",
        "/companies/companies",
        json!({
            "access_code": first["access_code"],
            "id": first["id"],
            "email": "c@d.com",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email already registered");

    let id = first["id"].as_i64().unwrap();
    let stored = CompanyRepository::get_by_id(&app.state.db, id).await.unwrap().unwrap();
    assert_eq!(stored.company_email, "a@b.com");
}

#[tokio::test]
async fn challenge_generator_runs_a_turn() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/companies/challenge-generator",
        json!({ "conversation_history": [], "user_input": "We want a\nfintech hackathon" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assistant_response"], "reply after 2 turns");
    assert_eq!(body["filled_json"], r#"{"event_name": "Hack1", "cash_prize": null}"#);

    let history = body["conversation_history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["role"], "system");
    assert_eq!(history[1]["content"], "We want a<br>fintech hackathon");

    let (status, body) = send(
        &app,
        "POST",
        "/companies/challenge-generator",
        json!({ "conversation_history": body["conversation_history"], "user_input": "$5000" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["conversation_history"].as_array().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.iter().filter(|t| t["role"] == "system").count(), 1);

    let (status, _) = send(&app, "PUT", "/companies/challenge-generator", json!({})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn slow_requests_time_out_with_408() {
    let app = build_app(PasswordScheme::Legacy, Arc::new(StalledModel), 1).await;

    let (status, _) = send(
        &app,
        "POST",
        "/companies/challenge-generator",
        json!({ "conversation_history": [], "user_input": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn plain_text_bodies_are_parsed_as_json() {
    let app = app().await;
    register(&app, "a@b.com", "m1").await;

    let (status, _) = send_raw(
        &app,
        "PUT",
        "/companies/machine-access",
        "text/plain;charset=UTF-8",
        r#"{"machine_id":"m1"}"#.to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        send_raw(&app, "PUT", "/companies/login", "text/plain", "not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
