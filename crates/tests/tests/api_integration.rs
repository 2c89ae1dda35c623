use std::path::PathBuf;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use dinchat_api::{build_app, ApiConfig};
use dinchat_core::GENERIC_APOLOGY;
use dinchat_tenants::{SqliteTenants, TenantConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn demo_reply(key: &str) -> String {
    TenantConfig::demo_business().responses[key].clone()
}

async fn app_with(config: ApiConfig) -> Router {
    build_app(config).await.expect("app should build")
}

async fn app() -> Router {
    app_with(ApiConfig::default()).await
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, parsed)
}

fn temp_tenants_dir() -> PathBuf {
    let root = std::env::temp_dir().join(format!("dinchat-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();
    root
}

#[tokio::test]
async fn health_reports_catalog_and_tenants() {
    let (status, body) = send(
        app().await,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["catalog"]["intents"], 11);
    assert_eq!(body["tenants"], 1);
}

#[tokio::test]
async fn opening_hours_question_gets_tenant_reply() {
    let (status, body) = send(
        app().await,
        chat_request(json!({
            "message": "Hvornår har I åbent?",
            "clientId": "demo_business",
            "sessionId": "s-1",
            "msgIndex": 0
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], demo_reply("openingHours"));
}

#[tokio::test]
async fn blank_and_non_string_messages_get_fallback() {
    let app = app().await;
    for body in [
        json!({ "message": "", "clientId": "demo_business" }),
        json!({ "message": "  ?!  " }),
        json!({ "message": 42 }),
        json!({ "message": null }),
        json!({}),
    ] {
        let (status, reply) = send(app.clone(), chat_request(body.clone())).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(reply["reply"], demo_reply("fallback"), "{body}");
    }
}

#[tokio::test]
async fn unknown_client_uses_default_tenant() {
    let (status, body) = send(
        app().await,
        chat_request(json!({ "message": "jeg vil gerne bestille tid i morgen", "clientId": "nobody" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], demo_reply("booking"));
}

#[tokio::test]
async fn tenant_files_override_replies_and_fall_back_per_tenant() {
    let root = temp_tenants_dir();
    std::fs::write(
        root.join("bageriet.json"),
        json!({
            "company": { "name": "Bageriet" },
            "responses": {
                "greeting": "Goddag fra bageriet!",
                "fallback": "Spørg os i butikken."
            }
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        root.join("tavs.json"),
        json!({ "company": { "name": "Tavs" }, "responses": {} }).to_string(),
    )
    .unwrap();

    let app = app_with(ApiConfig {
        tenants_dir: Some(root.clone()),
        ..ApiConfig::default()
    })
    .await;

    let (_, greeting) = send(
        app.clone(),
        chat_request(json!({ "message": "HEJ", "clientId": "bageriet" })),
    )
    .await;
    assert_eq!(greeting["reply"], "Goddag fra bageriet!");

    let (_, unconfigured) = send(
        app.clone(),
        chat_request(json!({ "message": "Hvad koster et rugbrød?", "clientId": "bageriet" })),
    )
    .await;
    assert_eq!(unconfigured["reply"], "Spørg os i butikken.");

    let (status, apology) = send(
        app,
        chat_request(json!({ "message": "hej", "clientId": "tavs" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(apology["reply"], GENERIC_APOLOGY);

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn overlong_message_is_rejected_with_reply() {
    let app = app_with(ApiConfig {
        max_message_graphemes: 10,
        ..ApiConfig::default()
    })
    .await;

    let (status, body) = send(
        app.clone(),
        chat_request(json!({ "message": "åbningstider i dag" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "message_too_long");
    assert!(body["reply"].as_str().is_some_and(|reply| !reply.is_empty()));

    let (status, _) = send(app, chat_request(json!({ "message": "åbningstid" }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_rejected_with_reply() {
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from("{\"message\": "))
        .unwrap();

    let (status, body) = send(app().await, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn chat_is_rate_limited_per_ip() {
    let app = app_with(ApiConfig {
        rate_limit_max: 2,
        rate_limit_window: Duration::from_secs(60),
        ..ApiConfig::default()
    })
    .await;

    let from = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(json!({ "message": "hej" }).to_string()))
            .unwrap()
    };

    for _ in 0..2 {
        let (status, _) = send(app.clone(), from("198.51.100.4")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app.clone().oneshot(from("198.51.100.4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    let (status, _) = send(app.clone(), from("198.51.100.5")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn intents_endpoint_lists_compiled_catalog() {
    let (status, body) = send(
        app().await,
        Request::builder().uri("/intents").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let intents = body["intents"].as_array().unwrap();
    assert_eq!(intents.len(), 11);
    assert_eq!(intents[0]["name"], "greeting");
    assert_eq!(intents[0]["responseKey"], "greeting");
    assert!(intents
        .iter()
        .flat_map(|intent| intent["keywords"].as_array().unwrap())
        .any(|keyword| keyword["text"] == "bestille tid" && keyword["isPhrase"] == true));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let response = app()
        .await
        .oneshot(chat_request(json!({ "message": "hej" })))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn custom_intent_catalog_file_is_used() {
    let root = temp_tenants_dir();
    let intents_file = root.join("intents.json");
    std::fs::write(
        &intents_file,
        json!([
            { "name": "payments", "keywords": ["MobilePay", "betale med kort"], "responseKey": "payments" }
        ])
        .to_string(),
    )
    .unwrap();

    let app = app_with(ApiConfig {
        intents_file: Some(intents_file),
        ..ApiConfig::default()
    })
    .await;

    let (_, paid) = send(
        app.clone(),
        chat_request(json!({ "message": "Kan jeg betale med kort?" })),
    )
    .await;
    assert_eq!(paid["reply"], demo_reply("payments"));

    let (_, greeting) = send(app, chat_request(json!({ "message": "hej" }))).await;
    assert_eq!(greeting["reply"], demo_reply("fallback"));

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn corrupt_tenant_row_gets_generic_apology() {
    let root = temp_tenants_dir();
    let database_url = format!("sqlite://{}?mode=rwc", root.join("tenants.db").display());

    let store = SqliteTenants::connect(&database_url).await.unwrap();
    sqlx::query("INSERT INTO tenants (client_id, config_json, updated_at) VALUES (?1, ?2, ?3)")
        .bind("shop")
        .bind(r#"{"responses": 5}"#)
        .bind("2026-01-01T00:00:00+00:00")
        .execute(store.pool())
        .await
        .unwrap();
    store.pool().close().await;

    let app = app_with(ApiConfig {
        database_url: Some(database_url),
        ..ApiConfig::default()
    })
    .await;

    let (status, body) = send(
        app.clone(),
        chat_request(json!({ "message": "hej", "clientId": "shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], GENERIC_APOLOGY);

    let (status, body) = send(app, chat_request(json!({ "message": "hej" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], demo_reply("greeting"));

    std::fs::remove_dir_all(root).unwrap();
}
