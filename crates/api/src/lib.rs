mod config;
mod error;
mod rate_limit;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use dinchat_agents::{ChatInput, ResponderAgent};
use dinchat_core::IntentCatalog;
use dinchat_observability::AppMetrics;
use dinchat_tenants::{Store, TenantDirectory};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use unicode_segmentation::UnicodeSegmentation;

pub use crate::config::ApiConfig;
pub use crate::error::{ApiError, ApiResult};
pub use crate::rate_limit::SlidingWindowLimiter;

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ResponderAgent<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: SlidingWindowLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub max_message_graphemes: usize,
}

/// Body of `POST /chat`. `message` is kept loose so that a missing or
/// non-string value is answered with the fallback instead of a 4xx.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    msg_index: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: dinchat_observability::MetricsSnapshot,
    catalog: CatalogHealth,
    tenants: usize,
}

#[derive(Debug, Serialize)]
struct CatalogHealth {
    intents: usize,
    dead_intents: Vec<String>,
}

pub async fn build_app(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let catalog = match config.intents_file.as_ref() {
        Some(path) => IntentCatalog::from_json_file(path)?,
        None => IntentCatalog::builtin().clone(),
    };
    for intent in catalog.dead_intents() {
        warn!(intent = %intent.name, "intent has no usable keywords and can never match");
    }

    let store = Store::open(config.database_url.as_deref(), config.tenants_dir.as_deref())
        .await
        .context("failed to open tenant store")?;

    let agent = Arc::new(ResponderAgent::new(
        Arc::new(catalog),
        Arc::new(store),
        metrics.clone(),
    ));

    let state = ApiState {
        agent,
        metrics,
        limiter: SlidingWindowLimiter::new(config.rate_limit_window, config.rate_limit_max),
        allowed_origins: Arc::new(config.allowed_origins),
        max_message_graphemes: config.max_message_graphemes,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/intents", get(intents))
        .route("/chat", post(chat))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let tenants = match state.agent.tenants().list_client_ids().await {
        Ok(ids) => ids.len(),
        Err(err) => {
            warn!(error = %err, "tenant listing failed during health check");
            0
        }
    };
    let catalog = state.agent.catalog();

    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        catalog: CatalogHealth {
            intents: catalog.len(),
            dead_intents: catalog
                .dead_intents()
                .map(|intent| intent.name.clone())
                .collect(),
        },
        tenants,
    };
    (StatusCode::OK, Json(payload))
}

async fn intents(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.agent.catalog().clone())
}

async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        state.metrics.inc_rejected("invalid_body");
        ApiError::InvalidBody(rejection.body_text())
    })?;

    let message = match request.message {
        Some(serde_json::Value::String(text)) => Some(text),
        _ => None,
    };

    if let Some(text) = message.as_deref() {
        if text.graphemes(true).count() > state.max_message_graphemes {
            state.metrics.inc_rejected("message_too_long");
            return Err(ApiError::MessageTooLong {
                max: state.max_message_graphemes,
            });
        }
    }

    let outcome = state
        .agent
        .handle_chat(ChatInput {
            message,
            client_id: request.client_id,
            session_id: request.session_id,
            msg_index: request.msg_index,
        })
        .await
        .map_err(|err| {
            state.metrics.inc_error();
            error!(error = ?err, "chat handling failed");
            ApiError::Internal(err)
        })?;

    Ok(Json(ChatResponse {
        reply: outcome.reply.reply,
    }))
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn is_rate_limited_endpoint(path: &str) -> bool {
    matches!(path, "/chat")
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || !is_rate_limited_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if let Err(retry_after) = state.limiter.check(&ip) {
        state.metrics.inc_rejected("rate_limited");
        warn!(ip = %ip, retry_after_secs = retry_after.as_secs(), "chat rate limit hit");
        return ApiError::RateLimited(retry_after).into_response();
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
