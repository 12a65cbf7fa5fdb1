//! HTTP handlers for the relay server.
//!
//! Each handler checks the request shape, builds a [`Command`] and hands it
//! to the relay. No delivery semantics live here.

use crate::auth::{AuthClient, TokenService};
use crate::config::Config;
use crate::error::ApiError;
use crate::metrics::{self, RequestMetricsGuard};
use anyhow::{Context, Result};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use relay_core::{store, Command, Outcome, Relay, RouterConfig, Target};
use relay_protocol::{
    AckResponse, ErrorResponse, IngestRequest, IngestResponse, MessageBody, PollQuery,
    PublishRequest, PublishResponse, RegisterResponse, SubscribeRequest,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Shared server state.
pub struct AppState {
    /// The relay core.
    pub relay: Relay,
    /// Bearer token issuer and verifier.
    pub tokens: TokenService,
}

impl AppState {
    /// Create new app state, opening the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn new(config: &Config) -> Result<Self> {
        let store = store::open(&config.storage.path)
            .with_context(|| format!("Failed to open store at {}", config.storage.path))?;

        let router_config = RouterConfig {
            max_content_size: config.limits.max_content_size,
        };

        Ok(Self {
            relay: Relay::with_config(store, router_config),
            tokens: TokenService::new(&config.auth),
        })
    }
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/publish", post(publish_handler))
        .route("/subscribe", post(subscribe_handler))
        .route("/poll", get(poll_handler))
        .route("/incoming", post(incoming_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Run the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(&config)?);

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    // Bind and serve
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Relay server listening on {}", addr);
    info!(storage = %config.storage.path, "Message store ready");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn unexpected(outcome: &Outcome) -> ApiError {
    ApiError::Internal(format!("unexpected outcome: {outcome:?}"))
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Unknown route handler.
async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("not found")))
}

/// `POST /register`
async fn register_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let _metrics = RequestMetricsGuard::new("register");

    let credentials = match state.relay.execute(Command::Register)? {
        Outcome::Registered(credentials) => credentials,
        other => return Err(unexpected(&other)),
    };
    let token = state.tokens.issue(&credentials.id)?;
    metrics::record_registration();

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: credentials.id,
            secret: credentials.secret,
            token,
        }),
    ))
}

/// `POST /publish`
async fn publish_handler(
    State(state): State<Arc<AppState>>,
    AuthClient(sender): AuthClient,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let _metrics = RequestMetricsGuard::new("publish");

    let Json(request) = payload?;
    let publish = request.validate()?;
    let kind = Target::classify(publish.channel.as_str()).kind();
    debug!(sender = %sender, channel = %publish.channel, "Publish request");

    let publication = match state.relay.execute(Command::publish(sender, publish))? {
        Outcome::Published(publication) => publication,
        other => return Err(unexpected(&other)),
    };
    metrics::record_publish(kind, publication.delivered_to);

    Ok(Json(PublishResponse {
        id: publication.id,
        delivered_to: publication.delivered_to,
    }))
}

/// `POST /subscribe`
async fn subscribe_handler(
    State(state): State<Arc<AppState>>,
    AuthClient(client): AuthClient,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let _metrics = RequestMetricsGuard::new("subscribe");

    let Json(request) = payload?;
    let subscribe = request.validate()?;
    debug!(client = %client, channel = %subscribe.channel, "Subscribe request");

    match state.relay.execute(Command::subscribe(client, subscribe))? {
        Outcome::Subscribed => {}
        other => return Err(unexpected(&other)),
    }
    metrics::record_subscription();

    Ok(Json(AckResponse::ok()))
}

/// `GET /poll?since=<ms>`
async fn poll_handler(
    State(state): State<Arc<AppState>>,
    AuthClient(client): AuthClient,
    query: Result<Query<PollQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let _metrics = RequestMetricsGuard::new("poll");

    let Query(query) = query?;
    let messages = match state.relay.execute(Command::poll(client, Some(query.since())))? {
        Outcome::Messages(messages) => messages,
        other => return Err(unexpected(&other)),
    };
    metrics::record_poll(messages.len());

    let body: Vec<MessageBody> = messages.into_iter().map(MessageBody::from).collect();
    Ok(Json(body))
}

/// `POST /incoming`
async fn incoming_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let _metrics = RequestMetricsGuard::new("incoming");

    let Json(request) = payload?;
    let ingest = request.validate()?;
    debug!(client = %ingest.client_id, "External ingestion request");

    let id = match state.relay.execute(Command::ingest(ingest))? {
        Outcome::Ingested(id) => id,
        other => return Err(unexpected(&other)),
    };
    metrics::record_publish("external", 1);

    Ok(Json(IngestResponse { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let mut config = Config::default();
        config.storage.path = store::MEMORY_PATH.to_string();
        config.auth.jwt_secret = "test-secret".to_string();
        config.metrics.enabled = false;
        app(Arc::new(AppState::new(&config).unwrap()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn poll_request(token: &str, since: Option<&str>) -> Request<Body> {
        let uri = match since {
            Some(since) => format!("/poll?since={since}"),
            None => "/poll".to_string(),
        };
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    struct Registered {
        id: String,
        secret: String,
        token: String,
    }

    async fn register(app: &Router) -> Registered {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/register")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        Registered {
            id: body["id"].as_str().unwrap().to_string(),
            secret: body["secret"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    async fn poll_contents(app: &Router, token: &str) -> Vec<String> {
        let (status, body) = send(app, poll_request(token, None)).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_register_provides_credentials() {
        let app = test_app();
        let client = register(&app).await;
        assert!(!client.id.is_empty());
        assert!(!client.secret.is_empty());
        assert!(!client.token.is_empty());
    }

    #[tokio::test]
    async fn test_publish_delivers_to_recipient() {
        let app = test_app();
        let a = register(&app).await;
        let b = register(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "/publish",
                Some(&a.token),
                json!({"channel": b.id, "content": "hello"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deliveredTo"], 1);
        assert!(body["id"].is_string());

        let (_, messages) = send(&app, poll_request(&b.token, None)).await;
        let message = &messages[0];
        assert_eq!(message["content"], "hello");
        assert_eq!(message["channel"], b.id.as_str());
        assert_eq!(message["sender_id"], a.id.as_str());
        assert_eq!(message["parent_id"], Value::Null);
        assert!(message["timestamp"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_incoming_accepts_valid_secret() {
        let app = test_app();
        let b = register(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "/incoming",
                None,
                json!({"client_id": b.id, "secret": b.secret, "content": "external"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].is_string());
        assert!(poll_contents(&app, &b.token)
            .await
            .contains(&"external".to_string()));
    }

    #[tokio::test]
    async fn test_incoming_rejects_invalid_secret() {
        let app = test_app();
        let b = register(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "/incoming",
                None,
                json!({"client_id": b.id, "secret": "wrong", "content": "bad"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "invalid secret");
        assert!(poll_contents(&app, &b.token).await.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_receives_channel_messages() {
        let app = test_app();
        let a = register(&app).await;
        let b = register(&app).await;
        let c = register(&app).await;

        for _ in 0..2 {
            let (status, body) = send(
                &app,
                json_request(
                    "/subscribe",
                    Some(&b.token),
                    json!({"channel": "news/general"}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"ok": true}));
        }

        let (status, body) = send(
            &app,
            json_request(
                "/publish",
                Some(&a.token),
                json!({"channel": "news/general", "content": "update"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deliveredTo"], 1);

        assert!(poll_contents(&app, &b.token)
            .await
            .contains(&"update".to_string()));
        assert!(!poll_contents(&app, &c.token)
            .await
            .contains(&"update".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_direct_target_is_not_found() {
        let app = test_app();
        let a = register(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "/publish",
                Some(&a.token),
                json!({"channel": "never-registered", "content": "lost"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "recipient not found");
        assert!(poll_contents(&app, &a.token).await.is_empty());
    }

    #[tokio::test]
    async fn test_poll_with_same_since_is_repeatable() {
        let app = test_app();
        let a = register(&app).await;
        let b = register(&app).await;
        send(
            &app,
            json_request(
                "/publish",
                Some(&a.token),
                json!({"channel": b.id, "content": "hello", "parent_id": "m-0"}),
            ),
        )
        .await;

        let (_, first) = send(&app, poll_request(&b.token, Some("0"))).await;
        let (_, second) = send(&app, poll_request(&b.token, Some("0"))).await;
        assert_eq!(first, second);
        assert_eq!(first[0]["parent_id"], "m-0");

        let cursor = first[0]["timestamp"].as_u64().unwrap().to_string();
        let (_, later) = send(&app, poll_request(&b.token, Some(&cursor))).await;
        assert_eq!(later, json!([]));

        // Non-numeric cursors fall back to the full history.
        let (_, garbage) = send(&app, poll_request(&b.token, Some("soon"))).await;
        assert_eq!(garbage, first);
    }

    #[tokio::test]
    async fn test_bearer_routes_reject_bad_tokens() {
        let app = test_app();
        let b = register(&app).await;

        let (status, _) = send(
            &app,
            json_request("/publish", None, json!({"channel": b.id, "content": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            json_request(
                "/subscribe",
                Some("not-a-token"),
                json!({"channel": "news/general"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, poll_request("not-a-token", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().starts_with("invalid auth"));
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_rejected() {
        let app = test_app();
        let a = register(&app).await;

        let (status, body) = send(
            &app,
            json_request("/publish", Some(&a.token), json!({"content": "no channel"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "malformed request: missing field: channel");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/subscribe")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", a.token))
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            json_request("/incoming", None, json!({"client_id": a.id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = test_app();
        let request = Request::builder()
            .uri("/nowhere")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_bad_poll_query_is_json_error() {
        let app = test_app();
        let b = register(&app).await;

        let (status, body) = send(&app, poll_request(&b.token, Some("1&since=2"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("malformed request:"));
    }
}
