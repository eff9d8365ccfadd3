use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::connect_info::MockConnectInfo;
use axum::{body::Body, http::{Request, StatusCode}, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use brillante_backend::config::ChatConfig;
use brillante_backend::dto::chat_dto::ChatTurn;
use brillante_backend::router::chat_router::chat_router;
use brillante_backend::service::chat_service::{ChatError, ChatServiceImpl, CompletionClient};

struct CannedCompletionClient;

#[async_trait]
impl CompletionClient for CannedCompletionClient {
    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<String, ChatError> {
        assert_eq!(messages.first().unwrap().role, "system");
        Ok("¡Hola! ¿En qué puedo ayudarle?".to_string())
    }
}

struct RateLimitedUpstream;

#[async_trait]
impl CompletionClient for RateLimitedUpstream {
    async fn complete(&self, _messages: Vec<ChatTurn>) -> Result<String, ChatError> {
        Err(ChatError::UpstreamRateLimited)
    }
}

fn test_app(client: Arc<dyn CompletionClient>) -> Router {
    let service = Arc::new(ChatServiceImpl::new(ChatConfig::from_test_env(), client));
    chat_router(service).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 3000))))
}

fn chat_request(message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": message, "conversation": [] }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn chat_returns_message_and_timestamp() {
    let app = test_app(Arc::new(CannedCompletionClient));

    let resp = app.oneshot(chat_request("Hola")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["message"], "¡Hola! ¿En qué puedo ayudarle?");
    assert!(response["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn eleventh_request_in_the_hour_is_rate_limited() {
    // the test config allows 10 requests per hour per IP
    let app = test_app(Arc::new(CannedCompletionClient));

    for _ in 0..10 {
        let resp = app.clone().oneshot(chat_request("Hola")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app.oneshot(chat_request("Hola")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forwarded_clients_are_limited_independently() {
    let app = test_app(Arc::new(CannedCompletionClient));

    // exhaust the quota for one forwarded client
    for _ in 0..10 {
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from(json!({ "message": "Hola" }).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // a different forwarded client still gets through
    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.10")
        .body(Body::from(json!({ "message": "Hola" }).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn upstream_rate_limit_maps_to_service_unavailable() {
    let app = test_app(Arc::new(RateLimitedUpstream));

    let resp = app.oneshot(chat_request("Hola")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn empty_message_fails_validation() {
    let app = test_app(Arc::new(CannedCompletionClient));

    let resp = app.oneshot(chat_request("")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
