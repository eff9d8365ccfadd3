use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use tracing::{info, warn};
use validator::Validate;

use crate::dto::chat_dto::ChatRequest;
use crate::service::chat_service::{ChatError, ChatServiceImpl};
use crate::util::error::{HandlerError, HandlerErrorKind};

/// Client IP for rate limiting: first hop of X-Forwarded-For when present
/// (the service runs behind a reverse proxy), socket address otherwise.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or_else(|| addr.ip())
}

/// POST /chat: forward the conversation to the completion provider, within
/// the per-IP quota
pub async fn chat_handler(
    State(service): State<Arc<ChatServiceImpl>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[chat_handler] Handler called");

    if let Err(e) = payload.validate() {
        return Err(HandlerError::validation(format!("Validation error: {}", e)));
    }

    let ip = client_ip(&headers, addr);
    let response = service.chat(ip, payload).await.map_err(|e| match e {
        ChatError::RateLimited { retry_after_secs } => HandlerError {
            error: HandlerErrorKind::RateLimited,
            message: format!(
                "Ha alcanzado el límite de mensajes por hora, inténtelo de nuevo en {} segundos",
                retry_after_secs,
            ),
            details: None,
        },
        ChatError::UpstreamRateLimited | ChatError::NotConfigured => {
            warn!("Chat unavailable: {e}");
            HandlerError {
                error: HandlerErrorKind::UpstreamUnavailable,
                message: "El asistente no está disponible en este momento, inténtelo más tarde"
                    .to_string(),
                details: None,
            }
        }
        ChatError::InvalidInput(msg) => HandlerError::validation(msg),
        ChatError::Upstream(msg) => HandlerError::internal("El asistente no ha podido responder", msg),
    })?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, addr), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_client_ip_falls_back_to_socket_address() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "192.0.2.4:1234".parse().unwrap();
        assert_eq!(client_ip(&headers, addr), "192.0.2.4".parse::<IpAddr>().unwrap());
    }
}
