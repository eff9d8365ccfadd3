use axum::{routing::post, Router};
use std::sync::Arc;

use crate::handler::chat_handler::chat_handler;
use crate::service::chat_service::ChatServiceImpl;

pub fn chat_router(service: Arc<ChatServiceImpl>) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .with_state(service)
}
