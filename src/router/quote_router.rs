use axum::{routing::post, Router};
use std::sync::Arc;

use crate::handler::quote_handler::{
    create_contract_handler, create_quote_handler, send_quote_email_handler,
};
use crate::service::quote_service::QuoteServiceImpl;

pub fn quote_router(service: Arc<QuoteServiceImpl>) -> Router {
    Router::new()
        .route("/quotes", post(create_quote_handler))
        .route("/quotes/email", post(send_quote_email_handler))
        .route("/contracts", post(create_contract_handler))
        .with_state(service)
}
