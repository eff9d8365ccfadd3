use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::{error, info};
use validator::Validate;

use crate::dto::quote_dto::{
    CreateContractRequest, CreateQuoteRequest, QuoteEmailResponse, SendQuoteEmailRequest,
};
use crate::service::quote_service::{QuoteService, QuoteServiceImpl, RenderedDocument};
use crate::util::error::HandlerError;

/// Header carrying the issued reference back to the frontend
pub const REFERENCE_HEADER: &str = "x-reference-number";

fn pdf_response(document: RenderedDocument, filename_prefix: &str) -> Result<Response<Body>, HandlerError> {
    let filename = format!("{}-{}.pdf", filename_prefix, document.reference);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .header(REFERENCE_HEADER, document.reference)
        .body(Body::from(document.bytes))
        .map_err(|e| {
            error!("Failed to build PDF response: {e}");
            HandlerError::internal("Failed to build the response", e)
        })
}

/// POST /quotes: price the selected services and return the quote PDF, with
/// the issued reference in a response header
pub async fn create_quote_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[create_quote_handler] Handler called");

    if let Err(e) = payload.validate() {
        return Err(HandlerError::validation(format!("Validation error: {}", e)));
    }

    let document = service
        .create_quote(payload.into_domain())
        .await
        .map_err(HandlerError::from)?;

    pdf_response(document, "presupuesto")
}

/// POST /contracts: like the quote endpoint but the billing identity is
/// mandatory; rejected with 400 before any document work when absent
pub async fn create_contract_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Json(payload): Json<CreateContractRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[create_contract_handler] Handler called");

    if let Err(e) = payload.validate() {
        return Err(HandlerError::validation(format!("Validation error: {}", e)));
    }

    let (request, quote_reference) = payload.into_domain();
    let document = service
        .create_contract(request, quote_reference)
        .await
        .map_err(HandlerError::from)?;

    pdf_response(document, "contrato")
}

/// POST /quotes/email: send the already-rendered PDFs to the client and the
/// internal mailbox
pub async fn send_quote_email_handler(
    State(service): State<Arc<QuoteServiceImpl>>,
    Json(payload): Json<SendQuoteEmailRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[send_quote_email_handler] Handler called");

    if let Err(e) = payload.validate() {
        return Err(HandlerError::validation(format!("Validation error: {}", e)));
    }

    let ref_number = payload.ref_number.clone();
    let report = service
        .send_quote_emails(payload)
        .await
        .map_err(HandlerError::from)?;

    Ok(Json(QuoteEmailResponse {
        message: "Presupuesto enviado correctamente".to_string(),
        ref_number,
        emails_sent: report.success,
        emails_failed: report.failed,
    }))
}
