use std::sync::Arc;

use axum::{extract::{Multipart, State}, response::IntoResponse, Json};
use bytes::BytesMut;
use tracing::{error, info};
use validator::Validate;

use crate::dto::contact_dto::{ContactEmailResponse, ContactRequest, JobApplication};
use crate::service::contact_service::{ContactService, ContactServiceImpl};
use crate::util::email::EmailAttachment;
use crate::util::error::HandlerError;

/// POST /contact: notify the internal mailbox and confirm to the client
pub async fn contact_handler(
    State(service): State<Arc<ContactServiceImpl>>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[contact_handler] Handler called");

    if let Err(e) = payload.validate() {
        return Err(HandlerError::validation(format!("Validation error: {}", e)));
    }

    let report = service
        .send_contact_emails(payload)
        .await
        .map_err(HandlerError::from)?;

    Ok(Json(ContactEmailResponse {
        message: "Mensaje enviado correctamente".to_string(),
        emails_sent: report.success,
        emails_failed: report.failed,
    }))
}

/// POST /job-application: multipart form with the applicant's details and an
/// optional CV file that gets forwarded to the internal mailbox
pub async fn job_application_handler(
    State(service): State<Arc<ContactServiceImpl>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    info!("[job_application_handler] Handler called");

    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut phone: Option<String> = None;
    let mut position: Option<String> = None;
    let mut message: Option<String> = None;
    let mut cv: Option<EmailAttachment> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("[job_application_handler] Error getting next field: {}", e);
        HandlerError::bad_request(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match field_name.as_str() {
            "name" | "email" | "phone" | "position" | "message" => {
                let value = field.text().await.map_err(|e| {
                    HandlerError::bad_request(format!("Failed to read field {}: {}", field_name, e))
                })?;
                match field_name.as_str() {
                    "name" => name = Some(value),
                    "email" => email = Some(value),
                    "phone" => phone = Some(value),
                    "position" => position = Some(value),
                    _ => message = Some(value),
                }
            }
            "cv" => {
                let filename = field.file_name().map(|s| s.to_string()).unwrap_or_else(|| "cv.pdf".to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let mut buf = BytesMut::new();
                let mut stream = field;
                while let Some(chunk) = stream.chunk().await.map_err(|e| {
                    error!("[job_application_handler] Error reading CV chunk: {}", e);
                    HandlerError::bad_request(format!("Failed to read CV file: {}", e))
                })? {
                    buf.extend_from_slice(&chunk);
                }
                info!("[job_application_handler] Received CV: {} ({} bytes)", filename, buf.len());
                cv = Some(EmailAttachment {
                    filename,
                    content_type,
                    content: buf.to_vec(),
                });
            }
            other => {
                info!("[job_application_handler] Ignoring unknown field: {}", other);
            }
        }
    }

    let application = JobApplication {
        name: name.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            HandlerError::validation("Missing required field: name")
        })?,
        email: email.filter(|s| s.contains('@')).ok_or_else(|| {
            HandlerError::validation("Missing or invalid required field: email")
        })?,
        phone: phone.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            HandlerError::validation("Missing required field: phone")
        })?,
        position: position.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            HandlerError::validation("Missing required field: position")
        })?,
        message,
        cv,
    };

    let report = service
        .send_job_application(application)
        .await
        .map_err(HandlerError::from)?;

    Ok(Json(ContactEmailResponse {
        message: "Candidatura enviada correctamente".to_string(),
        emails_sent: report.success,
        emails_failed: report.failed,
    }))
}
