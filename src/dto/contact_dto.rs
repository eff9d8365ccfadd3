use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::util::email::EmailAttachment;

/// Contact form submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: String,

    #[validate(length(min = 2, max = 4000))]
    pub message: String,
}

/// Job application parsed from the multipart form
#[derive(Debug, Clone)]
pub struct JobApplication {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub message: Option<String>,
    pub cv: Option<EmailAttachment>,
}

/// Success response of the contact/job endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEmailResponse {
    pub message: String,
    pub emails_sent: usize,
    pub emails_failed: usize,
}
