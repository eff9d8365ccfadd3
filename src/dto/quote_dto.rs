use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::quote::{BillingDetails, ClientDetails, QuoteRequest, ServiceSelection};

/// Quote form submission: client identity plus the services to price
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: String,

    pub address: Option<String>,

    pub postal_code: Option<String>,

    #[validate(length(min = 1, message = "at least one service must be selected"))]
    pub services: Vec<ServiceSelection>,

    pub notes: Option<String>,

    pub billing: Option<BillingDetails>,
}

impl CreateQuoteRequest {
    pub fn into_domain(self) -> QuoteRequest {
        QuoteRequest {
            client: ClientDetails {
                name: self.name,
                email: self.email,
                phone: self.phone,
                address: self.address,
                postal_code: self.postal_code,
            },
            services: self.services,
            notes: self.notes,
            billing: self.billing,
        }
    }
}

/// Contract request: the quote fields plus mandatory billing identity and,
/// optionally, the reference of the quote it confirms
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: String,

    pub address: Option<String>,

    pub postal_code: Option<String>,

    #[validate(length(min = 1, message = "at least one service must be selected"))]
    pub services: Vec<ServiceSelection>,

    pub notes: Option<String>,

    pub billing: Option<BillingDetails>,

    /// Reference of the accepted quote, when the client has one
    pub quote_reference: Option<String>,
}

impl CreateContractRequest {
    pub fn into_domain(self) -> (QuoteRequest, Option<String>) {
        let request = QuoteRequest {
            client: ClientDetails {
                name: self.name,
                email: self.email,
                phone: self.phone,
                address: self.address,
                postal_code: self.postal_code,
            },
            services: self.services,
            notes: self.notes,
            billing: self.billing,
        };
        (request, self.quote_reference)
    }
}

/// A base64-encoded document attached to the quote email
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPdf {
    pub filename: String,
    pub content_base64: String,
}

/// Payload of the send-quote-email endpoint: the form data echoed back by
/// the frontend plus the PDFs it received from the quote/contract endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendQuoteEmailRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: String,

    #[validate(length(min = 1))]
    pub ref_number: String,

    pub services: Vec<ServiceSelection>,

    pub notes: Option<String>,

    #[validate(length(min = 1, message = "at least one document must be attached"))]
    pub pdfs: Vec<EncodedPdf>,
}

/// Success response of the email endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEmailResponse {
    pub message: String,
    pub ref_number: String,
    pub emails_sent: usize,
    pub emails_failed: usize,
}
