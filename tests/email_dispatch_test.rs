use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Mutex;

use brillante_backend::config::{CompanyConfig, ReferenceConfig};
use brillante_backend::dto::contact_dto::ContactRequest;
use brillante_backend::dto::quote_dto::SendQuoteEmailRequest;
use brillante_backend::service::contact_service::{ContactService, ContactServiceImpl};
use brillante_backend::service::quote_service::{QuoteService, QuoteServiceImpl};
use brillante_backend::util::email::{EmailError, EmailMessage, EmailService};
use brillante_backend::util::pdf::PdfRenderer;
use brillante_backend::util::reference::ReferenceService;

/// Mock transport: fails for the configured recipients, records the rest
struct MockEmailService {
    fail_recipients: Vec<String>,
    sent: Mutex<Vec<String>>,
}

impl MockEmailService {
    fn new(fail_recipients: Vec<String>) -> Self {
        MockEmailService { fail_recipients, sent: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.fail_recipients.contains(&message.to) {
            return Err(EmailError::SmtpError("mock delivery failure".to_string()));
        }
        self.sent.lock().await.push(message.to);
        Ok(())
    }
}

fn quote_service(email: Arc<MockEmailService>) -> (QuoteServiceImpl, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let company = CompanyConfig::from_test_env();
    let service = QuoteServiceImpl {
        reference: ReferenceService::new(&ReferenceConfig {
            counter_path: dir.path().join("counter.json"),
            start_number: 7000,
        }),
        renderer: PdfRenderer::new(
            company.clone(),
            PathBuf::from("templates"),
            dir.path().join("assets"),
        ),
        email,
        company,
    };
    (service, dir)
}

fn email_request() -> SendQuoteEmailRequest {
    serde_json::from_value(json!({
        "name": "Laura Pérez",
        "email": "laura@example.com",
        "phone": "600123456",
        "refNumber": "PRE-7000",
        "services": [
            {"id": "oficinas", "quantity": 3, "frequency": "unica", "tariff": "basica"}
        ],
        "pdfs": [
            {"filename": "presupuesto-PRE-7000.pdf", "contentBase64": "JVBERi0xLjcK"}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn internal_failure_is_reported_but_not_surfaced() {
    // client send succeeds, internal copy fails: still a success for the
    // caller, with the counts reporting the partial failure
    let company = CompanyConfig::from_test_env();
    let email = Arc::new(MockEmailService::new(vec![company.internal_email.clone()]));
    let (service, _dir) = quote_service(email.clone());

    let report = service.send_quote_emails(email_request()).await.expect("partial success");
    assert_eq!(report.success, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total, 2);

    let sent = email.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], "laura@example.com");
}

#[tokio::test]
async fn total_failure_surfaces_an_error() {
    let company = CompanyConfig::from_test_env();
    let email = Arc::new(MockEmailService::new(vec![
        "laura@example.com".to_string(),
        company.internal_email.clone(),
    ]));
    let (service, _dir) = quote_service(email);

    assert!(service.send_quote_emails(email_request()).await.is_err());
}

#[tokio::test]
async fn both_sends_succeed_normally() {
    let email = Arc::new(MockEmailService::new(vec![]));
    let (service, _dir) = quote_service(email.clone());

    let report = service.send_quote_emails(email_request()).await.unwrap();
    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 0);

    // both the client and the internal mailbox received a copy, in no
    // guaranteed order
    let mut sent = email.sent.lock().await.clone();
    sent.sort();
    assert_eq!(sent.len(), 2);
    assert!(sent.contains(&"laura@example.com".to_string()));
}

#[tokio::test]
async fn contact_form_partial_failure_counts() {
    let company = CompanyConfig::from_test_env();
    let email = Arc::new(MockEmailService::new(vec![company.internal_email.clone()]));
    let service = ContactServiceImpl { email, company };

    let report = service
        .send_contact_emails(ContactRequest {
            name: "Ana García".to_string(),
            email: "ana@example.com".to_string(),
            phone: "600111222".to_string(),
            message: "¿Limpian garajes comunitarios?".to_string(),
        })
        .await
        .expect("partial success");

    assert_eq!(report.success, 1);
    assert_eq!(report.failed, 1);
}
