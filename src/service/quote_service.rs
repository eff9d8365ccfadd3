use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, instrument};

use crate::config::CompanyConfig;
use crate::dto::quote_dto::SendQuoteEmailRequest;
use crate::model::pricing::QuoteSummary;
use crate::model::quote::{BillingDetails, QuoteRequest, ServiceSelection};
use crate::service::pricing_service;
use crate::util::email::{
    dispatch_pair, DispatchReport, EmailAttachment, EmailMessage, EmailService,
};
use crate::util::error::ServiceError;
use crate::util::pdf::{DocumentInput, PdfRenderer};
use crate::util::reference::ReferenceService;

/// A finished document: the bytes and the reference printed on it
pub struct RenderedDocument {
    pub reference: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn create_quote(&self, request: QuoteRequest) -> Result<RenderedDocument, ServiceError>;
    async fn create_contract(
        &self,
        request: QuoteRequest,
        quote_reference: Option<String>,
    ) -> Result<RenderedDocument, ServiceError>;
    async fn send_quote_emails(
        &self,
        request: SendQuoteEmailRequest,
    ) -> Result<DispatchReport, ServiceError>;
}

pub struct QuoteServiceImpl {
    pub reference: ReferenceService,
    pub renderer: PdfRenderer,
    pub email: Arc<dyn EmailService>,
    pub company: CompanyConfig,
}

impl QuoteServiceImpl {
    fn document_dates() -> (NaiveDate, NaiveDate) {
        let emission = Utc::now().date_naive();
        let expiry = emission.checked_add_days(Days::new(30)).unwrap_or(emission);
        (emission, expiry)
    }
}

/// Every priced service must ask for a positive number of hours.
fn validate_services(services: &[ServiceSelection]) -> Result<(), ServiceError> {
    if services.is_empty() {
        return Err(ServiceError::InvalidInput(
            "At least one service must be selected".to_string(),
        ));
    }
    for service in services {
        if service.quantity <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "Service {} has a non-positive number of hours",
                service.id.display_name(),
            )));
        }
    }
    Ok(())
}

/// A contract cannot be drawn up without the complete billing identity.
/// Checked before any reference is issued or any PDF work starts.
fn validate_billing(billing: Option<&BillingDetails>) -> Result<(), ServiceError> {
    let billing = billing.ok_or_else(|| {
        ServiceError::InvalidInput("Billing details are required for a contract".to_string())
    })?;
    if billing.nif.trim().is_empty() {
        return Err(ServiceError::InvalidInput("NIF/CIF is required for a contract".to_string()));
    }
    if billing.fiscal_address.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Fiscal address is required for a contract".to_string(),
        ));
    }
    if billing.iban.trim().is_empty() {
        return Err(ServiceError::InvalidInput("IBAN is required for a contract".to_string()));
    }
    Ok(())
}

#[async_trait]
impl QuoteService for QuoteServiceImpl {
    #[instrument(skip(self, request), fields(client = %request.client.name))]
    async fn create_quote(&self, request: QuoteRequest) -> Result<RenderedDocument, ServiceError> {
        info!("Creating quote");
        validate_services(&request.services)?;

        let summary = pricing_service::summarize(&request.services);
        let reference = self.reference.issue().await;
        let (emission, expiry) = Self::document_dates();

        let input = DocumentInput {
            reference: &reference,
            client: &request.client,
            summary: &summary,
            notes: request.notes.as_deref(),
            billing: request.billing.as_ref(),
            emission,
            expiry,
        };
        let bytes = self.renderer.render_quote(&input).map_err(|e| {
            error!("Quote PDF render failed: {e}");
            ServiceError::InternalError(format!("PDF render failed: {e}"))
        })?;

        info!("Quote {} created ({} bytes)", reference, bytes.len());
        Ok(RenderedDocument { reference, bytes })
    }

    #[instrument(skip(self, request, quote_reference), fields(client = %request.client.name))]
    async fn create_contract(
        &self,
        request: QuoteRequest,
        quote_reference: Option<String>,
    ) -> Result<RenderedDocument, ServiceError> {
        info!("Creating contract");
        validate_billing(request.billing.as_ref())?;
        validate_services(&request.services)?;

        let summary = pricing_service::summarize(&request.services);
        let quote_reference = match quote_reference {
            Some(reference) => reference,
            None => self.reference.issue().await,
        };
        let reference = ReferenceService::contract_reference(&quote_reference);
        let (emission, expiry) = Self::document_dates();

        let input = DocumentInput {
            reference: &reference,
            client: &request.client,
            summary: &summary,
            notes: request.notes.as_deref(),
            billing: request.billing.as_ref(),
            emission,
            expiry,
        };
        let bytes = self.renderer.render_contract(&input).map_err(|e| {
            error!("Contract PDF render failed: {e}");
            ServiceError::InternalError(format!("PDF render failed: {e}"))
        })?;

        info!("Contract {} created ({} bytes)", reference, bytes.len());
        Ok(RenderedDocument { reference, bytes })
    }

    #[instrument(skip(self, request), fields(ref_number = %request.ref_number))]
    async fn send_quote_emails(
        &self,
        request: SendQuoteEmailRequest,
    ) -> Result<DispatchReport, ServiceError> {
        info!("Sending quote emails");

        let mut attachments = Vec::with_capacity(request.pdfs.len());
        for pdf in &request.pdfs {
            let content = BASE64.decode(pdf.content_base64.as_bytes()).map_err(|e| {
                ServiceError::InvalidInput(format!("Attachment {} is not valid base64: {e}", pdf.filename))
            })?;
            attachments.push(EmailAttachment {
                filename: pdf.filename.clone(),
                content_type: "application/pdf".to_string(),
                content,
            });
        }

        let summary = pricing_service::summarize(&request.services);

        let mut client_message = EmailMessage::new(
            request.email.clone(),
            format!("Su presupuesto {} - {}", request.ref_number, self.company.name),
        )
        .with_text_body(client_text_body(&self.company, &request))
        .with_html_body(client_html_body(&self.company, &request));
        for attachment in &attachments {
            client_message = client_message.with_attachment(attachment.clone());
        }

        let mut internal_message = EmailMessage::new(
            self.company.internal_email.clone(),
            format!("[WEB] Nuevo presupuesto {} - {}", request.ref_number, request.name),
        )
        .with_html_body(internal_html_body(&request, &summary));
        for attachment in attachments {
            internal_message = internal_message.with_attachment(attachment);
        }

        let report = dispatch_pair(self.email.as_ref(), client_message, internal_message).await;
        if report.is_hard_failure() {
            error!("No quote email could be delivered for {}", request.ref_number);
            return Err(ServiceError::InternalError(
                "The quote email could not be delivered".to_string(),
            ));
        }
        info!(
            "Quote emails dispatched: {} sent, {} failed",
            report.success, report.failed,
        );
        Ok(report)
    }
}

fn client_text_body(company: &CompanyConfig, request: &SendQuoteEmailRequest) -> String {
    format!(
        r#"Hola {name},

Gracias por confiar en {company}. Adjuntamos en PDF el presupuesto {reference} que ha solicitado a través de nuestra web.

El presupuesto tiene una validez de 30 días desde su emisión. Para aceptarlo, o para cualquier duda, responda a este correo o llámenos al {phone}.

Un saludo,
El equipo de {company}

---
Este mensaje se ha generado automáticamente; puede responder directamente a esta dirección."#,
        name = request.name,
        company = company.name,
        reference = request.ref_number,
        phone = company.phone,
    )
}

fn client_html_body(company: &CompanyConfig, request: &SendQuoteEmailRequest) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <title>Su presupuesto</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            background-color: #1f4e79;
            color: #ffffff;
            padding: 20px;
            text-align: center;
            border-radius: 8px 8px 0 0;
        }}
        .content {{
            background-color: #ffffff;
            padding: 30px;
            border: 1px solid #dee2e6;
        }}
        .reference {{
            background-color: #f2f6fa;
            padding: 12px;
            border-radius: 4px;
            font-weight: bold;
            text-align: center;
            margin: 20px 0;
        }}
        .footer {{
            background-color: #f8f9fa;
            padding: 15px;
            text-align: center;
            font-size: 12px;
            color: #6c757d;
            border-radius: 0 0 8px 8px;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h1>{company}</h1>
        <h2>Su presupuesto está listo</h2>
    </div>

    <div class="content">
        <p>Hola {name},</p>

        <p>Gracias por confiar en {company}. Adjuntamos en PDF el presupuesto que ha
        solicitado a través de nuestra web.</p>

        <div class="reference">Referencia: {reference}</div>

        <p>El presupuesto tiene una validez de 30 días desde su emisión. Para aceptarlo,
        o para cualquier duda, responda a este correo o llámenos al {phone}.</p>

        <p>Un saludo,<br>El equipo de {company}</p>
    </div>

    <div class="footer">
        <p>Este mensaje se ha generado automáticamente; puede responder directamente a esta dirección.</p>
    </div>
</body>
</html>"#,
        company = html_escape::encode_text(&company.name),
        name = html_escape::encode_text(&request.name),
        reference = html_escape::encode_text(&request.ref_number),
        phone = html_escape::encode_text(&company.phone),
    )
}

fn internal_html_body(request: &SendQuoteEmailRequest, summary: &QuoteSummary) -> String {
    let mut service_rows = String::new();
    for line in &summary.lines {
        service_rows.push_str(&format!(
            "<tr><td>{}</td><td>{} h</td><td>{}</td><td>{} €/h</td><td>{} €</td></tr>\n",
            html_escape::encode_text(line.kind.display_name()),
            line.quantity.normalize(),
            line.frequency.display_name(),
            line.price_per_hour,
            line.total,
        ));
    }
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Nueva solicitud de presupuesto desde la web</h2>
    <p><strong>Referencia:</strong> {reference}</p>
    <h3>Cliente</h3>
    <ul>
        <li><strong>Nombre:</strong> {name}</li>
        <li><strong>Email:</strong> {email}</li>
        <li><strong>Teléfono:</strong> {phone}</li>
    </ul>
    <h3>Servicios</h3>
    <table border="1" cellpadding="6" cellspacing="0">
        <tr><th>Servicio</th><th>Horas</th><th>Frecuencia</th><th>Precio/hora</th><th>Total</th></tr>
        {service_rows}
    </table>
    <p><strong>Total presupuesto (IVA incluido):</strong> {total} €</p>
    <h3>Observaciones</h3>
    <p>{notes}</p>
</body>
</html>"#,
        reference = html_escape::encode_text(&request.ref_number),
        name = html_escape::encode_text(&request.name),
        email = html_escape::encode_text(&request.email),
        phone = html_escape::encode_text(&request.phone),
        service_rows = service_rows,
        total = summary.total,
        notes = html_escape::encode_text(request.notes.as_deref().unwrap_or("Sin observaciones")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::quote::{Frequency, ServiceKind, Tariff};

    fn selection(quantity: i64) -> ServiceSelection {
        ServiceSelection {
            id: ServiceKind::Oficinas,
            quantity: Decimal::new(quantity, 0),
            frequency: Frequency::Unica,
            tariff: Tariff::Basica,
            weekly_services: None,
        }
    }

    fn billing() -> BillingDetails {
        BillingDetails {
            nif: "B-12345678".to_string(),
            company_name: Some("Cliente S.L.".to_string()),
            fiscal_address: "Calle Mayor 1, Madrid".to_string(),
            iban: "ES91 2100 0418 4502 0005 1332".to_string(),
        }
    }

    #[test]
    fn test_validate_services_rejects_empty_and_non_positive() {
        assert!(validate_services(&[]).is_err());
        assert!(validate_services(&[selection(0)]).is_err());
        assert!(validate_services(&[selection(3)]).is_ok());
    }

    #[test]
    fn test_validate_billing_requires_every_field() {
        assert!(validate_billing(None).is_err());
        assert!(validate_billing(Some(&billing())).is_ok());

        let mut missing_iban = billing();
        missing_iban.iban = "  ".to_string();
        let err = validate_billing(Some(&missing_iban)).unwrap_err();
        assert!(err.to_string().contains("IBAN"));

        let mut missing_nif = billing();
        missing_nif.nif = String::new();
        assert!(validate_billing(Some(&missing_nif)).is_err());
    }

    #[test]
    fn test_client_html_escapes_user_content() {
        let company = CompanyConfig::from_test_env();
        let request = SendQuoteEmailRequest {
            name: "<script>alert(1)</script>".to_string(),
            email: "a@b.com".to_string(),
            phone: "600000000".to_string(),
            ref_number: "PRE-7000".to_string(),
            services: vec![selection(3)],
            notes: None,
            pdfs: vec![],
        };
        let html = client_html_body(&company, &request);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
