use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::config::CompanyConfig;
use crate::dto::contact_dto::{ContactRequest, JobApplication};
use crate::util::email::{dispatch_pair, DispatchReport, EmailMessage, EmailService};
use crate::util::error::ServiceError;

#[async_trait]
pub trait ContactService: Send + Sync {
    async fn send_contact_emails(
        &self,
        request: ContactRequest,
    ) -> Result<DispatchReport, ServiceError>;
    async fn send_job_application(
        &self,
        application: JobApplication,
    ) -> Result<DispatchReport, ServiceError>;
}

pub struct ContactServiceImpl {
    pub email: Arc<dyn EmailService>,
    pub company: CompanyConfig,
}

#[async_trait]
impl ContactService for ContactServiceImpl {
    #[instrument(skip(self, request), fields(from = %request.email))]
    async fn send_contact_emails(
        &self,
        request: ContactRequest,
    ) -> Result<DispatchReport, ServiceError> {
        info!("Dispatching contact form emails");

        let client_message = EmailMessage::new(
            request.email.clone(),
            format!("Hemos recibido su mensaje - {}", self.company.name),
        )
        .with_text_body(contact_confirmation_text(&self.company, &request))
        .with_html_body(contact_confirmation_html(&self.company, &request));

        let internal_message = EmailMessage::new(
            self.company.internal_email.clone(),
            format!("[WEB] Mensaje de contacto de {}", request.name),
        )
        .with_html_body(contact_internal_html(&request));

        let report = dispatch_pair(self.email.as_ref(), client_message, internal_message).await;
        if report.is_hard_failure() {
            error!("No contact email could be delivered");
            return Err(ServiceError::InternalError(
                "The contact message could not be delivered".to_string(),
            ));
        }
        Ok(report)
    }

    #[instrument(skip(self, application), fields(from = %application.email, position = %application.position))]
    async fn send_job_application(
        &self,
        application: JobApplication,
    ) -> Result<DispatchReport, ServiceError> {
        info!("Dispatching job application emails");

        let client_message = EmailMessage::new(
            application.email.clone(),
            format!("Hemos recibido su candidatura - {}", self.company.name),
        )
        .with_text_body(application_confirmation_text(&self.company, &application));

        let mut internal_message = EmailMessage::new(
            self.company.internal_email.clone(),
            format!(
                "[WEB] Candidatura de {} para {}",
                application.name, application.position,
            ),
        )
        .with_html_body(application_internal_html(&application));
        if let Some(cv) = application.cv {
            internal_message = internal_message.with_attachment(cv);
        }

        let report = dispatch_pair(self.email.as_ref(), client_message, internal_message).await;
        if report.is_hard_failure() {
            error!("No job application email could be delivered");
            return Err(ServiceError::InternalError(
                "The application could not be delivered".to_string(),
            ));
        }
        Ok(report)
    }
}

fn contact_confirmation_text(company: &CompanyConfig, request: &ContactRequest) -> String {
    format!(
        r#"Hola {name},

Hemos recibido su mensaje y le responderemos lo antes posible, normalmente en menos de 24 horas laborables.

Si su consulta es urgente puede llamarnos al {phone}.

Un saludo,
El equipo de {company}"#,
        name = request.name,
        phone = company.phone,
        company = company.name,
    )
}

fn contact_confirmation_html(company: &CompanyConfig, request: &ContactRequest) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #1f4e79;">{company}</h2>
    <p>Hola {name},</p>
    <p>Hemos recibido su mensaje y le responderemos lo antes posible, normalmente en
    menos de 24 horas laborables.</p>
    <p>Si su consulta es urgente puede llamarnos al {phone}.</p>
    <p>Un saludo,<br>El equipo de {company}</p>
</body>
</html>"#,
        company = html_escape::encode_text(&company.name),
        name = html_escape::encode_text(&request.name),
        phone = html_escape::encode_text(&company.phone),
    )
}

fn contact_internal_html(request: &ContactRequest) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Nuevo mensaje de contacto desde la web</h2>
    <ul>
        <li><strong>Nombre:</strong> {name}</li>
        <li><strong>Email:</strong> {email}</li>
        <li><strong>Teléfono:</strong> {phone}</li>
    </ul>
    <h3>Mensaje</h3>
    <p>{message}</p>
</body>
</html>"#,
        name = html_escape::encode_text(&request.name),
        email = html_escape::encode_text(&request.email),
        phone = html_escape::encode_text(&request.phone),
        message = html_escape::encode_text(&request.message),
    )
}

fn application_confirmation_text(company: &CompanyConfig, application: &JobApplication) -> String {
    format!(
        r#"Hola {name},

Hemos recibido su candidatura para el puesto de {position}. Si su perfil encaja con nuestras necesidades nos pondremos en contacto con usted.

Gracias por su interés en {company}.

Un saludo,
El equipo de {company}"#,
        name = application.name,
        position = application.position,
        company = company.name,
    )
}

fn application_internal_html(application: &JobApplication) -> String {
    let cv_note = if application.cv.is_some() {
        "CV adjunto a este correo"
    } else {
        "Sin CV adjunto"
    };
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Nueva candidatura desde la web</h2>
    <ul>
        <li><strong>Nombre:</strong> {name}</li>
        <li><strong>Email:</strong> {email}</li>
        <li><strong>Teléfono:</strong> {phone}</li>
        <li><strong>Puesto:</strong> {position}</li>
        <li><strong>CV:</strong> {cv_note}</li>
    </ul>
    <h3>Mensaje</h3>
    <p>{message}</p>
</body>
</html>"#,
        name = html_escape::encode_text(&application.name),
        email = html_escape::encode_text(&application.email),
        phone = html_escape::encode_text(&application.phone),
        position = html_escape::encode_text(&application.position),
        cv_note = cv_note,
        message = html_escape::encode_text(application.message.as_deref().unwrap_or("Sin mensaje")),
    )
}
