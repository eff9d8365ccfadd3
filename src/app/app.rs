use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::app_conf::AppConfig;

pub struct App {
    config: AppConfig,
    router: Router,
    pub quote_service: Arc<crate::service::quote_service::QuoteServiceImpl>,
    pub contact_service: Arc<crate::service::contact_service::ContactServiceImpl>,
    pub chat_service: Arc<crate::service::chat_service::ChatServiceImpl>,
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();

        use crate::config::{ChatConfig, CompanyConfig, EmailConfig, ReferenceConfig};
        use crate::service::chat_service::{ChatServiceImpl, HttpCompletionClient};
        use crate::service::contact_service::ContactServiceImpl;
        use crate::service::quote_service::QuoteServiceImpl;
        use crate::util::email::{EmailService, SmtpEmailService};
        use crate::util::pdf::PdfRenderer;
        use crate::util::reference::ReferenceService;

        let company_config = CompanyConfig::from_env().expect("Company config error");
        let email_config = EmailConfig::from_env().expect("Email config error");
        let chat_config = ChatConfig::from_env().expect("Chat config error");
        let reference_config = ReferenceConfig::from_env().expect("Reference config error");

        let email_service = Arc::new(
            SmtpEmailService::new(email_config).expect("SMTP service error"),
        ) as Arc<dyn EmailService>;

        let renderer = PdfRenderer::new(
            company_config.clone(),
            config.template_dir.clone(),
            config.assets_dir.clone(),
        );
        let reference_service = ReferenceService::new(&reference_config);

        let quote_service = Arc::new(QuoteServiceImpl {
            reference: reference_service,
            renderer,
            email: email_service.clone(),
            company: company_config.clone(),
        });
        let contact_service = Arc::new(ContactServiceImpl {
            email: email_service,
            company: company_config,
        });
        let completion_client = Arc::new(HttpCompletionClient::new(chat_config.clone()));
        let chat_service = Arc::new(ChatServiceImpl::new(chat_config, completion_client));

        let mut app = App {
            config,
            router: Router::new(),
            quote_service,
            contact_service,
            chat_service,
        };
        app.router = app.create_router();
        app
    }

    fn create_router(&self) -> Router {
        use crate::router::chat_router::chat_router;
        use crate::router::contact_router::contact_router;
        use crate::router::quote_router::quote_router;
        Router::new()
            .merge(quote_router(self.quote_service.clone()))
            .merge(contact_router(self.contact_service.clone()))
            .merge(chat_router(self.chat_service.clone()))
            .route("/health", get(|| async { "OK" }))
    }

    pub async fn start(self) {
        let addr = SocketAddr::new(self.config.host.parse().expect("Invalid host"), self.config.port);
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
        axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Failed to start server");
    }
}
