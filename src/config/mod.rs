pub mod app_conf;
pub mod chat_conf;
pub mod company_conf;
pub mod email_conf;
pub mod reference_conf;

pub use app_conf::AppConfig;
pub use chat_conf::ChatConfig;
pub use company_conf::CompanyConfig;
pub use email_conf::EmailConfig;
pub use reference_conf::ReferenceConfig;

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
