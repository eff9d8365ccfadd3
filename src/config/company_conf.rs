use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::config::ConfigError;

/// Company identity used in generated documents and emails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// Commercial name shown to clients
    pub name: String,
    /// Registered legal name
    pub legal_name: String,
    /// Tax identification (CIF)
    pub nif: String,
    /// Street address
    pub address: String,
    /// Postal code and city
    pub postal_city: String,
    /// Public phone number
    pub phone: String,
    /// Public contact mailbox
    pub email: String,
    /// Website shown in document footers
    pub website: String,
    /// IBAN printed on contracts
    pub iban: String,
    /// Mailbox that receives the internal copy of every form submission
    pub internal_email: String,
}

impl CompanyConfig {
    /// Create CompanyConfig from environment variables. Every field has a
    /// default so a development instance starts without any COMPANY_* vars.
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading company configuration from environment variables");

        let defaults = CompanyConfig::default();

        let get = |key: &str, default: &str| {
            env::var(key).unwrap_or_else(|_| {
                warn!("{} not set, using default", key);
                default.to_string()
            })
        };

        let config = CompanyConfig {
            name: get("COMPANY_NAME", &defaults.name),
            legal_name: get("COMPANY_LEGAL_NAME", &defaults.legal_name),
            nif: get("COMPANY_NIF", &defaults.nif),
            address: get("COMPANY_ADDRESS", &defaults.address),
            postal_city: get("COMPANY_POSTAL_CITY", &defaults.postal_city),
            phone: get("COMPANY_PHONE", &defaults.phone),
            email: get("COMPANY_EMAIL", &defaults.email),
            website: get("COMPANY_WEBSITE", &defaults.website),
            iban: get("COMPANY_IBAN", &defaults.iban),
            internal_email: get("COMPANY_INTERNAL_EMAIL", &defaults.internal_email),
        };

        config.validate()?;
        info!("Company configuration loaded successfully");
        Ok(config)
    }

    /// Create CompanyConfig for testing
    pub fn from_test_env() -> Self {
        CompanyConfig {
            internal_email: "interno@test.example.com".to_string(),
            email: "hola@test.example.com".to_string(),
            ..CompanyConfig::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError("Company name cannot be empty".to_string()));
        }
        if !self.email.contains('@') {
            return Err(ConfigError::ValidationError("Invalid company email format".to_string()));
        }
        if !self.internal_email.contains('@') {
            return Err(ConfigError::ValidationError("Invalid internal email format".to_string()));
        }
        Ok(())
    }
}

impl Default for CompanyConfig {
    fn default() -> Self {
        CompanyConfig {
            name: "Limpiezas Brillante".to_string(),
            legal_name: "Limpiezas Brillante S.L.".to_string(),
            nif: "B-86452917".to_string(),
            address: "Calle de la Agricultura 14, local 2".to_string(),
            postal_city: "28037 Madrid".to_string(),
            phone: "+34 910 555 214".to_string(),
            email: "hola@limpiezasbrillante.es".to_string(),
            website: "www.limpiezasbrillante.es".to_string(),
            iban: "ES21 0049 1234 5012 3456 7890".to_string(),
            internal_email: "presupuestos@limpiezasbrillante.es".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CompanyConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let mut config = CompanyConfig::default();
        config.name = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_internal_email() {
        let mut config = CompanyConfig::default();
        config.internal_email = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }
}
