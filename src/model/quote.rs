use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Services offered on the public site. Wire ids are the kebab-case slugs
/// the frontend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    Oficinas,
    Comunidades,
    LimpiezaPorHoras,
    FinDeObra,
    Garajes,
}

impl ServiceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Oficinas => "Limpieza de oficinas",
            ServiceKind::Comunidades => "Limpieza de comunidades",
            ServiceKind::LimpiezaPorHoras => "Limpieza por horas",
            ServiceKind::FinDeObra => "Limpieza fin de obra",
            ServiceKind::Garajes => "Limpieza de garajes",
        }
    }
}

/// Billing cadence of a service. Anything the frontend sends that is not a
/// known cadence deserializes to `Otra` and is priced as a one-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Unica,
    Semanal,
    Quincenal,
    Mensual,
    Otra,
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "unica" => Frequency::Unica,
            "semanal" => Frequency::Semanal,
            "quincenal" => Frequency::Quincenal,
            "mensual" => Frequency::Mensual,
            other => {
                tracing::warn!("Unrecognized frequency {:?}, pricing as one-off", other);
                Frequency::Otra
            }
        })
    }
}

impl Frequency {
    pub fn is_recurring(&self) -> bool {
        matches!(self, Frequency::Semanal | Frequency::Quincenal | Frequency::Mensual)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Frequency::Unica => "Única",
            Frequency::Semanal => "Semanal",
            Frequency::Quincenal => "Quincenal",
            Frequency::Mensual => "Mensual",
            Frequency::Otra => "Otra",
        }
    }
}

/// Whether the client supplies the cleaning products (básica) or the
/// company does (premium)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tariff {
    Basica,
    Premium,
}

impl Tariff {
    pub fn display_name(&self) -> &'static str {
        match self {
            Tariff::Basica => "Básica",
            Tariff::Premium => "Premium",
        }
    }
}

/// One line item of a quote: a service the client wants priced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSelection {
    pub id: ServiceKind,
    /// Hours per occurrence
    pub quantity: Decimal,
    pub frequency: Frequency,
    pub tariff: Tariff,
    /// Occurrences per week; only meaningful when frequency is semanal
    #[serde(default)]
    pub weekly_services: Option<u32>,
}

impl ServiceSelection {
    /// Occurrences per week used for pricing: `weekly_services` (at least 1)
    /// for weekly services, 1 for everything else.
    pub fn weekly_multiplier(&self) -> u32 {
        if self.frequency == Frequency::Semanal {
            self.weekly_services.unwrap_or(1).max(1)
        } else {
            1
        }
    }
}

/// Client identity attached to a quote request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Billing identity; only required when a contract is requested
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub nif: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub fiscal_address: String,
    pub iban: String,
}

/// A fully-parsed quote request, ready for pricing and rendering
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub client: ClientDetails,
    pub services: Vec<ServiceSelection>,
    pub notes: Option<String>,
    pub billing: Option<BillingDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_wire_ids() {
        assert_eq!(
            serde_json::to_string(&ServiceKind::LimpiezaPorHoras).unwrap(),
            "\"limpieza-por-horas\""
        );
        let kind: ServiceKind = serde_json::from_str("\"oficinas\"").unwrap();
        assert_eq!(kind, ServiceKind::Oficinas);
    }

    #[test]
    fn test_unknown_frequency_deserializes_to_otra() {
        let freq: Frequency = serde_json::from_str("\"diaria\"").unwrap();
        assert_eq!(freq, Frequency::Otra);
        assert!(!freq.is_recurring());
    }

    #[test]
    fn test_weekly_multiplier_only_for_semanal() {
        let mut selection = ServiceSelection {
            id: ServiceKind::LimpiezaPorHoras,
            quantity: Decimal::new(2, 0),
            frequency: Frequency::Semanal,
            tariff: Tariff::Premium,
            weekly_services: Some(3),
        };
        assert_eq!(selection.weekly_multiplier(), 3);

        selection.frequency = Frequency::Mensual;
        assert_eq!(selection.weekly_multiplier(), 1);

        selection.frequency = Frequency::Semanal;
        selection.weekly_services = None;
        assert_eq!(selection.weekly_multiplier(), 1);
    }
}
