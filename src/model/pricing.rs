use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::quote::{Frequency, ServiceKind, Tariff};

/// Price computed for one service selection. `subtotal` and `vat` are kept
/// unrounded; only `total` is rounded (half-up, 2 decimals).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub kind: ServiceKind,
    pub frequency: Frequency,
    /// Tariff actually used for the rate lookup (after the comunidades
    /// override), not necessarily the tariff the client asked for
    pub tariff: Tariff,
    pub quantity: Decimal,
    pub price_per_hour: Decimal,
    pub weekly_multiplier: u32,
    pub surcharge: Decimal,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    /// Advertised frequency discount, informational only
    pub discount_percent: u32,
}

/// Four-week normalization of a recurring service, shown to the client to
/// surface the savings of the frequency rate over the one-off rate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FourWeekProjection {
    pub kind: ServiceKind,
    pub frequency: Frequency,
    pub occurrences: u32,
    pub hours: Decimal,
    pub total_with_discount: Decimal,
    pub total_without_discount: Decimal,
    pub savings: Decimal,
}

/// Aggregate of all priced lines of a quote
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub lines: Vec<PriceBreakdown>,
    /// Raw sum of line subtotals
    pub subtotal: Decimal,
    /// Raw sum of line VAT amounts
    pub vat: Decimal,
    /// Sum of the individually rounded line totals
    pub total: Decimal,
    pub projections: Vec<FourWeekProjection>,
}

impl QuoteSummary {
    pub fn has_recurring(&self) -> bool {
        self.lines.iter().any(|line| line.frequency.is_recurring())
    }

    pub fn has_one_off(&self) -> bool {
        self.lines.iter().any(|line| !line.frequency.is_recurring())
    }
}
