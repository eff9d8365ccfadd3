use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::model::pricing::{FourWeekProjection, PriceBreakdown, QuoteSummary};
use crate::model::quote::{Frequency, ServiceKind, ServiceSelection, Tariff};

/// Bookings of this many hours or fewer pay the minimum-service surcharge.
fn surcharge_threshold() -> Decimal {
    Decimal::new(2, 0)
}

/// Flat surcharge per occurrence for low-hour bookings, in euros.
fn surcharge_amount() -> Decimal {
    Decimal::new(15, 0)
}

fn vat_rate() -> Decimal {
    Decimal::new(21, 2)
}

/// Hourly rate table. Recurring rates already encode the advertised
/// frequency discount; an unrecognized cadence prices as a one-off.
fn rate(tariff: Tariff, frequency: Frequency) -> Decimal {
    let cents: i64 = match (tariff, frequency) {
        (Tariff::Basica, Frequency::Unica) => 1900,
        (Tariff::Basica, Frequency::Semanal) => 1615,
        (Tariff::Basica, Frequency::Quincenal) => 1710,
        (Tariff::Basica, Frequency::Mensual) => 1805,
        (Tariff::Basica, Frequency::Otra) => 1900,
        (Tariff::Premium, Frequency::Unica) => 2100,
        (Tariff::Premium, Frequency::Semanal) => 1785,
        (Tariff::Premium, Frequency::Quincenal) => 1890,
        (Tariff::Premium, Frequency::Mensual) => 1995,
        (Tariff::Premium, Frequency::Otra) => 2100,
    };
    Decimal::new(cents, 2)
}

/// Advertised discount per cadence. Informational: pricing already encodes
/// it inside the rate table.
pub fn discount_percent(frequency: Frequency) -> u32 {
    match frequency {
        Frequency::Semanal => 15,
        Frequency::Quincenal => 10,
        Frequency::Mensual => 5,
        Frequency::Unica | Frequency::Otra => 0,
    }
}

/// Tariff used for the rate lookup. Comunidades is always serviced with
/// company products, so a básica request prices as premium; the stored
/// selection keeps whatever the client asked for.
fn effective_tariff(selection: &ServiceSelection) -> Tariff {
    if selection.id == ServiceKind::Comunidades && selection.tariff == Tariff::Basica {
        Tariff::Premium
    } else {
        selection.tariff
    }
}

fn round_total(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Resolve the price of one service selection.
///
/// The minimum-service surcharge applies once per occurrence: for weekly
/// services that means once per weekly visit, so a 2-hour service three
/// times a week pays it three times.
pub fn resolve_price(selection: &ServiceSelection) -> PriceBreakdown {
    let tariff = effective_tariff(selection);
    let price_per_hour = rate(tariff, selection.frequency);
    let weekly_multiplier = selection.weekly_multiplier();
    let multiplier = Decimal::from(weekly_multiplier);

    let surcharge = if selection.quantity <= surcharge_threshold() {
        surcharge_amount() * multiplier
    } else {
        Decimal::ZERO
    };

    let subtotal = price_per_hour * selection.quantity * multiplier + surcharge;
    let vat = subtotal * vat_rate();
    let total = round_total(subtotal + vat);

    debug!(
        service = ?selection.id,
        %price_per_hour,
        weekly_multiplier,
        %subtotal,
        %total,
        "resolved price"
    );

    PriceBreakdown {
        kind: selection.id,
        frequency: selection.frequency,
        tariff,
        quantity: selection.quantity,
        price_per_hour,
        weekly_multiplier,
        surcharge,
        subtotal,
        vat,
        total,
        discount_percent: discount_percent(selection.frequency),
    }
}

/// Normalize a recurring service to a 4-week window, pricing it at the
/// frequency rate and at the one-off rate to show the savings. Returns None
/// for one-off services. Totals are rounded independently of the per-line
/// totals and may not reconcile with them to the cent.
pub fn project_four_weeks(selection: &ServiceSelection) -> Option<FourWeekProjection> {
    let occurrences: u32 = match selection.frequency {
        Frequency::Semanal => selection.weekly_multiplier() * 4,
        Frequency::Quincenal => 2,
        Frequency::Mensual => 1,
        Frequency::Unica | Frequency::Otra => return None,
    };

    let tariff = effective_tariff(selection);
    let occurrence_count = Decimal::from(occurrences);

    let per_occurrence = |hourly: Decimal| {
        let mut subtotal = hourly * selection.quantity;
        if selection.quantity <= surcharge_threshold() {
            subtotal += surcharge_amount();
        }
        subtotal
    };
    let gross = |subtotal: Decimal| round_total(subtotal * (Decimal::ONE + vat_rate()));

    let total_with_discount = gross(per_occurrence(rate(tariff, selection.frequency)) * occurrence_count);
    let total_without_discount = gross(per_occurrence(rate(tariff, Frequency::Unica)) * occurrence_count);

    Some(FourWeekProjection {
        kind: selection.id,
        frequency: selection.frequency,
        occurrences,
        hours: selection.quantity * occurrence_count,
        total_with_discount,
        total_without_discount,
        savings: total_without_discount - total_with_discount,
    })
}

/// Price every selected service and aggregate the quote totals. The
/// aggregate total is exactly the sum of the individual line totals.
pub fn summarize(services: &[ServiceSelection]) -> QuoteSummary {
    let lines: Vec<PriceBreakdown> = services.iter().map(resolve_price).collect();

    let subtotal = lines.iter().map(|line| line.subtotal).sum();
    let vat = lines.iter().map(|line| line.vat).sum();
    let total = lines.iter().map(|line| line.total).sum();

    let projections = services.iter().filter_map(project_four_weeks).collect();

    QuoteSummary { lines, subtotal, vat, total, projections }
}
