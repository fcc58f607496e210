//! Billable units and projected revenue for a single order.
//!
//! Every report (dashboard, billing ledger, order packet) goes through
//! [`RevenueCalculator`]; nothing else multiplies rates by units.
//!
//! Dirty input never fails a calculation. Missing or out-of-range fields
//! are coerced to their defaults and a [`DataWarning`] is recorded instead.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::frequency::{resolve_frequency, FrequencySource};
use crate::models::{OrderRow, RateTable, SchemaFeatures};

/// Weeks assumed for a fill when the order has no usable duration.
pub const DEFAULT_WEEKS_AUTHORIZED: u64 = 4;

/// The prescription fields the calculation reads, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrescriptionTerms {
    pub frequency_per_week: Option<i64>,
    pub frequency: Option<String>,
    pub qty_per_change: Option<i64>,
    pub duration_days: Option<i64>,
    pub refills_allowed: Option<i64>,
    pub shipments_remaining: Option<i64>,
}

impl PrescriptionTerms {
    pub fn from_row(row: &OrderRow) -> Self {
        Self {
            frequency_per_week: row.frequency_per_week,
            frequency: row.frequency.clone(),
            qty_per_change: row.qty_per_change,
            duration_days: row.duration_days,
            refills_allowed: row.refills_allowed,
            shipments_remaining: row.shipments_remaining,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    UnrecognizedFrequency { text: String },
    InvalidQuantity { value: Option<i64> },
    NegativeDuration { value: i64 },
    NegativeRefills { value: i64 },
    NoUnitPrice,
    AmountOverflow,
}

/// Normalised schedule: how many units the order authorises and how many
/// are still to be billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSchedule {
    pub frequency_per_week: u32,
    pub qty_per_change: u32,
    pub weeks_authorized: u64,
    pub weeks_authorized_all: u64,
    pub remaining_weeks: u64,
    pub units_remaining: u64,
    pub total_authorized_units: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    PayerRate,
    ProductPrice,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProjection {
    pub order_id: String,
    /// False for rejected/cancelled orders; their amounts are zero.
    pub billable: bool,
    pub schedule: UnitSchedule,
    pub unit_price: Decimal,
    pub price_source: PriceSource,
    pub projected_remaining_revenue: Decimal,
    pub total_authorized_revenue: Decimal,
    pub warnings: Vec<DataWarning>,
}

/// Build the unit schedule from raw prescription terms.
///
/// `shipments_tracked` is false when the database has no
/// `orders.shipments_remaining` column; the remaining window is then the
/// full authorisation.
pub fn unit_schedule(
    terms: &PrescriptionTerms,
    shipments_tracked: bool,
    warnings: &mut Vec<DataWarning>,
) -> UnitSchedule {
    let frequency = resolve_frequency(terms.frequency_per_week, terms.frequency.as_deref());
    if frequency.source == FrequencySource::Default {
        if let Some(text) = terms.frequency.as_deref().filter(|t| !t.trim().is_empty()) {
            warnings.push(DataWarning::UnrecognizedFrequency {
                text: text.to_string(),
            });
        }
    }

    let qty_per_change = match terms.qty_per_change {
        Some(q) if q >= 1 => u32::try_from(q).unwrap_or(u32::MAX),
        other => {
            warnings.push(DataWarning::InvalidQuantity { value: other });
            1
        }
    };

    let duration_days = match terms.duration_days {
        Some(d) if d < 0 => {
            warnings.push(DataWarning::NegativeDuration { value: d });
            0
        }
        Some(d) => d as u64,
        None => 0,
    };
    let weeks_authorized = if duration_days > 0 {
        duration_days.div_ceil(7)
    } else {
        DEFAULT_WEEKS_AUTHORIZED
    };

    let refills = match terms.refills_allowed {
        Some(r) if r < 0 => {
            warnings.push(DataWarning::NegativeRefills { value: r });
            0
        }
        Some(r) => r as u64,
        None => 0,
    };
    let weeks_authorized_all = weeks_authorized.saturating_mul(refills.saturating_add(1));

    let remaining_weeks = match terms.shipments_remaining {
        Some(s) if shipments_tracked && s > 0 => (s as u64).min(weeks_authorized_all),
        _ => weeks_authorized_all,
    };

    let per_week_units = u64::from(frequency.per_week).saturating_mul(u64::from(qty_per_change));

    UnitSchedule {
        frequency_per_week: frequency.per_week,
        qty_per_change,
        weeks_authorized,
        weeks_authorized_all,
        remaining_weeks,
        units_remaining: remaining_weeks.saturating_mul(per_week_units),
        total_authorized_units: weeks_authorized_all.saturating_mul(per_week_units),
    }
}

/// Pure revenue projection over already-fetched rows.
#[derive(Debug, Clone)]
pub struct RevenueCalculator<'a> {
    rates: &'a RateTable,
    features: SchemaFeatures,
}

impl<'a> RevenueCalculator<'a> {
    pub fn new(rates: &'a RateTable, features: SchemaFeatures) -> Self {
        Self { rates, features }
    }

    /// Payer rate when one is usable for the CPT code, else the order's
    /// stored product price.
    pub fn unit_price(&self, cpt_code: Option<&str>, product_price: Option<Decimal>) -> (Decimal, PriceSource) {
        if self.features.products && self.features.reimbursement_rates {
            if let Some(rate) = cpt_code.and_then(|code| self.rates.rate_for(code)) {
                return (rate, PriceSource::PayerRate);
            }
        }

        match product_price {
            Some(price) if price > Decimal::ZERO => (price, PriceSource::ProductPrice),
            _ => (Decimal::ZERO, PriceSource::None),
        }
    }

    pub fn project(&self, row: &OrderRow) -> OrderProjection {
        let mut warnings = Vec::new();
        let terms = PrescriptionTerms::from_row(row);
        let schedule = unit_schedule(&terms, self.features.shipments_remaining, &mut warnings);

        let billable = !row.order_status().excluded_from_revenue();
        let cpt_code = if self.features.products { row.cpt_code.as_deref() } else { None };
        let (unit_price, price_source) = self.unit_price(cpt_code, row.product_price);

        if billable && price_source == PriceSource::None {
            warnings.push(DataWarning::NoUnitPrice);
        }

        let (projected_remaining_revenue, total_authorized_revenue) = if billable {
            (
                amount(unit_price, schedule.units_remaining, &mut warnings),
                amount(unit_price, schedule.total_authorized_units, &mut warnings),
            )
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        OrderProjection {
            order_id: row.id.clone(),
            billable,
            schedule,
            unit_price,
            price_source,
            projected_remaining_revenue,
            total_authorized_revenue,
            warnings,
        }
    }
}

fn amount(unit_price: Decimal, units: u64, warnings: &mut Vec<DataWarning>) -> Decimal {
    if unit_price <= Decimal::ZERO || units == 0 {
        return Decimal::ZERO;
    }
    match unit_price.checked_mul(Decimal::from(units)) {
        Some(total) => total,
        None => {
            if !warnings.contains(&DataWarning::AmountOverflow) {
                warnings.push(DataWarning::AmountOverflow);
            }
            Decimal::ZERO
        }
    }
}
