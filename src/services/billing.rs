use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{collect_warnings, load_rates, OrderWarning};
use crate::error::{BillingError, Result};
use crate::format::format_usd;
use crate::models::OrderRow;
use crate::repository::{BillingWindow, OrderStore};
use crate::revenue::{OrderProjection, PriceSource, RevenueCalculator, RevenueTotals};

/// Raw ledger query string. Empty values mean "not set".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub phys: Option<String>,
    pub search: Option<String>,
    pub product_id: Option<String>,
    pub cpt_code: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub physician: Option<String>,
    pub search: Option<String>,
    pub product_id: Option<String>,
    pub cpt_code: Option<String>,
    pub status: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(name: &str, value: &Option<String>) -> Result<Option<NaiveDate>> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| BillingError::InvalidFilter(format!("{} must be YYYY-MM-DD, got {:?}", name, text))),
    }
}

impl BillingFilter {
    /// Defaults to the current month up to and including `today`.
    pub fn parse(params: &BillingParams, today: NaiveDate) -> Result<Self> {
        let month_start = today.with_day(1).unwrap_or(today);
        let from = parse_date("from", &params.from)?.unwrap_or(month_start);
        let to = parse_date("to", &params.to)?.unwrap_or(today);

        if from > to {
            return Err(BillingError::InvalidFilter(format!(
                "from ({}) is after to ({})",
                from, to
            )));
        }

        Ok(Self {
            from,
            to,
            physician: non_empty(&params.phys),
            search: non_empty(&params.search).map(|s| s.to_lowercase()),
            product_id: non_empty(&params.product_id),
            cpt_code: non_empty(&params.cpt_code),
            status: non_empty(&params.status),
        })
    }

    pub fn window(&self) -> BillingWindow {
        BillingWindow {
            from: self.from,
            to: self.to,
            physician: self.physician.clone(),
        }
    }

    /// Apply every filter to a row, including the ones the store already
    /// narrowed by.
    pub fn matches(&self, row: &OrderRow) -> bool {
        if row.order_status().excluded_from_revenue() {
            return false;
        }

        let created = row.created_at.date_naive();
        if created < self.from || created > self.to {
            return false;
        }

        if let Some(physician) = &self.physician {
            if row.user_id.as_deref() != Some(physician.as_str()) {
                return false;
            }
        }

        if let Some(product_id) = &self.product_id {
            if row.product_id.as_deref().map(str::trim) != Some(product_id.as_str()) {
                return false;
            }
        }

        if let Some(code) = &self.cpt_code {
            let matched = row
                .cpt_code
                .as_deref()
                .map_or(false, |c| c.trim().eq_ignore_ascii_case(code));
            if !matched {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if !row.status.trim().eq_ignore_ascii_case(status) {
                return false;
            }
        }

        if let Some(needle) = &self.search {
            let haystacks = [
                row.patient_name(),
                row.id.clone(),
                row.product_label(),
                row.sku.clone().unwrap_or_default(),
            ];
            if !haystacks.iter().any(|h| h.to_lowercase().contains(needle.as_str())) {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingLine {
    pub order_id: String,
    pub created_on: NaiveDate,
    pub patient_name: String,
    pub dob: Option<String>,
    pub product: String,
    pub sku: Option<String>,
    pub frequency_per_week: u32,
    pub frequency_display: String,
    /// Absent when the schema does not track shipments.
    pub shipments_remaining: Option<i64>,
    pub cpt_code: Option<String>,
    pub unit_price: Decimal,
    pub price_source: PriceSource,
    pub units_remaining: u64,
    pub projected_revenue: Decimal,
    pub projected_revenue_display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingLedger {
    pub filter: BillingFilter,
    pub lines: Vec<BillingLine>,
    pub total: Decimal,
    pub total_display: String,
    pub data_unavailable: bool,
    pub notices: Vec<String>,
    pub warnings: Vec<OrderWarning>,
}

pub struct BillingService {
    store: Arc<dyn OrderStore>,
}

impl BillingService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn ledger(&self, filter: BillingFilter) -> BillingLedger {
        let features = self.store.features();

        let rows = match self.store.billing_rows(&filter.window()).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, from = %filter.from, to = %filter.to, "Failed to load billing orders");
                return BillingLedger {
                    filter,
                    lines: Vec::new(),
                    total: Decimal::ZERO,
                    total_display: format_usd(Decimal::ZERO),
                    data_unavailable: true,
                    notices: vec!["Billing data is unavailable; totals are not current".to_string()],
                    warnings: Vec::new(),
                };
            }
        };

        let mut notices = Vec::new();
        let rates = load_rates(self.store.as_ref(), &mut notices).await;
        let calculator = RevenueCalculator::new(&rates, features);

        let mut lines = Vec::new();
        let mut projections: Vec<OrderProjection> = Vec::new();
        for row in rows.iter().filter(|row| filter.matches(row)) {
            let projection = calculator.project(row);
            let schedule = projection.schedule;

            lines.push(BillingLine {
                order_id: row.id.clone(),
                created_on: row.created_at.date_naive(),
                patient_name: row.patient_name(),
                dob: row.dob.clone(),
                product: row.product_label(),
                sku: row.sku.clone(),
                frequency_per_week: schedule.frequency_per_week,
                frequency_display: format!("{}×/week", schedule.frequency_per_week),
                shipments_remaining: if features.shipments_remaining {
                    Some(row.shipments_remaining.unwrap_or(0))
                } else {
                    None
                },
                cpt_code: row.cpt_code.clone(),
                unit_price: projection.unit_price,
                price_source: projection.price_source,
                units_remaining: schedule.units_remaining,
                projected_revenue: projection.projected_remaining_revenue,
                projected_revenue_display: format_usd(projection.projected_remaining_revenue),
            });
            projections.push(projection);
        }

        let totals: RevenueTotals = projections.iter().collect();

        tracing::info!(
            from = %filter.from,
            to = %filter.to,
            lines = lines.len(),
            total = %totals.projected_remaining_revenue,
            "Billing ledger built"
        );

        BillingLedger {
            filter,
            lines,
            total_display: format_usd(totals.projected_remaining_revenue),
            total: totals.projected_remaining_revenue,
            data_unavailable: false,
            notices,
            warnings: collect_warnings(&projections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> BillingParams {
        let mut p = BillingParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "from" => p.from = v,
                "to" => p.to = v,
                "phys" => p.phys = v,
                "search" => p.search = v,
                "product_id" => p.product_id = v,
                "cpt_code" => p.cpt_code = v,
                "status" => p.status = v,
                _ => panic!("unknown param {}", k),
            }
        }
        p
    }

    fn row(id: &str, status: &str, y: i32, m: u32, d: u32) -> OrderRow {
        OrderRow::new(id, status, Utc.with_ymd_and_hms(y, m, d, 15, 30, 0).unwrap())
    }

    #[test]
    fn test_defaults_to_current_month() {
        let filter = BillingFilter::parse(&BillingParams::default(), day(2024, 3, 17)).unwrap();
        assert_eq!(filter.from, day(2024, 3, 1));
        assert_eq!(filter.to, day(2024, 3, 17));
        assert_eq!(filter.physician, None);
    }

    #[test]
    fn test_blank_params_are_unset() {
        let filter = BillingFilter::parse(&params(&[("from", ""), ("phys", "  "), ("search", "")]), day(2024, 3, 17)).unwrap();
        assert_eq!(filter.from, day(2024, 3, 1));
        assert_eq!(filter.physician, None);
        assert_eq!(filter.search, None);
    }

    #[test]
    fn test_rejects_bad_dates() {
        let err = BillingFilter::parse(&params(&[("from", "03/01/2024")]), day(2024, 3, 17)).unwrap_err();
        assert!(matches!(err, BillingError::InvalidFilter(_)));

        let err = BillingFilter::parse(&params(&[("from", "2024-03-10"), ("to", "2024-03-01")]), day(2024, 3, 17)).unwrap_err();
        assert!(matches!(err, BillingError::InvalidFilter(_)));
    }

    #[test]
    fn test_to_date_is_inclusive() {
        let filter = BillingFilter::parse(&params(&[("from", "2024-03-01"), ("to", "2024-03-05")]), day(2024, 3, 17)).unwrap();
        assert!(filter.matches(&row("1", "approved", 2024, 3, 5)));
        assert!(filter.matches(&row("2", "approved", 2024, 3, 1)));
        assert!(!filter.matches(&row("3", "approved", 2024, 3, 6)));
        assert!(!filter.matches(&row("4", "approved", 2024, 2, 29)));
    }

    #[test]
    fn test_excluded_statuses_never_match() {
        let filter = BillingFilter::parse(&params(&[("from", "2024-03-01")]), day(2024, 3, 17)).unwrap();
        assert!(!filter.matches(&row("1", "rejected", 2024, 3, 5)));
        assert!(!filter.matches(&row("2", "Cancelled", 2024, 3, 5)));
    }

    #[test]
    fn test_field_filters() {
        let today = day(2024, 3, 17);
        let mut r = row("1042", "approved", 2024, 3, 5);
        r.user_id = Some("7".into());
        r.product_id = Some("3".into());
        r.cpt_code = Some("A6196".into());
        r.first_name = Some("Jane".into());
        r.last_name = Some("Doe".into());
        r.sku = Some("COLL-MTX-2X2".into());

        let ok = |pairs: &[(&str, &str)]| BillingFilter::parse(&params(pairs), today).unwrap().matches(&r);

        assert!(ok(&[("phys", "7")]));
        assert!(!ok(&[("phys", "8")]));
        assert!(ok(&[("product_id", "3")]));
        assert!(!ok(&[("product_id", "4")]));
        assert!(ok(&[("cpt_code", "a6196")]));
        assert!(!ok(&[("cpt_code", "A6197")]));
        assert!(ok(&[("status", "APPROVED")]));
        assert!(!ok(&[("status", "delivered")]));
        assert!(ok(&[("search", "doe")]));
        assert!(ok(&[("search", "1042")]));
        assert!(ok(&[("search", "mtx")]));
        assert!(!ok(&[("search", "smith")]));
    }
}
