pub mod billing;
pub mod dashboard;
pub mod packet;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::RateTable;
use crate::repository::OrderStore;
use crate::revenue::{DataWarning, OrderProjection};

pub use billing::{BillingFilter, BillingLedger, BillingParams, BillingService};
pub use dashboard::{DashboardReport, DashboardService};
pub use packet::{OrderPacketReport, PacketService};

pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub dashboard: DashboardService,
    pub billing: BillingService,
    pub packets: PacketService,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            dashboard: DashboardService::new(store.clone()),
            billing: BillingService::new(store.clone()),
            packets: PacketService::new(store.clone()),
            store,
        }
    }
}

/// A data-quality problem found while projecting one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWarning {
    pub order_id: String,
    pub warning: DataWarning,
}

/// Rates for a report. A failing rate query degrades to list prices.
pub(crate) async fn load_rates(store: &dyn OrderStore, notices: &mut Vec<String>) -> RateTable {
    match store.reimbursement_rates().await {
        Ok(rates) => rates,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load reimbursement rates");
            notices.push("Reimbursement rates unavailable; product prices were used instead".to_string());
            RateTable::new()
        }
    }
}

pub(crate) fn collect_warnings<'a, I>(projections: I) -> Vec<OrderWarning>
where
    I: IntoIterator<Item = &'a OrderProjection>,
{
    let mut out = Vec::new();
    for projection in projections {
        for warning in &projection.warnings {
            tracing::warn!(order_id = %projection.order_id, ?warning, "Order data quality");
            out.push(OrderWarning {
                order_id: projection.order_id.clone(),
                warning: warning.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BillingError, Result};
    use crate::models::{OrderPacket, OrderRow, SchemaFeatures};
    use crate::repository::BillingWindow;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    /// Store whose rate query always fails.
    struct RatesDown {
        rows: Vec<OrderRow>,
    }

    #[async_trait]
    impl OrderStore for RatesDown {
        fn features(&self) -> SchemaFeatures {
            SchemaFeatures::full()
        }

        async fn dashboard_rows(&self) -> Result<Vec<OrderRow>> {
            Ok(self.rows.clone())
        }

        async fn billing_rows(&self, _window: &BillingWindow) -> Result<Vec<OrderRow>> {
            Ok(self.rows.clone())
        }

        async fn reimbursement_rates(&self) -> Result<RateTable> {
            Err(BillingError::Database(sqlx::Error::RowNotFound))
        }

        async fn order_packet(&self, _id: &str) -> Result<Option<OrderPacket>> {
            Ok(None)
        }
    }

    fn priced(id: &str, price: rust_decimal::Decimal) -> OrderRow {
        let mut row = OrderRow::new(id, "approved", Utc::now());
        row.frequency_per_week = Some(2);
        row.duration_days = Some(7);
        row.product_price = Some(price);
        row.cpt_code = Some("A6021".to_string());
        row
    }

    #[test]
    fn test_rate_failure_adds_notice() {
        let store = RatesDown { rows: Vec::new() };
        let mut notices = Vec::new();
        let rates = tokio_test::block_on(load_rates(&store, &mut notices));
        assert!(rates.is_empty());
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_dashboard_uses_product_price_without_rates() {
        let store: Arc<dyn OrderStore> = Arc::new(RatesDown {
            rows: vec![priced("1", dec!(4.00)), priced("2", dec!(1.50))],
        });
        let state = AppState::new(store);

        let report = tokio_test::block_on(state.dashboard.build(Utc::now()));
        assert!(!report.data_unavailable);
        assert_eq!(report.projected_remaining_revenue, dec!(11.00));
        assert_eq!(report.notices.len(), 1);
    }

    #[test]
    fn test_missing_packet_is_not_found() {
        let store: Arc<dyn OrderStore> = Arc::new(RatesDown { rows: Vec::new() });
        let state = AppState::new(store);

        let err = tokio_test::block_on(state.packets.packet("77")).unwrap_err();
        assert!(matches!(err, BillingError::NotFound(id) if id == "77"));
    }

    #[test]
    fn test_warnings_are_tagged_with_order() {
        let rates = RateTable::new();
        let calc = crate::revenue::RevenueCalculator::new(&rates, SchemaFeatures::full());
        let mut row = OrderRow::new("9", "approved", Utc::now());
        row.frequency = Some("twice a fortnight".to_string());

        let projection = calc.project(&row);
        let warnings = collect_warnings([&projection]);
        assert!(warnings.iter().all(|w| w.order_id == "9"));
        assert!(warnings
            .iter()
            .any(|w| matches!(&w.warning, DataWarning::UnrecognizedFrequency { text } if text == "twice a fortnight")));
        assert!(warnings.iter().any(|w| w.warning == DataWarning::NoUnitPrice));
    }
}
