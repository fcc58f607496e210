pub mod order_repo;
pub mod schema;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{OrderPacket, OrderRow, RateTable, SchemaFeatures};

pub use order_repo::PgOrderStore;
pub use schema::probe_schema;

/// Date range and physician the ledger query narrows by.
///
/// `to` is inclusive of the whole day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub physician: Option<String>,
}

/// Read access to orders and rates.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Schema the store was opened against.
    fn features(&self) -> SchemaFeatures;

    /// Every order, any status.
    async fn dashboard_rows(&self) -> Result<Vec<OrderRow>>;

    /// Orders created inside the window, excluding rejected/cancelled,
    /// newest first.
    async fn billing_rows(&self, window: &BillingWindow) -> Result<Vec<OrderRow>>;

    async fn reimbursement_rates(&self) -> Result<RateTable>;

    async fn order_packet(&self, id: &str) -> Result<Option<OrderPacket>>;
}
