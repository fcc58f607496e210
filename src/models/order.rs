use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status as stored in `orders.status`.
///
/// The column is free text, so anything we don't know about is kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Submitted,
    AwaitingApproval,
    Approved,
    Rejected,
    Cancelled,
    InTransit,
    Delivered,
    Other(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "submitted" => OrderStatus::Submitted,
            "awaiting_approval" => OrderStatus::AwaitingApproval,
            "approved" => OrderStatus::Approved,
            "rejected" => OrderStatus::Rejected,
            "cancelled" => OrderStatus::Cancelled,
            "in_transit" => OrderStatus::InTransit,
            "delivered" => OrderStatus::Delivered,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    /// Rejected and cancelled orders never produce revenue.
    pub fn excluded_from_revenue(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Cancelled)
    }

    pub fn awaiting_approval(&self) -> bool {
        matches!(
            self,
            OrderStatus::Submitted | OrderStatus::Pending | OrderStatus::AwaitingApproval
        )
    }

    /// Statuses that count a patient as active.
    pub fn active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Approved | OrderStatus::InTransit | OrderStatus::Delivered
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Submitted => "submitted",
            OrderStatus::AwaitingApproval => "awaiting_approval",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order joined with its product, patient and ordering physician.
///
/// Numeric prescription fields are kept exactly as read (nullable and
/// signed); coercion to sane values happens in the revenue calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: String,
    pub status: String,
    pub patient_id: Option<String>,
    pub user_id: Option<String>,

    // prescription
    pub frequency: Option<String>,
    pub frequency_per_week: Option<i64>,
    pub qty_per_change: Option<i64>,
    pub duration_days: Option<i64>,
    pub refills_allowed: Option<i64>,
    pub shipments_remaining: Option<i64>,

    // product
    pub product: Option<String>,
    pub product_id: Option<String>,
    pub product_price: Option<Decimal>,
    pub product_name: Option<String>,
    pub product_size: Option<String>,
    pub sku: Option<String>,
    pub cpt_code: Option<String>,

    // patient / physician
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub practice_name: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    /// Minimal row used as a starting point when building fixtures.
    pub fn new(id: &str, status: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            status: status.to_string(),
            patient_id: None,
            user_id: None,
            frequency: None,
            frequency_per_week: None,
            qty_per_change: None,
            duration_days: None,
            refills_allowed: None,
            shipments_remaining: None,
            product: None,
            product_id: None,
            product_price: None,
            product_name: None,
            product_size: None,
            sku: None,
            cpt_code: None,
            first_name: None,
            last_name: None,
            dob: None,
            practice_name: None,
            created_at,
            updated_at: None,
            shipped_at: None,
            delivered_at: None,
            expires_at: None,
        }
    }

    pub fn order_status(&self) -> OrderStatus {
        OrderStatus::parse(&self.status)
    }

    pub fn patient_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }

    /// Catalog name plus size when the product join is available, else
    /// the free-text product stored on the order.
    pub fn product_label(&self) -> String {
        match self.product_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => match self.product_size.as_deref().filter(|s| !s.trim().is_empty()) {
                Some(size) => format!("{} {}", name, size),
                None => name.to_string(),
            },
            None => self.product.clone().unwrap_or_default(),
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(OrderStatus::parse(" Rejected "), OrderStatus::Rejected);
        assert_eq!(OrderStatus::parse("CANCELLED"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::parse("in_transit"), OrderStatus::InTransit);
        assert_eq!(
            OrderStatus::parse("on_hold"),
            OrderStatus::Other("on_hold".to_string())
        );
    }

    #[test]
    fn test_only_rejected_and_cancelled_are_excluded() {
        assert!(OrderStatus::Rejected.excluded_from_revenue());
        assert!(OrderStatus::Cancelled.excluded_from_revenue());
        assert!(!OrderStatus::Pending.excluded_from_revenue());
        assert!(!OrderStatus::Delivered.excluded_from_revenue());
        assert!(!OrderStatus::Other("on_hold".into()).excluded_from_revenue());
    }

    #[test]
    fn test_product_label_prefers_catalog_name() {
        let mut row = OrderRow::new("1", "approved", Utc::now());
        row.product = Some("Collagen sheet".into());
        assert_eq!(row.product_label(), "Collagen sheet");

        row.product_name = Some("CollaHeal".into());
        assert_eq!(row.product_label(), "CollaHeal");

        row.product_size = Some("2x2".into());
        assert_eq!(row.product_label(), "CollaHeal 2x2");
    }

    #[test]
    fn test_patient_name_trims_missing_parts() {
        let mut row = OrderRow::new("1", "approved", Utc::now());
        assert_eq!(row.patient_name(), "");
        row.last_name = Some("Doe".into());
        assert_eq!(row.patient_name(), "Doe");
        row.first_name = Some("Jane".into());
        assert_eq!(row.patient_name(), "Jane Doe");
    }
}
