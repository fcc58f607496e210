use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::{collect_warnings, load_rates, OrderWarning};
use crate::format::format_usd;
use crate::models::{OrderRow, OrderStatus};
use crate::repository::OrderStore;
use crate::revenue::{top_breakdown, BreakdownEntry, OrderProjection, RevenueCalculator, RevenueTotals};

const BREAKDOWN_LIMIT: usize = 5;
const RECENT_LIMIT: usize = 8;
const REMINDER_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentActivity {
    pub order_id: String,
    pub patient_name: String,
    pub product: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reminders {
    pub pending_approvals: usize,
    pub expiring_orders: usize,
    pub delayed_shipments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub total_orders: usize,
    pub pending_approvals: usize,
    pub active_patients: usize,
    pub projected_remaining_revenue: Decimal,
    pub projected_remaining_revenue_display: String,
    pub total_authorized_revenue: Decimal,
    pub total_authorized_revenue_display: String,
    pub revenue_by_practice: Vec<BreakdownEntry>,
    pub revenue_by_product: Vec<BreakdownEntry>,
    pub recent_activity: Vec<RecentActivity>,
    pub reminders: Reminders,
    /// Set when orders could not be read; every figure above is then zero.
    pub data_unavailable: bool,
    pub notices: Vec<String>,
    pub warnings: Vec<OrderWarning>,
}

impl DashboardReport {
    fn unavailable(now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now,
            total_orders: 0,
            pending_approvals: 0,
            active_patients: 0,
            projected_remaining_revenue: Decimal::ZERO,
            projected_remaining_revenue_display: format_usd(Decimal::ZERO),
            total_authorized_revenue: Decimal::ZERO,
            total_authorized_revenue_display: format_usd(Decimal::ZERO),
            revenue_by_practice: Vec::new(),
            revenue_by_product: Vec::new(),
            recent_activity: Vec::new(),
            reminders: Reminders::default(),
            data_unavailable: true,
            notices: vec!["Order data is unavailable; figures are not current".to_string()],
            warnings: Vec::new(),
        }
    }
}

pub struct DashboardService {
    store: Arc<dyn OrderStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn build(&self, now: DateTime<Utc>) -> DashboardReport {
        let rows = match self.store.dashboard_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load dashboard orders");
                return DashboardReport::unavailable(now);
            }
        };

        let mut notices = Vec::new();
        let rates = load_rates(self.store.as_ref(), &mut notices).await;
        let calculator = RevenueCalculator::new(&rates, self.store.features());

        let projections: Vec<OrderProjection> = rows.iter().map(|row| calculator.project(row)).collect();
        let totals: RevenueTotals = projections.iter().collect();

        let revenue_by_practice = top_breakdown(
            rows.iter().map(|row| row.practice_name.as_deref()).zip(&projections),
            BREAKDOWN_LIMIT,
        );
        let product_labels: Vec<String> = rows.iter().map(|row| row.product_label()).collect();
        let revenue_by_product = top_breakdown(
            product_labels.iter().map(|label| Some(label.as_str())).zip(&projections),
            BREAKDOWN_LIMIT,
        );

        let statuses: Vec<OrderStatus> = rows.iter().map(|row| row.order_status()).collect();
        let pending_approvals = statuses.iter().filter(|s| s.awaiting_approval()).count();
        let active_patients = rows
            .iter()
            .zip(&statuses)
            .filter(|(_, status)| status.active())
            .filter_map(|(row, _)| row.patient_id.as_deref())
            .collect::<HashSet<_>>()
            .len();

        let reminders = Reminders {
            pending_approvals,
            expiring_orders: count_expiring(&rows, now),
            delayed_shipments: count_delayed(&rows, now),
        };

        tracing::info!(
            orders = rows.len(),
            billable = totals.orders_counted,
            projected = %totals.projected_remaining_revenue,
            "Dashboard built"
        );

        DashboardReport {
            generated_at: now,
            total_orders: rows.len(),
            pending_approvals,
            active_patients,
            projected_remaining_revenue_display: format_usd(totals.projected_remaining_revenue),
            projected_remaining_revenue: totals.projected_remaining_revenue,
            total_authorized_revenue_display: format_usd(totals.total_authorized_revenue),
            total_authorized_revenue: totals.total_authorized_revenue,
            revenue_by_practice,
            revenue_by_product,
            recent_activity: recent_activity(&rows),
            reminders,
            data_unavailable: false,
            notices,
            warnings: collect_warnings(&projections),
        }
    }
}

fn recent_activity(rows: &[OrderRow]) -> Vec<RecentActivity> {
    let mut recent: Vec<&OrderRow> = rows.iter().collect();
    recent.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    recent
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|row| RecentActivity {
            order_id: row.id.clone(),
            patient_name: row.patient_name(),
            product: row.product.clone().unwrap_or_default(),
            status: row.status.clone(),
            updated_at: row.last_activity(),
        })
        .collect()
}

/// Approved or in-transit orders whose authorisation lapses within a week.
fn count_expiring(rows: &[OrderRow], now: DateTime<Utc>) -> usize {
    let horizon = now + Duration::days(REMINDER_DAYS);
    rows.iter()
        .filter(|row| matches!(row.order_status(), OrderStatus::Approved | OrderStatus::InTransit))
        .filter(|row| row.expires_at.map_or(false, |at| at < horizon))
        .count()
}

/// In-transit orders shipped over a week ago and still not delivered.
fn count_delayed(rows: &[OrderRow], now: DateTime<Utc>) -> usize {
    let cutoff = now - Duration::days(REMINDER_DAYS);
    rows.iter()
        .filter(|row| row.order_status() == OrderStatus::InTransit)
        .filter(|row| row.delivered_at.is_none())
        .filter(|row| row.shipped_at.map_or(false, |at| at < cutoff))
        .count()
}
