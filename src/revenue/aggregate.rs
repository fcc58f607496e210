use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::calculator::OrderProjection;
use crate::format::format_usd;

/// Label for rows without a practice/product.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueTotals {
    pub orders_counted: usize,
    pub projected_remaining_revenue: Decimal,
    pub total_authorized_revenue: Decimal,
}

impl RevenueTotals {
    pub fn add(&mut self, projection: &OrderProjection) {
        if !projection.billable {
            return;
        }
        self.orders_counted += 1;
        self.projected_remaining_revenue += projection.projected_remaining_revenue;
        self.total_authorized_revenue += projection.total_authorized_revenue;
    }
}

impl<'a> FromIterator<&'a OrderProjection> for RevenueTotals {
    fn from_iter<I: IntoIterator<Item = &'a OrderProjection>>(iter: I) -> Self {
        let mut totals = RevenueTotals::default();
        for projection in iter {
            totals.add(projection);
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub orders: usize,
    pub revenue: Decimal,
    pub revenue_display: String,
}

/// Group projected remaining revenue by label, largest first.
///
/// Ties are ordered by label so the output is stable. Zero-revenue groups
/// are dropped.
pub fn top_breakdown<'a, I>(items: I, limit: usize) -> Vec<BreakdownEntry>
where
    I: IntoIterator<Item = (Option<&'a str>, &'a OrderProjection)>,
{
    let mut groups: HashMap<String, (usize, Decimal)> = HashMap::new();

    for (label, projection) in items {
        if !projection.billable || projection.projected_remaining_revenue <= Decimal::ZERO {
            continue;
        }
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| UNASSIGNED.to_string());
        let entry = groups.entry(label).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += projection.projected_remaining_revenue;
    }

    let mut entries: Vec<BreakdownEntry> = groups
        .into_iter()
        .map(|(label, (orders, revenue))| BreakdownEntry {
            label,
            orders,
            revenue,
            revenue_display: format_usd(revenue),
        })
        .collect();

    entries.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.label.cmp(&b.label)));
    entries.truncate(limit);
    entries
}
