use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BillingError, Result};
use crate::models::{OrderPacket, PacketPatient, PacketPhysician};
use crate::repository::OrderStore;
use crate::revenue::{unit_schedule, DataWarning, PrescriptionTerms};

/// Compliance figures printed on the order packet.
///
/// `total_authorized_units` covers every fill and is not capped by
/// shipments already made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPacketReport {
    pub order_id: String,
    pub status: String,
    pub product: Option<String>,
    pub created_at: DateTime<Utc>,
    pub patient: PacketPatient,
    pub physician: PacketPhysician,
    pub frequency_per_week: u32,
    pub frequency_display: String,
    pub qty_per_change: u32,
    pub duration_days: i64,
    pub refills_allowed: i64,
    pub weeks_authorized: u64,
    pub weeks_authorized_all: u64,
    pub total_authorized_units: u64,
    pub warnings: Vec<DataWarning>,
}

impl OrderPacketReport {
    pub fn from_packet(packet: OrderPacket) -> Self {
        let terms = PrescriptionTerms {
            frequency_per_week: packet.frequency_per_week,
            frequency: packet.frequency.clone(),
            qty_per_change: packet.qty_per_change,
            duration_days: packet.duration_days,
            refills_allowed: packet.refills_allowed,
            shipments_remaining: None,
        };
        let mut warnings = Vec::new();
        let schedule = unit_schedule(&terms, false, &mut warnings);

        Self {
            order_id: packet.id,
            status: packet.status,
            product: packet.product,
            created_at: packet.created_at,
            patient: packet.patient,
            physician: packet.physician,
            frequency_per_week: schedule.frequency_per_week,
            frequency_display: format!("{} × /week", schedule.frequency_per_week),
            qty_per_change: schedule.qty_per_change,
            duration_days: packet.duration_days.unwrap_or(0).max(0),
            refills_allowed: packet.refills_allowed.unwrap_or(0).max(0),
            weeks_authorized: schedule.weeks_authorized,
            weeks_authorized_all: schedule.weeks_authorized_all,
            total_authorized_units: schedule.total_authorized_units,
            warnings,
        }
    }
}

pub struct PacketService {
    store: Arc<dyn OrderStore>,
}

impl PacketService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn packet(&self, order_id: &str) -> Result<OrderPacketReport> {
        let packet = self
            .store
            .order_packet(order_id)
            .await
            .map_err(|e| {
                tracing::error!(order_id, error = %e, "Order packet query failed");
                e
            })?
            .ok_or_else(|| BillingError::NotFound(order_id.to_string()))?;

        Ok(OrderPacketReport::from_packet(packet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(fpw: Option<i64>, freq: Option<&str>, qty: Option<i64>, days: Option<i64>, refills: Option<i64>) -> OrderPacket {
        OrderPacket {
            id: "55".to_string(),
            status: "approved".to_string(),
            product: Some("Collagen Matrix 2×2".to_string()),
            frequency: freq.map(str::to_string),
            frequency_per_week: fpw,
            qty_per_change: qty,
            duration_days: days,
            refills_allowed: refills,
            created_at: Utc::now(),
            patient: PacketPatient::default(),
            physician: PacketPhysician::default(),
        }
    }

    #[test]
    fn test_total_authorized_units_across_refills() {
        let report = OrderPacketReport::from_packet(packet(Some(3), None, Some(1), Some(14), Some(1)));
        assert_eq!(report.weeks_authorized, 2);
        assert_eq!(report.weeks_authorized_all, 4);
        assert_eq!(report.total_authorized_units, 12);
        assert_eq!(report.frequency_display, "3 × /week");
    }

    #[test]
    fn test_legacy_frequency_and_defaults() {
        let report = OrderPacketReport::from_packet(packet(None, Some("Daily"), Some(2), None, None));
        assert_eq!(report.frequency_per_week, 7);
        assert_eq!(report.weeks_authorized, 4);
        assert_eq!(report.total_authorized_units, 4 * 7 * 2);
        assert_eq!(report.duration_days, 0);
        assert_eq!(report.refills_allowed, 0);
    }
}
