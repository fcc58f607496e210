#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use collagen_billing::models::{OrderPacket, OrderRow, PacketPatient, PacketPhysician, RateTable, SchemaFeatures};
use collagen_billing::repository::{BillingWindow, OrderStore};
use collagen_billing::{BillingError, Result};

/// In-memory order store with switchable failures.
pub struct MemoryStore {
    pub features: SchemaFeatures,
    pub orders: Mutex<Vec<OrderRow>>,
    pub rates: Mutex<RateTable>,
    pub fail_orders: AtomicBool,
    pub fail_rates: AtomicBool,
}

impl MemoryStore {
    pub fn new(features: SchemaFeatures) -> Self {
        Self {
            features,
            orders: Mutex::new(Vec::new()),
            rates: Mutex::new(RateTable::new()),
            fail_orders: AtomicBool::new(false),
            fail_rates: AtomicBool::new(false),
        }
    }

    pub fn with_orders(features: SchemaFeatures, orders: Vec<OrderRow>) -> Self {
        let store = Self::new(features);
        *store.orders.lock().unwrap() = orders;
        store
    }

    pub fn set_rate(&self, code: &str, rate: Decimal) {
        self.rates.lock().unwrap().insert(code, rate);
    }
}

fn unavailable() -> BillingError {
    BillingError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl OrderStore for MemoryStore {
    fn features(&self) -> SchemaFeatures {
        self.features
    }

    async fn dashboard_rows(&self) -> Result<Vec<OrderRow>> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn billing_rows(&self, window: &BillingWindow) -> Result<Vec<OrderRow>> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut rows: Vec<OrderRow> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                let day = r.created_at.date_naive();
                day >= window.from && day <= window.to
            })
            .filter(|r| !r.order_status().excluded_from_revenue())
            .filter(|r| match &window.physician {
                Some(p) => r.user_id.as_deref() == Some(p.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn reimbursement_rates(&self) -> Result<RateTable> {
        if self.fail_rates.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if !self.features.reimbursement_rates {
            return Ok(RateTable::new());
        }
        Ok(self.rates.lock().unwrap().clone())
    }

    async fn order_packet(&self, id: &str) -> Result<Option<OrderPacket>> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().find(|o| o.id == id).map(|o| OrderPacket {
            id: o.id.clone(),
            status: o.status.clone(),
            product: o.product.clone(),
            frequency: o.frequency.clone(),
            frequency_per_week: o.frequency_per_week,
            qty_per_change: o.qty_per_change,
            duration_days: o.duration_days,
            refills_allowed: o.refills_allowed,
            created_at: o.created_at,
            patient: PacketPatient {
                first_name: o.first_name.clone(),
                last_name: o.last_name.clone(),
                dob: o.dob.clone(),
                ..PacketPatient::default()
            },
            physician: PacketPhysician {
                practice_name: o.practice_name.clone(),
                ..PacketPhysician::default()
            },
        }))
    }
}

pub fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

/// Order with the prescription fields the calculator reads.
pub fn order(
    id: &str,
    status: &str,
    fpw: i64,
    qty: i64,
    days: i64,
    refills: i64,
    shipments_remaining: Option<i64>,
    price: Option<Decimal>,
) -> OrderRow {
    let mut row = OrderRow::new(id, status, Utc::now());
    row.frequency_per_week = Some(fpw);
    row.qty_per_change = Some(qty);
    row.duration_days = Some(days);
    row.refills_allowed = Some(refills);
    row.shipments_remaining = shipments_remaining;
    row.product_price = price;
    row
}
