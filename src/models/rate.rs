use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payer reimbursement rates keyed by CPT/HCPCS code (`rate_non_rural`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<String, Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &str, rate: Decimal) {
        self.rates.insert(code.trim().to_string(), rate);
    }

    /// A usable rate for `code`: present and strictly positive.
    pub fn rate_for(&self, code: &str) -> Option<Decimal> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.rates.get(code).copied().filter(|r| *r > Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        let mut table = RateTable::new();
        for (code, rate) in iter {
            table.insert(&code, rate);
        }
        table
    }
}

/// Which optional tables/columns the connected database has.
///
/// Probed once at startup and passed down explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFeatures {
    pub products: bool,
    pub reimbursement_rates: bool,
    pub shipments_remaining: bool,
    /// `orders.shipped_at`, `delivered_at` and `expires_at`.
    pub fulfillment_dates: bool,
}

impl SchemaFeatures {
    /// Everything present, which is what the migrations guarantee.
    pub fn full() -> Self {
        Self {
            products: true,
            reimbursement_rates: true,
            shipments_remaining: true,
            fulfillment_dates: true,
        }
    }
}

impl Default for SchemaFeatures {
    fn default() -> Self {
        Self::full()
    }
}
