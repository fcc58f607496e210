//! PostgreSQL-backed order store.
//!
//! Optional columns are swapped for typed NULLs according to the
//! [`SchemaFeatures`] probed at startup, so one row mapper serves every
//! schema generation.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{BillingWindow, OrderStore};
use crate::error::Result;
use crate::models::{OrderPacket, OrderRow, PacketPatient, PacketPhysician, RateTable, SchemaFeatures};

pub struct PgOrderStore {
    pool: PgPool,
    features: SchemaFeatures,
}

impl PgOrderStore {
    pub fn new(pool: PgPool, features: SchemaFeatures) -> Self {
        Self { pool, features }
    }

    fn select_orders(&self) -> String {
        let f = self.features;

        let shipments = if f.shipments_remaining {
            "o.shipments_remaining::bigint AS shipments_remaining"
        } else {
            "NULL::bigint AS shipments_remaining"
        };
        let product_cols = if f.products {
            "pr.name::text AS product_name, pr.size::text AS product_size, \
             pr.sku::text AS sku, pr.cpt_code::text AS cpt_code"
        } else {
            "NULL::text AS product_name, NULL::text AS product_size, \
             NULL::text AS sku, NULL::text AS cpt_code"
        };
        let dates = if f.fulfillment_dates {
            "o.shipped_at::timestamp AS shipped_at, o.delivered_at::timestamp AS delivered_at, \
             o.expires_at::timestamp AS expires_at"
        } else {
            "NULL::timestamp AS shipped_at, NULL::timestamp AS delivered_at, \
             NULL::timestamp AS expires_at"
        };
        let product_join = if f.products {
            "LEFT JOIN products pr ON pr.id = o.product_id"
        } else {
            ""
        };

        format!(
            "SELECT o.id::text AS id, COALESCE(o.status::text, '') AS status, \
                    o.patient_id::text AS patient_id, o.user_id::text AS user_id, \
                    o.frequency::text AS frequency, o.frequency_per_week::bigint AS frequency_per_week, \
                    o.qty_per_change::bigint AS qty_per_change, o.duration_days::bigint AS duration_days, \
                    o.refills_allowed::bigint AS refills_allowed, {shipments}, \
                    o.product::text AS product, o.product_id::text AS product_id, \
                    o.product_price::numeric AS product_price, {product_cols}, \
                    p.first_name::text AS first_name, p.last_name::text AS last_name, \
                    p.dob::text AS dob, u.practice_name::text AS practice_name, \
                    o.created_at::timestamp AS created_at, o.updated_at::timestamp AS updated_at, {dates} \
             FROM orders o \
             LEFT JOIN patients p ON p.id = o.patient_id \
             LEFT JOIN users u ON u.id = o.user_id \
             {product_join}"
        )
    }
}

fn utc(value: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    value.map(|v| v.and_utc())
}

fn map_order(row: &PgRow) -> std::result::Result<OrderRow, sqlx::Error> {
    let created_at: Option<NaiveDateTime> = row.try_get("created_at")?;

    Ok(OrderRow {
        id: row.try_get("id")?,
        status: row.try_get("status")?,
        patient_id: row.try_get("patient_id")?,
        user_id: row.try_get("user_id")?,
        frequency: row.try_get("frequency")?,
        frequency_per_week: row.try_get("frequency_per_week")?,
        qty_per_change: row.try_get("qty_per_change")?,
        duration_days: row.try_get("duration_days")?,
        refills_allowed: row.try_get("refills_allowed")?,
        shipments_remaining: row.try_get("shipments_remaining")?,
        product: row.try_get("product")?,
        product_id: row.try_get("product_id")?,
        product_price: row.try_get("product_price")?,
        product_name: row.try_get("product_name")?,
        product_size: row.try_get("product_size")?,
        sku: row.try_get("sku")?,
        cpt_code: row.try_get("cpt_code")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        dob: row.try_get("dob")?,
        practice_name: row.try_get("practice_name")?,
        created_at: utc(created_at).unwrap_or(DateTime::<Utc>::default()),
        updated_at: utc(row.try_get("updated_at")?),
        shipped_at: utc(row.try_get("shipped_at")?),
        delivered_at: utc(row.try_get("delivered_at")?),
        expires_at: utc(row.try_get("expires_at")?),
    })
}

fn start_of(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

#[async_trait::async_trait]
impl OrderStore for PgOrderStore {
    fn features(&self) -> SchemaFeatures {
        self.features
    }

    async fn dashboard_rows(&self) -> Result<Vec<OrderRow>> {
        let sql = self.select_orders();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let orders = rows.iter().map(map_order).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    async fn billing_rows(&self, window: &BillingWindow) -> Result<Vec<OrderRow>> {
        let sql = format!(
            "{} WHERE o.created_at >= $1 AND o.created_at < $2 \
               AND LOWER(TRIM(COALESCE(o.status::text, ''))) NOT IN ('rejected', 'cancelled') \
               AND ($3::text IS NULL OR o.user_id::text = $3) \
             ORDER BY o.created_at DESC",
            self.select_orders()
        );

        let until = window
            .to
            .checked_add_days(Days::new(1))
            .map(start_of)
            .unwrap_or(NaiveDateTime::MAX);

        let rows = sqlx::query(&sql)
            .bind(start_of(window.from))
            .bind(until)
            .bind(window.physician.as_deref())
            .fetch_all(&self.pool)
            .await?;

        let orders = rows.iter().map(map_order).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    async fn reimbursement_rates(&self) -> Result<RateTable> {
        if !self.features.reimbursement_rates {
            return Ok(RateTable::new());
        }

        let rows = sqlx::query(
            "SELECT cpt_code::text AS cpt_code, COALESCE(rate_non_rural, 0)::numeric AS rate \
             FROM reimbursement_rates WHERE cpt_code IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut table = RateTable::new();
        for row in rows {
            let code: String = row.try_get("cpt_code")?;
            let rate: Decimal = row.try_get("rate")?;
            table.insert(&code, rate);
        }
        Ok(table)
    }

    async fn order_packet(&self, id: &str) -> Result<Option<OrderPacket>> {
        let row = sqlx::query(
            "SELECT o.id::text AS id, COALESCE(o.status::text, '') AS status, o.product::text AS product, \
                    o.frequency::text AS frequency, o.frequency_per_week::bigint AS frequency_per_week, \
                    o.qty_per_change::bigint AS qty_per_change, o.duration_days::bigint AS duration_days, \
                    o.refills_allowed::bigint AS refills_allowed, o.created_at::timestamp AS created_at, \
                    p.first_name::text AS first_name, p.last_name::text AS last_name, p.dob::text AS dob, \
                    p.address::text AS address, p.city::text AS city, p.state::text AS state, p.zip::text AS zip, \
                    p.insurance_provider::text AS insurance_provider, \
                    p.insurance_member_id::text AS insurance_member_id, \
                    p.insurance_group_id::text AS insurance_group_id, \
                    p.insurance_payer_phone::text AS insurance_payer_phone, \
                    u.first_name::text AS doc_first, u.last_name::text AS doc_last, \
                    u.practice_name::text AS practice_name, u.npi::text AS npi, \
                    u.license::text AS license, u.license_state::text AS license_state \
             FROM orders o \
             LEFT JOIN patients p ON p.id = o.patient_id \
             LEFT JOIN users u ON u.id = o.user_id \
             WHERE o.id::text = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: Option<NaiveDateTime> = row.try_get("created_at")?;

        Ok(Some(OrderPacket {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            product: row.try_get("product")?,
            frequency: row.try_get("frequency")?,
            frequency_per_week: row.try_get("frequency_per_week")?,
            qty_per_change: row.try_get("qty_per_change")?,
            duration_days: row.try_get("duration_days")?,
            refills_allowed: row.try_get("refills_allowed")?,
            created_at: utc(created_at).unwrap_or(DateTime::<Utc>::default()),
            patient: PacketPatient {
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                dob: row.try_get("dob")?,
                address: row.try_get("address")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                zip: row.try_get("zip")?,
                insurance_provider: row.try_get("insurance_provider")?,
                member_id: row.try_get("insurance_member_id")?,
                group_id: row.try_get("insurance_group_id")?,
                payer_phone: row.try_get("insurance_payer_phone")?,
            },
            physician: PacketPhysician {
                first_name: row.try_get("doc_first")?,
                last_name: row.try_get("doc_last")?,
                practice_name: row.try_get("practice_name")?,
                npi: row.try_get("npi")?,
                license: row.try_get("license")?,
                license_state: row.try_get("license_state")?,
            },
        }))
    }
}
