use sqlx::PgPool;

use crate::error::Result;
use crate::models::SchemaFeatures;

async fn has_table(pool: &PgPool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = $1
         )",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

async fn has_column(pool: &PgPool, table: &str, column: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
         )",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Check which optional tables/columns exist. Run once at startup.
pub async fn probe_schema(pool: &PgPool) -> Result<SchemaFeatures> {
    let products = has_table(pool, "products").await?;
    let reimbursement_rates = has_table(pool, "reimbursement_rates").await?;
    let shipments_remaining = has_column(pool, "orders", "shipments_remaining").await?;

    let mut fulfillment_dates = true;
    for column in ["shipped_at", "delivered_at", "expires_at"] {
        fulfillment_dates &= has_column(pool, "orders", column).await?;
    }

    let features = SchemaFeatures {
        products,
        reimbursement_rates,
        shipments_remaining,
        fulfillment_dates,
    };

    if features != SchemaFeatures::full() {
        tracing::warn!(?features, "Database schema is missing optional tables or columns; run migrations");
    }

    Ok(features)
}
