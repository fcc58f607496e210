use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use super::AppError;
use crate::services::{AppState, BillingFilter, BillingLedger, BillingParams};

pub async fn ledger(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BillingParams>,
) -> Result<Json<BillingLedger>, AppError> {
    let filter = BillingFilter::parse(&params, Utc::now().date_naive())?;
    Ok(Json(state.billing.ledger(filter).await))
}
