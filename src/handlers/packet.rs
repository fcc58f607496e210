use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::AppError;
use crate::services::{AppState, OrderPacketReport};

pub async fn order_packet(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderPacketReport>, AppError> {
    let report = state.packets.packet(order_id.trim()).await?;
    Ok(Json(report))
}
