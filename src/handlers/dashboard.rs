use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::services::{AppState, DashboardReport};

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardReport> {
    Json(state.dashboard.build(Utc::now()).await)
}
