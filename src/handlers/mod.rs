pub mod billing;
pub mod dashboard;
pub mod health;
pub mod packet;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::BillingError;
use crate::services::AppState;

pub struct AppError(BillingError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BillingError::NotFound(_) => StatusCode::NOT_FOUND,
            BillingError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            BillingError::Database(_) | BillingError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Database details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Request failed");
            "query_failed".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<BillingError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/admin/dashboard", get(dashboard::dashboard))
        .route("/admin/billing", get(billing::ledger))
        .route("/admin/orders/:id/packet", get(packet::order_packet))
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
