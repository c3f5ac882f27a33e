pub mod auth;
pub mod business_profile;
pub mod clients;
pub mod health;
pub mod invoices;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub use health::{health_check, metrics_endpoint, readiness_check};

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found"
        })),
    )
}
