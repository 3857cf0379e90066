use axum::{response::IntoResponse, Json};
use crate::api::dtos::responses::{ApiResponse, HealthStatus};

pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthStatus { status: "ok" }))
}
