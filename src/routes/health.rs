use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    message: &'static str,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "ok",
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(healthz))
}
