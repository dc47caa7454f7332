pub mod forecast;
pub mod health;
pub mod metrics;
pub mod playground;
pub mod readings;
pub mod status;

use axum::extract::multipart::Field;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Reads a multipart field into memory in chunks, rejecting the request as
/// soon as the running total crosses `max_bytes` instead of after the whole
/// field has been buffered.
pub(crate) async fn read_field_capped(mut field: Field<'_>, max_bytes: u64) -> Result<Vec<u8>, AppError> {
    let mut body = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| AppError::bad_request(format!("could not read upload: {err}")))?
    {
        if body.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(AppError::bad_request(format!("upload exceeds {max_bytes} bytes")));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(forecast::router())
        .merge(readings::router())
        .merge(metrics::router())
        .merge(playground::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    static STATE: OnceLock<AppState> = OnceLock::new();

    fn state() -> AppState {
        STATE.get_or_init(crate::test_support::test_state).clone()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = router(state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_zero_plants_before_any_refresh() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/internal/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["power_plants"], 0);
        assert_eq!(json["models"], 0);
    }

    #[tokio::test]
    async fn forecast_range_rejects_end_before_start() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/forecast/1?start_date=2024-06-02T00:00:00Z&end_date=2024-06-01T00:00:00Z")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
