use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::routes::read_field_capped;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct FeatureInfoResponse {
    model_id: i64,
    features: Vec<String>,
}

async fn model_features(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
) -> AppResult<Json<FeatureInfoResponse>> {
    let metadata = state
        .model_manager
        .fetch_model(model_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("model {model_id} not found")))?;
    Ok(Json(FeatureInfoResponse {
        model_id,
        features: metadata.features,
    }))
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    timestamps: Vec<DateTime<Utc>>,
    predicted_power: Vec<f64>,
    mae: Option<f64>,
    rmse: Option<f64>,
    mbe: Option<f64>,
}

async fn predict(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<PredictResponse>> {
    let mut body = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        body = read_field_capped(field, state.config.max_upload_bytes).await?;
        break;
    }

    let result = crate::playground::predict(
        &state.db,
        &state.model_manager,
        model_id,
        &body,
        state.config.max_upload_bytes,
    )
    .await?;
    let (mae, rmse, mbe) = match result.metrics {
        Some((mae, rmse, mbe)) => (Some(mae), Some(rmse), Some(mbe)),
        None => (None, None, None),
    };
    Ok(Json(PredictResponse {
        timestamps: result.timestamps,
        predicted_power: result.predicted_power,
        mae,
        rmse,
        mbe,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/playground/model/{model_id}/features", get(model_features))
        .route("/playground/predict/{model_id}", post(predict))
}
