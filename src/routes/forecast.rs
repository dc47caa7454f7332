use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{map_db_error, AppError, AppResult};
use crate::persistence::queries;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GenerateQuery {
    start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TimeOfForecastQuery {
    tof: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct PredictionResponse {
    prediction_time: DateTime<Utc>,
    predicted_power: f64,
    horizon: f64,
}

async fn generate(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let start = query
        .start_date
        .unwrap_or_else(|| crate::time::quantize_to_hour(Utc::now()));
    crate::pipeline::run(start, &state.state_cache, &state.weather, &state.persistence).await;
    Ok(Json(serde_json::json!({ "status": "completed", "start_date": start })))
}

async fn forecast_for_model(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<PredictionResponse>>> {
    if query.end_date < query.start_date {
        return Err(AppError::bad_request("end_date must not precede start_date"));
    }
    let rows = queries::latest_predictions_for_model(&state.db, model_id, query.start_date, query.end_date)
        .await
        .map_err(map_db_error)?;
    Ok(Json(
        rows.into_iter()
            .map(|r| PredictionResponse {
                prediction_time: r.prediction_time,
                predicted_power: r.predicted_power,
                horizon: r.horizon,
            })
            .collect(),
    ))
}

async fn forecast_for_cycle(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
    Query(query): Query<TimeOfForecastQuery>,
) -> AppResult<Json<Vec<PredictionResponse>>> {
    let rows = queries::predictions_for_cycle(&state.db, model_id, query.tof)
        .await
        .map_err(map_db_error)?;
    Ok(Json(
        rows.into_iter()
            .map(|r| PredictionResponse {
                prediction_time: r.prediction_time,
                predicted_power: r.predicted_power,
                horizon: r.horizon,
            })
            .collect(),
    ))
}

async fn forecast_timestamps(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
) -> AppResult<Json<Vec<DateTime<Utc>>>> {
    let cycles = queries::distinct_cycles_for_model(&state.db, model_id)
        .await
        .map_err(map_db_error)?;
    Ok(Json(cycles))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/forecast/time_of_forecast/{model_id}", get(forecast_for_cycle))
        .route("/forecast/{model_id}/timestamps", get(forecast_timestamps))
        .route("/forecast/{model_id}", get(forecast_for_model))
}
