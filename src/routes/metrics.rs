use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::persistence::queries;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CycleRangeQuery {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct HorizonMetricResponse {
    metric_type: String,
    horizon: f64,
    value: f64,
}

#[derive(Debug, Serialize)]
struct CycleMetricResponse {
    time_of_forecast: DateTime<Utc>,
    metric_type: String,
    value: f64,
}

async fn horizon_metrics(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
) -> AppResult<Json<Vec<HorizonMetricResponse>>> {
    let rows = queries::horizon_metrics_for_model(&state.db, model_id)
        .await
        .map_err(crate::error::map_db_error)?;
    Ok(Json(
        rows.into_iter()
            .map(|r| HorizonMetricResponse {
                metric_type: r.metric_type.to_string(),
                horizon: r.horizon,
                value: r.value,
            })
            .collect(),
    ))
}

async fn cycle_metrics(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
    Query(query): Query<CycleRangeQuery>,
) -> AppResult<Json<Vec<CycleMetricResponse>>> {
    let rows = queries::cycle_metrics_for_model(&state.db, model_id, query.start_date, query.end_date)
        .await
        .map_err(crate::error::map_db_error)?;
    Ok(Json(
        rows.into_iter()
            .map(|r| CycleMetricResponse {
                time_of_forecast: r.time_of_forecast,
                metric_type: r.metric_type.to_string(),
                value: r.value,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
struct RecomputeResponse {
    horizon_metrics: usize,
    cycle_metrics: usize,
}

async fn recompute(
    State(state): State<AppState>,
    Path(model_id): Path<i64>,
) -> AppResult<Json<RecomputeResponse>> {
    let horizon = crate::metrics::calculate_horizon_metrics(&state.db, &state.model_manager, model_id)
        .await?;
    let cycle = crate::metrics::calculate_cycle_metrics(&state.db, &state.model_manager, model_id)
        .await?;
    Ok(Json(RecomputeResponse {
        horizon_metrics: horizon.len(),
        cycle_metrics: cycle.len(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metric/horizon/{model_id}", get(horizon_metrics))
        .route("/metric/cycle/{model_id}", get(cycle_metrics))
        .route("/metric/calculate/{model_id}", post(recompute))
}
