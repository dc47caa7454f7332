use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{map_db_error, AppError, AppResult};
use crate::persistence::queries;
use crate::routes::read_field_capped;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ReadingResponse {
    timestamp: DateTime<Utc>,
    power_w: f64,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    success: bool,
    rows_inserted: usize,
    errors: Vec<String>,
}

async fn readings_in_range(
    State(state): State<AppState>,
    Path(plant_id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<ReadingResponse>>> {
    if query.end_date < query.start_date {
        return Err(AppError::bad_request("end_date must not precede start_date"));
    }
    let rows = queries::readings_in_range(&state.db, plant_id, query.start_date, query.end_date)
        .await
        .map_err(map_db_error)?;
    Ok(Json(
        rows.into_iter()
            .map(|r| ReadingResponse {
                timestamp: r.timestamp,
                power_w: r.power_w,
            })
            .collect(),
    ))
}

async fn upload_readings(
    State(state): State<AppState>,
    Path(plant_id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<IngestResponse>> {
    let mut body = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        body = read_field_capped(field, state.config.max_upload_bytes).await?;
        break;
    }

    let result = crate::readings::ingest(&state.db, &state.model_manager, plant_id, &body).await;
    Ok(Json(IngestResponse {
        success: result.success,
        rows_inserted: result.rows_inserted,
        errors: result.errors,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reading/{id}", get(readings_in_range).post(upload_readings))
}
