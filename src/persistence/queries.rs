use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{
    CycleMetricRow, CycleMetricTypeSql, HorizonMetricRow, HorizonMetricTypeSql, MetricType, PowerReadingRow,
    PredictionReadingJoinRow,
};

/// Horizon buckets the metrics engine aggregates over.
pub const HORIZON_BUCKETS: [f64; 6] = [0.25, 1.0, 6.0, 24.0, 48.0, 72.0];

pub async fn insert_readings(
    pool: &PgPool,
    plant_id: i64,
    readings: &[(DateTime<Utc>, f64)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for (timestamp, power_w) in readings {
        sqlx::query(
            "INSERT INTO power_readings (timestamp, plant_id, power_w) VALUES ($1, $2, $3) \
             ON CONFLICT (timestamp, plant_id) DO NOTHING",
        )
        .bind(timestamp)
        .bind(plant_id)
        .bind(power_w)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn readings_in_range(
    pool: &PgPool,
    plant_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PowerReadingRow>, sqlx::Error> {
    sqlx::query_as::<_, PowerReadingRow>(
        "SELECT timestamp, plant_id, power_w FROM power_readings \
         WHERE plant_id = $1 AND timestamp BETWEEN $2 AND $3 ORDER BY timestamp",
    )
    .bind(plant_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LatestPredictionRow {
    pub prediction_time: DateTime<Utc>,
    pub predicted_power: f64,
    pub horizon: f64,
}

/// Latest prediction per `prediction_time` for a model within a range: when
/// more than one cycle produced a prediction for the same timestamp, the
/// most recent cycle wins.
pub async fn latest_predictions_for_model(
    pool: &PgPool,
    model_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<LatestPredictionRow>, sqlx::Error> {
    sqlx::query_as::<_, LatestPredictionRow>(
        r#"
        SELECT DISTINCT ON (prediction_time) prediction_time, predicted_power, horizon
        FROM power_predictions
        WHERE model_id = $1 AND prediction_time BETWEEN $2 AND $3
        ORDER BY prediction_time, created_at DESC
        "#,
    )
    .bind(model_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CyclePredictionRow {
    pub prediction_time: DateTime<Utc>,
    pub predicted_power: f64,
    pub horizon: f64,
}

pub async fn predictions_for_cycle(
    pool: &PgPool,
    model_id: i64,
    time_of_forecast: DateTime<Utc>,
) -> Result<Vec<CyclePredictionRow>, sqlx::Error> {
    sqlx::query_as::<_, CyclePredictionRow>(
        "SELECT prediction_time, predicted_power, horizon FROM power_predictions \
         WHERE model_id = $1 AND created_at = $2 ORDER BY prediction_time",
    )
    .bind(model_id)
    .bind(time_of_forecast)
    .fetch_all(pool)
    .await
}

pub async fn distinct_cycles_for_model(pool: &PgPool, model_id: i64) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
        "SELECT DISTINCT created_at FROM power_predictions WHERE model_id = $1 ORDER BY created_at DESC",
    )
    .bind(model_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

/// Predictions of `model_id` joined to `plant_id`'s readings on equal
/// timestamps, restricted to the standard horizon buckets.
pub async fn predictions_joined_with_readings_by_horizon(
    pool: &PgPool,
    model_id: i64,
    plant_id: i64,
) -> Result<Vec<PredictionReadingJoinRow>, sqlx::Error> {
    sqlx::query_as::<_, PredictionReadingJoinRow>(
        r#"
        SELECT p.prediction_time, p.created_at, p.predicted_power, p.horizon, r.power_w
        FROM power_predictions p
        JOIN power_readings r ON r.timestamp = p.prediction_time AND r.plant_id = $2
        WHERE p.model_id = $1 AND p.horizon = ANY($3)
        "#,
    )
    .bind(model_id)
    .bind(plant_id)
    .bind(&HORIZON_BUCKETS[..])
    .fetch_all(pool)
    .await
}

/// Same join, keyed for per-cycle aggregation: every horizon within a cycle
/// participates, not just the standard buckets.
pub async fn predictions_joined_with_readings_by_cycle(
    pool: &PgPool,
    model_id: i64,
    plant_id: i64,
) -> Result<Vec<PredictionReadingJoinRow>, sqlx::Error> {
    sqlx::query_as::<_, PredictionReadingJoinRow>(
        r#"
        SELECT p.prediction_time, p.created_at, p.predicted_power, p.horizon, r.power_w
        FROM power_predictions p
        JOIN power_readings r ON r.timestamp = p.prediction_time AND r.plant_id = $2
        WHERE p.model_id = $1
        "#,
    )
    .bind(model_id)
    .bind(plant_id)
    .fetch_all(pool)
    .await
}

pub async fn upsert_horizon_metrics(pool: &PgPool, rows: &[HorizonMetricRow]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            "INSERT INTO horizon_metrics (model_id, metric_type, horizon, value) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (model_id, metric_type, horizon) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(row.model_id)
        .bind(HorizonMetricTypeSql::from(row.metric_type))
        .bind(row.horizon)
        .bind(row.value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn upsert_cycle_metrics(pool: &PgPool, rows: &[CycleMetricRow]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            "INSERT INTO cycle_metrics (time_of_forecast, model_id, metric_type, value) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (time_of_forecast, model_id, metric_type) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(row.time_of_forecast)
        .bind(row.model_id)
        .bind(CycleMetricTypeSql::from(row.metric_type))
        .bind(row.value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn horizon_metrics_for_model(pool: &PgPool, model_id: i64) -> Result<Vec<HorizonMetricRow>, sqlx::Error> {
    sqlx::query_as::<_, HorizonMetricRow>(
        "SELECT model_id, metric_type, horizon, value FROM horizon_metrics WHERE model_id = $1 ORDER BY horizon, metric_type",
    )
    .bind(model_id)
    .fetch_all(pool)
    .await
}

pub async fn cycle_metrics_for_model(
    pool: &PgPool,
    model_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CycleMetricRow>, sqlx::Error> {
    sqlx::query_as::<_, CycleMetricRow>(
        "SELECT time_of_forecast, model_id, metric_type, value FROM cycle_metrics \
         WHERE model_id = $1 AND time_of_forecast BETWEEN $2 AND $3 ORDER BY time_of_forecast",
    )
    .bind(model_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

