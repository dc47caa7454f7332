use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::models::{ForecastRow, PredictionRow};

enum WriteJob {
    Forecasts(Vec<ForecastRow>),
    Predictions(Vec<PredictionRow>),
}

/// Fire-and-forget persistence: the pipeline enqueues a batch and moves on;
/// a single dedicated task drains the queue and executes the writes. Bounded
/// so a stalled database backs pressure onto the pipeline instead of
/// growing an unbounded task queue.
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::Sender<WriteJob>,
}

impl PersistenceHandle {
    /// Spawns the writer task and returns its handle alongside the sender.
    /// The writer task exits once every `PersistenceHandle` clone (and thus
    /// every sender) has been dropped and the channel drains; callers that
    /// need a clean shutdown must await the returned `JoinHandle` only after
    /// dropping all clones, or it will hang waiting on a live sender.
    pub fn spawn(pool: PgPool, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_writer(pool, rx));
        (Self { tx }, handle)
    }

    pub async fn enqueue_forecasts(&self, rows: Vec<ForecastRow>) {
        if rows.is_empty() {
            return;
        }
        if self.tx.send(WriteJob::Forecasts(rows)).await.is_err() {
            tracing::error!("persistence writer channel closed, dropping forecast batch");
        }
    }

    pub async fn enqueue_predictions(&self, rows: Vec<PredictionRow>) {
        if rows.is_empty() {
            return;
        }
        if self.tx.send(WriteJob::Predictions(rows)).await.is_err() {
            tracing::error!("persistence writer channel closed, dropping prediction batch");
        }
    }
}

async fn run_writer(pool: PgPool, mut rx: mpsc::Receiver<WriteJob>) {
    while let Some(job) = rx.recv().await {
        let result = match job {
            WriteJob::Forecasts(rows) => write_forecasts(&pool, &rows).await,
            WriteJob::Predictions(rows) => write_predictions(&pool, &rows).await,
        };
        if let Err(err) = result {
            tracing::error!(error = %err, "persistence batch write failed");
        }
    }
    tracing::info!("persistence writer drained, shutting down");
}

async fn write_forecasts(pool: &PgPool, rows: &[ForecastRow]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO weather_forecasts (
                forecast_time, plant_id, created_at, latitude, longitude, elevation,
                temperature_2m, relative_humidity_2m, cloud_cover_low, cloud_cover_mid, cloud_cover,
                wind_speed_10m, wind_direction_10m, shortwave_radiation, diffuse_radiation, direct_normal_irradiance,
                shortwave_radiation_instant, diffuse_radiation_instant, direct_radiation_instant,
                et0_fao_evapotranspiration, vapour_pressure_deficit, is_day, sunshine_duration
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)
            ON CONFLICT (forecast_time, plant_id, created_at) DO NOTHING
            "#,
        )
        .bind(row.forecast_time)
        .bind(row.plant_id)
        .bind(row.created_at)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.elevation)
        .bind(row.point.temperature_2m)
        .bind(row.point.relative_humidity_2m)
        .bind(row.point.cloud_cover_low)
        .bind(row.point.cloud_cover_mid)
        .bind(row.point.cloud_cover)
        .bind(row.point.wind_speed_10m)
        .bind(row.point.wind_direction_10m)
        .bind(row.point.shortwave_radiation)
        .bind(row.point.diffuse_radiation)
        .bind(row.point.direct_normal_irradiance)
        .bind(row.point.shortwave_radiation_instant)
        .bind(row.point.diffuse_radiation_instant)
        .bind(row.point.direct_radiation_instant)
        .bind(row.point.et0_fao_evapotranspiration)
        .bind(row.point.vapour_pressure_deficit)
        .bind(row.point.is_day)
        .bind(row.point.sunshine_duration)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    tracing::debug!(count = rows.len(), "wrote weather forecast batch");
    Ok(())
}

async fn write_predictions(pool: &PgPool, rows: &[PredictionRow]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO power_predictions (prediction_time, model_id, created_at, predicted_power, horizon)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (prediction_time, model_id, created_at) DO NOTHING
            "#,
        )
        .bind(row.prediction_time)
        .bind(row.model_id)
        .bind(row.created_at)
        .bind(row.predicted_power)
        .bind(row.horizon)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    tracing::debug!(count = rows.len(), "wrote power prediction batch");
    Ok(())
}
