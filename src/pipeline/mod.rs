use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};

use crate::cache::StateCache;
use crate::features::{self, PlantContext};
use crate::model_manager::Plant;
use crate::persistence::models::{ForecastRow, PredictionRow};
use crate::persistence::PersistenceHandle;
use crate::time::horizon_hours;
use crate::weather::{WeatherClient, WeatherForecast};

/// Orchestrates one full cycle: refresh state, fan out weather retrieval,
/// build feature matrices per model, run inference, horizon-tag the output,
/// and enqueue everything for background persistence. Per-plant and
/// per-model failures are isolated; nothing here aborts the run.
pub async fn run(
    now: DateTime<Utc>,
    state: &StateCache,
    weather: &WeatherClient,
    persistence: &PersistenceHandle,
) {
    state.refresh().await;

    let plants: Vec<Plant> = state
        .active_plants()
        .await
        .into_iter()
        .filter(Plant::has_coordinates)
        .collect();

    if plants.is_empty() {
        tracing::info!("no active plants with coordinates, pipeline run is a no-op");
        return;
    }

    let forecasts = fetch_all_forecasts(&plants, weather, now).await;
    if forecasts.is_empty() {
        tracing::info!("no weather forecasts retrieved this cycle");
        return;
    }

    for forecast in &forecasts {
        let rows = ForecastRow::rows_for(forecast);
        persistence.enqueue_forecasts(rows).await;
    }

    for forecast in &forecasts {
        let Some(plant) = state.plant(forecast.plant_id).await else {
            continue;
        };
        let models = state.active_models(forecast.plant_id).await;
        if models.is_empty() {
            continue;
        }

        let context = PlantContext {
            capacity: plant.capacity,
            latitude: plant.latitude,
            longitude: plant.longitude,
            elevation: plant.elevation,
        };

        for active_model in &models {
            if let Err(err) = run_model(forecast, active_model, context, persistence).await {
                tracing::warn!(
                    model_id = active_model.metadata.id,
                    error = %err,
                    "skipping model for this cycle"
                );
            }
        }
    }
}

async fn fetch_all_forecasts(
    plants: &[Plant],
    weather: &WeatherClient,
    now: DateTime<Utc>,
) -> Vec<WeatherForecast> {
    let mut in_flight = FuturesUnordered::new();
    for plant in plants {
        let weather = weather.clone();
        let plant = plant.clone();
        in_flight.push(async move { weather.fetch(&plant, now).await });
    }

    let mut forecasts = Vec::new();
    while let Some(result) = in_flight.next().await {
        if let Some(forecast) = result {
            forecasts.push(forecast);
        }
    }
    forecasts
}

async fn run_model(
    forecast: &WeatherForecast,
    active_model: &Arc<crate::cache::ActiveModel>,
    context: PlantContext,
    persistence: &PersistenceHandle,
) -> Result<(), crate::error::PipelineError> {
    let matrix = features::prepare(forecast, &active_model.metadata.features, context)?;

    let model = active_model.model.clone();
    let matrix_for_predict = matrix.clone();
    let predictions = tokio::task::spawn_blocking(move || model.predict(&matrix_for_predict))
        .await
        .map_err(|err| crate::error::PipelineError::Invariant(format!("predict task panicked: {err}")))??;

    let created_at = forecast.fetch_time;
    let model_id = active_model.metadata.id;
    let n = predictions.len().min(forecast.points.len());

    let rows: Vec<PredictionRow> = (0..n)
        .map(|i| {
            let prediction_time = forecast.points[i].time;
            PredictionRow {
                prediction_time,
                model_id,
                created_at,
                predicted_power: predictions[i],
                horizon: horizon_hours(created_at, prediction_time),
            }
        })
        .collect();

    persistence.enqueue_predictions(rows).await;
    Ok(())
}
