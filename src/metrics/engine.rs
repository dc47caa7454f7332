use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::PipelineError;
use crate::model_manager::ModelManagerClient;
use crate::persistence::models::{CycleMetricRow, HorizonMetricRow, MetricType};
use crate::persistence::queries;

fn mae(errors: &[f64]) -> f64 {
    errors.iter().map(|e| e.abs()).sum::<f64>() / errors.len() as f64
}

fn rmse(errors: &[f64]) -> f64 {
    (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt()
}

fn mbe(errors: &[f64]) -> f64 {
    errors.iter().sum::<f64>() / errors.len() as f64
}

fn metrics_for(errors: &[f64]) -> Result<[(MetricType, f64); 3], PipelineError> {
    if errors.is_empty() {
        return Err(PipelineError::Invariant(
            "cannot compute metrics over an empty set of paired points".to_string(),
        ));
    }
    Ok([
        (MetricType::Mae, mae(errors)),
        (MetricType::Rmse, rmse(errors)),
        (MetricType::Mbe, mbe(errors)),
    ])
}

async fn plant_id_for_model(model_manager: &ModelManagerClient, model_id: i64) -> Result<i64, PipelineError> {
    model_manager
        .fetch_model(model_id)
        .await
        .map(|m| m.plant_id)
        .ok_or_else(|| PipelineError::TransientExternal(format!("could not resolve plant for model {model_id}")))
}

/// Recomputes per-horizon error metrics for a model: one `(MAE,RMSE,MBE)`
/// triple per horizon bucket present in the joined data, aggregated across
/// every cycle. Idempotent: the upsert overwrites the prior value.
pub async fn calculate_horizon_metrics(
    pool: &PgPool,
    model_manager: &ModelManagerClient,
    model_id: i64,
) -> Result<Vec<HorizonMetricRow>, PipelineError> {
    let plant_id = plant_id_for_model(model_manager, model_id).await?;
    let joined = queries::predictions_joined_with_readings_by_horizon(pool, model_id, plant_id)
        .await
        .map_err(|err| PipelineError::TransientExternal(err.to_string()))?;

    let mut by_horizon: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
    let mut horizon_values: BTreeMap<u64, f64> = BTreeMap::new();
    for row in &joined {
        let key = row.horizon.to_bits();
        horizon_values.insert(key, row.horizon);
        by_horizon
            .entry(key)
            .or_default()
            .push(row.predicted_power - row.power_w);
    }

    let mut rows = Vec::new();
    for (key, errors) in &by_horizon {
        let horizon = horizon_values[key];
        for (metric_type, value) in metrics_for(errors)? {
            rows.push(HorizonMetricRow {
                model_id,
                metric_type,
                horizon,
                value,
            });
        }
    }

    queries::upsert_horizon_metrics(pool, &rows)
        .await
        .map_err(|err| PipelineError::TransientExternal(err.to_string()))?;
    Ok(rows)
}

/// Recomputes per-cycle error metrics for a model: one `(MAE,RMSE,MBE)`
/// triple per `created_at` cycle, aggregated across every horizon within
/// that cycle — not one value per `(cycle, horizon)`.
pub async fn calculate_cycle_metrics(
    pool: &PgPool,
    model_manager: &ModelManagerClient,
    model_id: i64,
) -> Result<Vec<CycleMetricRow>, PipelineError> {
    let plant_id = plant_id_for_model(model_manager, model_id).await?;
    let joined = queries::predictions_joined_with_readings_by_cycle(pool, model_id, plant_id)
        .await
        .map_err(|err| PipelineError::TransientExternal(err.to_string()))?;

    let mut by_cycle: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for row in &joined {
        by_cycle
            .entry(row.created_at)
            .or_default()
            .push(row.predicted_power - row.power_w);
    }

    let mut rows = Vec::new();
    for (cycle, errors) in &by_cycle {
        for (metric_type, value) in metrics_for(errors)? {
            rows.push(CycleMetricRow {
                time_of_forecast: *cycle,
                model_id,
                metric_type,
                value,
            });
        }
    }

    queries::upsert_cycle_metrics(pool, &rows)
        .await
        .map_err(|err| PipelineError::TransientExternal(err.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mbe_of_constant_offset_is_exact() {
        let predicted = [100.0, 110.0, 90.0];
        let actual = [94.0, 104.0, 84.0];
        let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
        assert_eq!(mbe(&errors), 6.0);
    }

    #[test]
    fn mae_rmse_mbe_match_known_values() {
        let predicted = [100.0, 110.0, 90.0];
        let actual = [100.0, 100.0, 100.0];
        let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
        assert!((mae(&errors) - 6.666_666_666_666_667).abs() < 1e-9);
        assert!((rmse(&errors) - 8.164_965_809_277_26).abs() < 1e-9);
        assert_eq!(mbe(&errors), 0.0);
    }

    #[test]
    fn empty_errors_is_an_invariant_violation() {
        assert!(metrics_for(&[]).is_err());
    }
}
