use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::model_manager::ModelManagerClient;
use crate::persistence::queries;

pub struct IngestResult {
    pub success: bool,
    pub rows_inserted: usize,
    pub errors: Vec<String>,
}

/// Parses a headerless `timestamp,power_w` CSV. Any row error rejects the
/// whole upload — the error list is still collected and returned so the
/// caller can see every problem, not just the first.
fn parse_csv(body: &[u8]) -> (Vec<(DateTime<Utc>, f64)>, Vec<String>) {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(body);
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen_timestamps = HashSet::new();

    for (i, record) in reader.records().enumerate() {
        let line = i + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                errors.push(format!("row {line}: malformed CSV record: {err}"));
                continue;
            }
        };
        if record.len() != 2 {
            errors.push(format!("row {line}: expected 2 columns, got {}", record.len()));
            continue;
        }
        let timestamp = match record[0].parse::<DateTime<Utc>>() {
            Ok(t) => t,
            Err(err) => {
                errors.push(format!("row {line}: timestamp parse error: {err}"));
                continue;
            }
        };
        let power_w = match record[1].trim().parse::<f64>() {
            Ok(v) => v,
            Err(err) => {
                errors.push(format!("row {line}: power parse error: {err}"));
                continue;
            }
        };
        if !seen_timestamps.insert(timestamp) {
            errors.push(format!("row {line}: duplicate timestamp {timestamp}"));
            continue;
        }
        rows.push((timestamp, power_w));
    }

    (rows, errors)
}

/// Ingests a readings CSV for `plant_id`. On success, batch-inserts the
/// readings and then triggers metric recompute for every active model of
/// the plant; metric failures are logged but never fail the upload.
pub async fn ingest(
    pool: &PgPool,
    model_manager: &ModelManagerClient,
    plant_id: i64,
    body: &[u8],
) -> IngestResult {
    let (rows, errors) = parse_csv(body);
    if !errors.is_empty() {
        return IngestResult {
            success: false,
            rows_inserted: 0,
            errors,
        };
    }

    if let Err(err) = queries::insert_readings(pool, plant_id, &rows).await {
        return IngestResult {
            success: false,
            rows_inserted: 0,
            errors: vec![format!("database error: {err}")],
        };
    }

    let models = model_manager
        .fetch_plant_models(plant_id)
        .await
        .unwrap_or_default();
    for model in models {
        if let Err(err) = crate::metrics::calculate_horizon_metrics(pool, model_manager, model.id).await {
            tracing::warn!(model_id = model.id, error = %err, "horizon metric recompute failed after ingest");
        }
        if let Err(err) = crate::metrics::calculate_cycle_metrics(pool, model_manager, model.id).await {
            tracing::warn!(model_id = model.id, error = %err, "cycle metric recompute failed after ingest");
        }
    }

    IngestResult {
        success: true,
        rows_inserted: rows.len(),
        errors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_whole_upload_on_any_bad_row() {
        let csv = b"2024-06-01T12:00:00Z,500\n2024-06-01T12:15:00Z,abc\n";
        let (rows, errors) = parse_csv(csv);
        assert!(!errors.is_empty());
        assert!(errors[0].contains("row 2"));
        let _ = rows;
    }

    #[test]
    fn duplicate_timestamp_is_an_error() {
        let csv = b"2024-06-01T12:00:00Z,500\n2024-06-01T12:00:00Z,510\n";
        let (_, errors) = parse_csv(csv);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate"));
    }

    #[test]
    fn clean_csv_parses_with_no_errors() {
        let csv = b"2024-06-01T12:00:00Z,500\n2024-06-01T12:15:00Z,510\n";
        let (rows, errors) = parse_csv(csv);
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 2);
    }
}
