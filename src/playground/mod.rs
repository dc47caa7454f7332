use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::artifact::decode_artifact;
use crate::error::PipelineError;
use crate::model_manager::ModelManagerClient;
use crate::persistence::queries;

pub struct PlaygroundResult {
    pub timestamps: Vec<DateTime<Utc>>,
    pub predicted_power: Vec<f64>,
    pub metrics: Option<(f64, f64, f64)>,
}

/// Validates a playground CSV: header must be `timestamp` followed by the
/// model's exact feature list, in order — no missing, extra, or reordered
/// columns. Returns the parsed rows or the first validation error.
fn parse_and_validate(body: &[u8], features: &[String]) -> Result<(Vec<DateTime<Utc>>, Vec<Vec<f64>>), String> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(body);

    let headers = reader.headers().map_err(|err| format!("could not read CSV header: {err}"))?;
    let expected: Vec<&str> = std::iter::once("timestamp").chain(features.iter().map(String::as_str)).collect();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != expected {
        return Err(format!(
            "CSV header {actual:?} does not match expected columns {expected:?}"
        ));
    }

    let mut timestamps = Vec::new();
    let mut matrix = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2; // account for header row
        let record = record.map_err(|err| format!("row {line}: malformed CSV record: {err}"))?;
        let timestamp = record[0]
            .parse::<DateTime<Utc>>()
            .map_err(|err| format!("row {line}: timestamp parse error: {err}"))?;
        let mut row = Vec::with_capacity(features.len());
        for (col, value) in record.iter().skip(1).enumerate() {
            let parsed = value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("row {line}: column '{}' is not numeric", expected[col + 1]))?;
            row.push(parsed);
        }
        timestamps.push(timestamp);
        matrix.push(row);
    }

    Ok((timestamps, matrix))
}

/// Loads `model_id` fresh (independent of the state cache's active-model
/// view), validates the uploaded CSV against its feature list, runs
/// inference, and, if stored readings cover the prediction timestamps,
/// computes `{MAE, RMSE, MBE}` against them.
pub async fn predict(
    pool: &PgPool,
    model_manager: &ModelManagerClient,
    model_id: i64,
    body: &[u8],
    max_upload_bytes: u64,
) -> Result<PlaygroundResult, PipelineError> {
    if body.len() as u64 > max_upload_bytes {
        return Err(PipelineError::DataParse(format!(
            "upload exceeds {max_upload_bytes} bytes"
        )));
    }

    let metadata = model_manager
        .fetch_model(model_id)
        .await
        .ok_or_else(|| PipelineError::TransientExternal(format!("model {model_id} not found")))?;

    let (timestamps, matrix) =
        parse_and_validate(body, &metadata.features).map_err(PipelineError::DataParse)?;

    let bytes = model_manager
        .download_model(model_id)
        .await
        .ok_or_else(|| PipelineError::TransientExternal(format!("could not download model {model_id}")))?;
    let model = decode_artifact(metadata.file_type, &bytes)?;
    let predicted_power = model.predict(&matrix)?;

    let metrics = if let (Some(&start), Some(&end)) = (timestamps.first(), timestamps.last()) {
        match queries::readings_in_range(pool, metadata.plant_id, start, end).await {
            Ok(readings) if !readings.is_empty() => {
                let by_timestamp: std::collections::HashMap<DateTime<Utc>, f64> =
                    readings.into_iter().map(|r| (r.timestamp, r.power_w)).collect();
                let errors: Vec<f64> = timestamps
                    .iter()
                    .zip(&predicted_power)
                    .filter_map(|(ts, predicted)| by_timestamp.get(ts).map(|actual| predicted - actual))
                    .collect();
                if errors.is_empty() {
                    None
                } else {
                    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / errors.len() as f64;
                    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt();
                    let mbe = errors.iter().sum::<f64>() / errors.len() as f64;
                    Some((mae, rmse, mbe))
                }
            }
            _ => None,
        }
    } else {
        None
    };

    Ok(PlaygroundResult {
        timestamps,
        predicted_power,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_header_missing_a_feature_column() {
        let features = vec!["shortwave_radiation".to_string(), "hour".to_string()];
        let csv = b"timestamp,shortwave_radiation\n2024-06-01T00:00:00Z,1.0\n";
        assert!(parse_and_validate(csv, &features).is_err());
    }

    #[test]
    fn rejects_out_of_order_feature_columns() {
        let features = vec!["shortwave_radiation".to_string(), "hour".to_string()];
        let csv = b"timestamp,hour,shortwave_radiation\n2024-06-01T00:00:00Z,0,1.0\n";
        assert!(parse_and_validate(csv, &features).is_err());
    }

    #[test]
    fn accepts_exact_header_match() {
        let features = vec!["shortwave_radiation".to_string(), "hour".to_string()];
        let csv = b"timestamp,shortwave_radiation,hour\n2024-06-01T00:00:00Z,1.0,0\n";
        let (timestamps, matrix) = parse_and_validate(csv, &features).unwrap();
        assert_eq!(timestamps.len(), 1);
        assert_eq!(matrix[0], vec![1.0, 0.0]);
    }
}
