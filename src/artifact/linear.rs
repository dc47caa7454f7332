use crate::error::PipelineError;

/// Capability exposed by a decoded model: pure, allocating, no I/O.
pub trait DecodedModel: Send + Sync {
    fn predict(&self, matrix: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError>;
}

/// The only estimator shape this loader can reconstruct without a Python
/// runtime: `y = weights . row + intercept` per row. Every joblib/pkl/pickle
/// artifact we can decode is required to reduce to this shape.
#[derive(Debug, Clone)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl DecodedModel for LinearModel {
    fn predict(&self, matrix: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        matrix
            .iter()
            .map(|row| {
                if row.len() != self.weights.len() {
                    return Err(PipelineError::Invariant(format!(
                        "feature row has {} columns, model expects {}",
                        row.len(),
                        self.weights.len()
                    )));
                }
                let dot: f64 = row.iter().zip(&self.weights).map(|(x, w)| x * w).sum();
                Ok(dot + self.intercept)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicts_linear_combination_plus_intercept() {
        let model = LinearModel {
            weights: vec![2.0, 0.5],
            intercept: 1.0,
        };
        let matrix = vec![vec![10.0, 4.0], vec![0.0, 0.0]];
        let predictions = model.predict(&matrix).unwrap();
        assert_eq!(predictions, vec![22.0, 1.0]);
    }

    #[test]
    fn rejects_row_with_wrong_column_count() {
        let model = LinearModel {
            weights: vec![1.0, 1.0],
            intercept: 0.0,
        };
        let matrix = vec![vec![1.0]];
        assert!(model.predict(&matrix).is_err());
    }
}
