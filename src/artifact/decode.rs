use std::io::Read;

use flate2::read::ZlibDecoder;
use serde_pickle::{HashableValue, Value};

use crate::error::PipelineError;
use crate::model_manager::FileType;

use super::linear::{DecodedModel, LinearModel};

/// Decodes an opaque artifact into a `DecodedModel`.
///
/// Real joblib/pickle dumps of sklearn estimators reference compiled numpy
/// and sklearn classes that a pure-Rust pickle reader cannot reconstruct. We
/// restrict ourselves to a single intentionally supported shape: a pickled
/// mapping with a `weights` sequence and an `intercept` scalar (the shape a
/// linear estimator's trained coefficients reduce to). `zip` artifacts ship a
/// companion Python module defining custom classes for the serializer to
/// resolve against — there is no runtime code loading in this build, so that
/// file type is unsupported and always fails decode.
pub fn decode_artifact(file_type: FileType, bytes: &[u8]) -> Result<Box<dyn DecodedModel>, PipelineError> {
    match file_type {
        FileType::Zip => Err(PipelineError::ArtifactDecode(
            "zip-packaged models with companion source are not supported".to_string(),
        )),
        FileType::Joblib | FileType::Pkl | FileType::Pickle => {
            let raw = maybe_inflate(bytes);
            let value = serde_pickle::value_from_slice(&raw, serde_pickle::DeOptions::default())
                .map_err(|err| PipelineError::ArtifactDecode(format!("pickle decode failed: {err}")))?;
            let model = linear_model_from_value(&value)?;
            Ok(Box::new(model))
        }
    }
}

/// joblib sometimes wraps the pickle stream in zlib compression. Pickle's
/// own magic (protocol-2+ starts with `\x80`) never overlaps zlib's, so a
/// failed inflate just means the bytes were plain pickle.
fn maybe_inflate(bytes: &[u8]) -> Vec<u8> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(n) if n > 0 => out,
        _ => bytes.to_vec(),
    }
}

fn linear_model_from_value(value: &Value) -> Result<LinearModel, PipelineError> {
    let Value::Dict(map) = value else {
        return Err(PipelineError::ArtifactDecode(
            "expected a pickled mapping with weights/intercept".to_string(),
        ));
    };

    let weights = dict_get(map, "weights")
        .ok_or_else(|| PipelineError::ArtifactDecode("pickled model missing 'weights'".to_string()))
        .and_then(value_to_f64_vec)?;

    let intercept = dict_get(map, "intercept")
        .ok_or_else(|| PipelineError::ArtifactDecode("pickled model missing 'intercept'".to_string()))
        .and_then(value_to_f64)?;

    Ok(LinearModel { weights, intercept })
}

fn dict_get<'a>(map: &'a std::collections::BTreeMap<HashableValue, Value>, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, HashableValue::String(s) if s == key))
        .map(|(_, v)| v)
}

fn value_to_f64(value: &Value) -> Result<f64, PipelineError> {
    match value {
        Value::F64(v) => Ok(*v),
        Value::I64(v) => Ok(*v as f64),
        other => Err(PipelineError::ArtifactDecode(format!(
            "expected a numeric scalar, got {other:?}"
        ))),
    }
}

fn value_to_f64_vec(value: &Value) -> Result<Vec<f64>, PipelineError> {
    match value {
        Value::List(items) | Value::Tuple(items) => items.iter().map(value_to_f64).collect(),
        other => Err(PipelineError::ArtifactDecode(format!(
            "expected a sequence of weights, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_is_always_unsupported() {
        let result = decode_artifact(FileType::Zip, b"PK\x03\x04");
        assert!(result.is_err());
    }
}
