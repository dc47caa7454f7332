use std::time::Duration;

use reqwest::Client;

use super::models::{ModelMetadata, Plant};

/// Typed read client for Model-Manager. Every call returns `None` on any
/// network, status, or decode failure; the caller decides whether that's
/// fatal to the whole refresh or just to one item.
#[derive(Debug, Clone)]
pub struct ModelManagerClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ModelManagerClient {
    pub fn new(http: Client, base_url: String, timeout_seconds: u64) -> Self {
        Self {
            http,
            base_url,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub async fn fetch_active_plants(&self) -> Option<Vec<Plant>> {
        self.get_json("/internal/power-plant/active").await
    }

    pub async fn fetch_active_models(&self) -> Option<Vec<ModelMetadata>> {
        self.get_json("/internal/models/active").await
    }

    pub async fn fetch_plant_models(&self, plant_id: i64) -> Option<Vec<ModelMetadata>> {
        self.get_json(&format!("/power_plant/{plant_id}/models")).await
    }

    pub async fn fetch_model(&self, model_id: i64) -> Option<ModelMetadata> {
        self.get_json(&format!("/models/{model_id}")).await
    }

    pub async fn download_model(&self, model_id: i64) -> Option<Vec<u8>> {
        let url = format!("{}/internal/models/{model_id}/download", self.base_url);
        let response = match self.http.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, model_id, "model artifact download failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), model_id, "model artifact download returned error status");
            return None;
        }
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                tracing::warn!(error = %err, model_id, "model artifact body read failed");
                None
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}{path}", self.base_url);
        let response = match self.http.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, url, "model-manager request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), url, "model-manager returned error status");
            return None;
        }
        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %err, url, "model-manager response decode failed");
                None
            }
        }
    }
}
