use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::artifact::{decode_artifact, DecodedModel};
use crate::model_manager::{ModelManagerClient, ModelMetadata, Plant};

/// One active model bound to a plant, paired with its decoded artifact.
pub struct ActiveModel {
    pub metadata: ModelMetadata,
    pub model: Arc<dyn DecodedModel>,
}

#[derive(Default)]
struct Snapshot {
    plants: HashMap<i64, Plant>,
    models_by_plant: HashMap<i64, Vec<Arc<ActiveModel>>>,
}

/// Read-mostly registry of the active plant/model view. The pipeline is the
/// sole writer (via `refresh`); everything else only reads. A refresh builds
/// the new maps into locals and swaps the whole snapshot under one write
/// lock, so readers never see a torn mix of old and new state.
pub struct StateCache {
    snapshot: RwLock<Arc<Snapshot>>,
    client: ModelManagerClient,
}

impl StateCache {
    pub fn new(client: ModelManagerClient) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            client,
        }
    }

    /// Best-effort, partial refresh: the plant map and the model set are
    /// replaced independently, each only if its own fetch succeeds. A
    /// transient Model-Manager models-endpoint failure does not roll back
    /// an already-successful plants fetch, and vice versa. Per-model
    /// download/decode failures are logged and that model is skipped; they
    /// never invalidate the rest of the refresh.
    pub async fn refresh(&self) {
        let plant_map = match self.client.fetch_active_plants().await {
            Some(plants) => {
                let plant_map: HashMap<i64, Plant> = plants.into_iter().map(|p| (p.id, p)).collect();
                let mut guard = self.snapshot.write().await;
                let models_by_plant = guard.models_by_plant.clone();
                *guard = Arc::new(Snapshot {
                    plants: plant_map.clone(),
                    models_by_plant,
                });
                plant_map
            }
            None => {
                tracing::warn!("state refresh: could not fetch active plants, keeping previous plant map");
                self.snapshot.read().await.plants.clone()
            }
        };

        let Some(metadata_list) = self.client.fetch_active_models().await else {
            tracing::warn!("state refresh: could not fetch active models, keeping previous model set");
            return;
        };

        let mut models_by_plant: HashMap<i64, Vec<Arc<ActiveModel>>> = HashMap::new();
        for metadata in metadata_list {
            if !plant_map.contains_key(&metadata.plant_id) {
                tracing::warn!(model_id = metadata.id, plant_id = metadata.plant_id, "model references unknown plant, skipping");
                continue;
            }
            let Some(bytes) = self.client.download_model(metadata.id).await else {
                tracing::warn!(model_id = metadata.id, "model artifact download failed, skipping");
                continue;
            };
            let model = match decode_artifact(metadata.file_type, &bytes) {
                Ok(model) => model,
                Err(err) => {
                    tracing::warn!(model_id = metadata.id, error = %err, "artifact decode failed, skipping");
                    continue;
                }
            };
            models_by_plant
                .entry(metadata.plant_id)
                .or_default()
                .push(Arc::new(ActiveModel {
                    metadata,
                    model: Arc::from(model),
                }));
        }

        let mut guard = self.snapshot.write().await;
        let plants = guard.plants.clone();
        *guard = Arc::new(Snapshot { plants, models_by_plant });
    }

    pub async fn active_plants(&self) -> Vec<Plant> {
        self.snapshot.read().await.plants.values().cloned().collect()
    }

    pub async fn plant(&self, id: i64) -> Option<Plant> {
        self.snapshot.read().await.plants.get(&id).cloned()
    }

    pub async fn active_models(&self, plant_id: i64) -> Vec<Arc<ActiveModel>> {
        self.snapshot
            .read()
            .await
            .models_by_plant
            .get(&plant_id)
            .cloned()
            .unwrap_or_default()
    }
}
