use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::cache::StateCache;
use crate::config::CoreConfig;
use crate::model_manager::ModelManagerClient;
use crate::scheduler::Scheduler;
use crate::weather::WeatherClient;
use crate::persistence::PersistenceHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: CoreConfig,
    pub db: PgPool,
    pub http: reqwest::Client,
    pub model_manager: ModelManagerClient,
    pub weather: Arc<WeatherClient>,
    pub state_cache: Arc<StateCache>,
    pub persistence: PersistenceHandle,
    pub scheduler: Arc<Scheduler>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
