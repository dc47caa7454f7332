use std::sync::Arc;

use crate::cache::StateCache;
use crate::config::CoreConfig;
use crate::db;
use crate::model_manager::ModelManagerClient;
use crate::persistence::PersistenceHandle;
use crate::scheduler::Scheduler;
use crate::state::AppState;
use crate::weather::WeatherClient;

pub fn test_config() -> CoreConfig {
    CoreConfig {
        database_url: "postgresql://postgres@127.0.0.1/postgres".to_string(),
        db_min_connections: 1,
        db_max_connections: 5,
        model_manager_base_url: "http://127.0.0.1:1".to_string(),
        model_manager_timeout_seconds: 5,
        weather_base_url: "http://127.0.0.1:1".to_string(),
        weather_timeout_seconds: 5,
        pipeline_poll_interval_seconds: 1,
        persistence_queue_capacity: 16,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Builds an `AppState` wired against a lazy (never-connects) pool and
/// loopback external clients, for exercising route handlers that don't
/// actually touch the database or network in the test itself.
pub fn test_state() -> AppState {
    let config = test_config();
    let pool = db::connect_lazy(&config.database_url).expect("lazy pool");
    let http = reqwest::Client::new();
    let model_manager = ModelManagerClient::new(
        http.clone(),
        config.model_manager_base_url.clone(),
        config.model_manager_timeout_seconds,
    );
    let weather = Arc::new(WeatherClient::new(
        http.clone(),
        config.weather_base_url.clone(),
        config.weather_timeout_seconds,
    ));
    let state_cache = Arc::new(StateCache::new(model_manager.clone()));
    let (persistence, _writer_handle) =
        PersistenceHandle::spawn(pool.clone(), config.persistence_queue_capacity);
    let scheduler = Arc::new(Scheduler::new(
        state_cache.clone(),
        weather.clone(),
        persistence.clone(),
        config.pipeline_poll_interval_seconds,
    ));

    AppState {
        config,
        db: pool,
        http,
        model_manager,
        weather,
        state_cache,
        persistence,
        scheduler,
    }
}
