use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub db_min_connections: u32,
    pub db_max_connections: u32,
    pub model_manager_base_url: String,
    pub model_manager_timeout_seconds: u64,
    pub weather_base_url: String,
    pub weather_timeout_seconds: u64,
    pub pipeline_poll_interval_seconds: u64,
    pub persistence_queue_capacity: usize,
    pub max_upload_bytes: u64,
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = match std::env::var("DATABASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            Some(url) => url,
            None => {
                let host = env_string("DB_HOST", "127.0.0.1");
                let port = env_u16("DB_PORT", 5432);
                let user = env_string("DB_USER", "postgres");
                let password = std::env::var("DB_PASSWORD").unwrap_or_default();
                let name = env_string("DB_NAME", "solar_prediction");
                format!("postgres://{user}:{password}@{host}:{port}/{name}")
            }
        };
        if database_url.trim().is_empty() {
            anyhow::bail!("database connection settings resolved to an empty URL");
        }

        let model_manager_base_url = env_optional_string("MODEL_MANAGER_BASE_URL")
            .context("MODEL_MANAGER_BASE_URL must be set")?;

        Ok(Self {
            database_url,
            db_min_connections: env_u32("DB_MIN_CONNECTIONS", 5),
            db_max_connections: env_u32("DB_MAX_CONNECTIONS", 20),
            model_manager_base_url: model_manager_base_url.trim_end_matches('/').to_string(),
            model_manager_timeout_seconds: env_u64("MODEL_MANAGER_TIMEOUT_SECONDS", 30),
            weather_base_url: env_string(
                "WEATHER_BASE_URL",
                "https://api.open-meteo.com/v1/forecast",
            ),
            weather_timeout_seconds: env_u64("OPEN_METEO_TIMEOUT_SECONDS", 30),
            pipeline_poll_interval_seconds: env_u64("PIPELINE_POLL_INTERVAL_SECONDS", 30),
            persistence_queue_capacity: env_u32("PERSISTENCE_QUEUE_CAPACITY", 1024) as usize,
            max_upload_bytes: env_u64("MAX_UPLOAD_BYTES", 100 * 1024 * 1024),
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_u64_falls_back_to_default_on_garbage() {
        std::env::remove_var("SOLAR_PREDICTION_TEST_KEY");
        assert_eq!(env_u64("SOLAR_PREDICTION_TEST_KEY", 42), 42);
    }
}
