use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::CoreConfig;

pub async fn connect(config: &CoreConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(config.db_min_connections)
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(8))
        .connect(&config.database_url)
        .await
        .context("failed to create database pool")
}

/// Builds a pool that defers the actual connection attempt until first use.
/// Used by `test_support` so route-level tests can construct an `AppState`
/// without a live database.
pub fn connect_lazy(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(8))
        .connect_lazy(database_url)
        .with_context(|| format!("failed to create lazy database pool for {database_url}"))
}
