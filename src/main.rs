use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use solar_prediction_rs::cache::StateCache;
use solar_prediction_rs::cli::Args;
use solar_prediction_rs::config::CoreConfig;
use solar_prediction_rs::model_manager::ModelManagerClient;
use solar_prediction_rs::persistence::PersistenceHandle;
use solar_prediction_rs::routes;
use solar_prediction_rs::scheduler::Scheduler;
use solar_prediction_rs::state::AppState;
use solar_prediction_rs::weather::WeatherClient;
use solar_prediction_rs::db;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = CoreConfig::from_env().context("failed to load configuration")?;

    let pool = db::connect(&config)
        .await
        .context("fatal: database pool failed to initialize")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("fatal: database migrations failed")?;

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
    let (persistence, persistence_handle) =
        PersistenceHandle::spawn(pool.clone(), config.persistence_queue_capacity);
    let scheduler = Arc::new(Scheduler::new(
        state_cache.clone(),
        weather.clone(),
        persistence.clone(),
        config.pipeline_poll_interval_seconds,
    ));

    let cancel = CancellationToken::new();
    let scheduler_handle = scheduler.clone().start(cancel.clone());

    let db_pool = pool.clone();
    let app_state = AppState {
        config: config.clone(),
        db: pool,
        http,
        model_manager,
        weather,
        state_cache,
        persistence,
        scheduler,
    };

    let app = routes::router(app_state);

    let listener = bind_listener(&args.host, args.port)?;
    tracing::info!(host = %args.host, port = args.port, "listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown_cancel.cancel();
        })
        .await
        .context("server error")?;

    // `app` (and every clone of `AppState` it held, including the last
    // `PersistenceHandle` sender) is dropped once `serve` returns above, so
    // draining these in order lets the in-flight pipeline run finish, the
    // persistence writer see its channel close and exit, and only then
    // closes the pool out from under it.
    tracing::info!("draining scheduler and persistence writer");
    scheduler_handle.await.context("scheduler task panicked")?;
    persistence_handle.await.context("persistence writer task panicked")?;
    db_pool.close().await;

    Ok(())
}

fn bind_listener(host: &str, port: u16) -> Result<TcpListener> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    let std_listener = StdTcpListener::bind(addr).map_err(|err| {
        if err.kind() == std::io::ErrorKind::AddrInUse {
            anyhow::anyhow!(
                "port {port} is already in use on {host} — stop the process using it or pick another port"
            )
        } else {
            anyhow::anyhow!("failed to bind {addr}: {err}")
        }
    })?;
    std_listener.set_nonblocking(true)?;
    Ok(TcpListener::from_std(std_listener)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_listener_reports_port_in_use() {
        let first = bind_listener("127.0.0.1", 0).unwrap();
        let port = first.into_std().unwrap().local_addr().unwrap().port();
        let err = bind_listener("127.0.0.1", port).unwrap_err();
        assert!(err.to_string().contains("already in use"));
    }
}
