use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::scheduler::SchedulerStatus;
use crate::state::AppState;

#[derive(Serialize)]
struct StatusResponse {
    service: &'static str,
    power_plants: usize,
    models: usize,
    prediction_scheduler: SchedulerStatusResponse,
}

#[derive(Serialize)]
struct SchedulerStatusResponse {
    running: bool,
    jobs: Vec<JobStatus>,
}

#[derive(Serialize)]
struct JobStatus {
    id: &'static str,
    name: &'static str,
    trigger: &'static str,
    pending: bool,
}

impl From<SchedulerStatus> for SchedulerStatusResponse {
    fn from(status: SchedulerStatus) -> Self {
        Self {
            running: status.running,
            jobs: vec![JobStatus {
                id: status.job_id,
                name: status.job_name,
                trigger: status.trigger,
                pending: status.pending,
            }],
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let plants = state.state_cache.active_plants().await;
    let mut model_count = 0;
    for plant in &plants {
        model_count += state.state_cache.active_models(plant.id).await.len();
    }

    Json(StatusResponse {
        service: "solar-prediction",
        power_plants: plants.len(),
        models: model_count,
        prediction_scheduler: state.scheduler.status().into(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/internal/status", get(status))
}
