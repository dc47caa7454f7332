use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rrule::RRuleSet;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::StateCache;
use crate::persistence::PersistenceHandle;
use crate::weather::WeatherClient;

const TRIGGER_RRULE: &str = "DTSTART:20240101T000000Z\nRRULE:FREQ=HOURLY;BYHOUR=0,6,12,18;BYMINUTE=0;BYSECOND=0";
const MISFIRE_GRACE: chrono::Duration = chrono::Duration::seconds(60);

#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub running: bool,
    pub job_id: &'static str,
    pub job_name: &'static str,
    pub trigger: &'static str,
    pub pending: bool,
}

/// Cron-triggered, non-reentrant runner for the prediction pipeline.
/// `max_instances=1` is enforced with an atomic running flag rather than a
/// cron library's own concurrency control, since the trigger check and the
/// run itself are decoupled by design (see `is_due`).
pub struct Scheduler {
    state: Arc<StateCache>,
    weather: Arc<WeatherClient>,
    persistence: PersistenceHandle,
    running: Arc<AtomicBool>,
    last_fire: Arc<Mutex<Option<DateTime<Utc>>>>,
    poll_interval: std::time::Duration,
}

impl Scheduler {
    pub fn new(
        state: Arc<StateCache>,
        weather: Arc<WeatherClient>,
        persistence: PersistenceHandle,
        poll_interval_seconds: u64,
    ) -> Self {
        Self {
            state,
            weather,
            persistence,
            running: Arc::new(AtomicBool::new(false)),
            last_fire: Arc::new(Mutex::new(None)),
            poll_interval: std::time::Duration::from_secs(poll_interval_seconds.max(1)),
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::SeqCst),
            job_id: "prediction_generation",
            job_name: "prediction_generation",
            trigger: "cron: 0,6,12,18 * * *",
            pending: false,
        }
    }

    /// Ticks at `poll_interval` checking whether a trigger boundary has been
    /// crossed since the last check (catching up within `misfire_grace_time`
    /// if the process was briefly stalled), and runs the pipeline at most
    /// once concurrently. Returns a handle the caller awaits on shutdown to
    /// ensure an in-flight pipeline run finishes before the process exits.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("scheduler stopping, waiting for in-flight run to finish");
                        while self.running.load(Ordering::SeqCst) {
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        }
                        tracing::info!("scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
        })
    }

    async fn tick(&self) {
        let now = Utc::now();
        if !self.is_due(now).await {
            return;
        }

        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("prediction_generation trigger skipped, max_instances");
            return;
        }

        *self.last_fire.lock().await = Some(now);
        let state = self.state.clone();
        let weather = self.weather.clone();
        let persistence = self.persistence.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            crate::pipeline::run(now, &state, &weather, &persistence).await;
            running.store(false, Ordering::SeqCst);
        });
    }

    async fn is_due(&self, now: DateTime<Utc>) -> bool {
        let last_fire = *self.last_fire.lock().await;
        let window_start = last_fire.unwrap_or(now - MISFIRE_GRACE);
        is_due(TRIGGER_RRULE, window_start, now)
    }
}

/// True if the rrule schedule has an occurrence in `(window_start, now]`.
fn is_due(rrule_text: &str, window_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let Ok(rule_set) = rrule_text.parse::<RRuleSet>() else {
        tracing::error!(rrule = rrule_text, "invalid trigger rrule");
        return false;
    };
    let window_start = window_start.with_timezone(&rrule::Tz::UTC);
    let now_tz = now.with_timezone(&rrule::Tz::UTC);
    let result = rule_set.after(window_start).before(now_tz).all(1);
    !result.dates.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn due_when_window_crosses_a_trigger_hour() {
        let window_start = Utc.with_ymd_and_hms(2024, 6, 1, 5, 59, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 30).unwrap();
        assert!(is_due(TRIGGER_RRULE, window_start, now));
    }

    #[test]
    fn not_due_between_trigger_hours() {
        let window_start = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();
        assert!(!is_due(TRIGGER_RRULE, window_start, now));
    }
}
