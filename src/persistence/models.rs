use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::weather::{WeatherForecast, WeatherPoint};

/// One row destined for `weather_forecasts`. Flattened out of a
/// `WeatherForecast`/`WeatherPoint` pair so the writer task doesn't need to
/// know about the in-memory forecast shape.
#[derive(Debug, Clone)]
pub struct ForecastRow {
    pub forecast_time: DateTime<Utc>,
    pub plant_id: i64,
    pub created_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub point: WeatherPoint,
}

impl ForecastRow {
    pub fn rows_for(forecast: &WeatherForecast) -> Vec<ForecastRow> {
        forecast
            .points
            .iter()
            .map(|point| ForecastRow {
                forecast_time: point.time,
                plant_id: forecast.plant_id,
                created_at: forecast.fetch_time,
                latitude: forecast.latitude,
                longitude: forecast.longitude,
                elevation: forecast.elevation,
                point: point.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PredictionRow {
    pub prediction_time: DateTime<Utc>,
    pub model_id: i64,
    pub created_at: DateTime<Utc>,
    pub predicted_power: f64,
    pub horizon: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PowerReadingRow {
    pub timestamp: DateTime<Utc>,
    pub plant_id: i64,
    pub power_w: f64,
}

/// The error-metric kind, shared in meaning across the two metric surfaces
/// but bound to two distinct Postgres enum types (`horizon_metric_type`,
/// `cycle_metric_type`) so each table keeps its own declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Mae,
    Rmse,
    Mbe,
}

impl MetricType {
    pub const ALL: [MetricType; 3] = [MetricType::Mae, MetricType::Rmse, MetricType::Mbe];
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricType::Mae => "MAE",
            MetricType::Rmse => "RMSE",
            MetricType::Mbe => "MBE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "horizon_metric_type", rename_all = "UPPERCASE")]
pub enum HorizonMetricTypeSql {
    Mae,
    Rmse,
    Mbe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "cycle_metric_type", rename_all = "UPPERCASE")]
pub enum CycleMetricTypeSql {
    Mae,
    Rmse,
    Mbe,
}

impl From<MetricType> for HorizonMetricTypeSql {
    fn from(m: MetricType) -> Self {
        match m {
            MetricType::Mae => Self::Mae,
            MetricType::Rmse => Self::Rmse,
            MetricType::Mbe => Self::Mbe,
        }
    }
}

impl From<HorizonMetricTypeSql> for MetricType {
    fn from(m: HorizonMetricTypeSql) -> Self {
        match m {
            HorizonMetricTypeSql::Mae => Self::Mae,
            HorizonMetricTypeSql::Rmse => Self::Rmse,
            HorizonMetricTypeSql::Mbe => Self::Mbe,
        }
    }
}

impl From<MetricType> for CycleMetricTypeSql {
    fn from(m: MetricType) -> Self {
        match m {
            MetricType::Mae => Self::Mae,
            MetricType::Rmse => Self::Rmse,
            MetricType::Mbe => Self::Mbe,
        }
    }
}

impl From<CycleMetricTypeSql> for MetricType {
    fn from(m: CycleMetricTypeSql) -> Self {
        match m {
            CycleMetricTypeSql::Mae => Self::Mae,
            CycleMetricTypeSql::Rmse => Self::Rmse,
            CycleMetricTypeSql::Mbe => Self::Mbe,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HorizonMetricRow {
    pub model_id: i64,
    pub metric_type: MetricType,
    pub horizon: f64,
    pub value: f64,
}

impl FromRow<'_, sqlx::postgres::PgRow> for HorizonMetricRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            model_id: row.try_get("model_id")?,
            metric_type: row.try_get::<HorizonMetricTypeSql, _>("metric_type")?.into(),
            horizon: row.try_get("horizon")?,
            value: row.try_get("value")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CycleMetricRow {
    pub time_of_forecast: DateTime<Utc>,
    pub model_id: i64,
    pub metric_type: MetricType,
    pub value: f64,
}

impl FromRow<'_, sqlx::postgres::PgRow> for CycleMetricRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            time_of_forecast: row.try_get("time_of_forecast")?,
            model_id: row.try_get("model_id")?,
            metric_type: row.try_get::<CycleMetricTypeSql, _>("metric_type")?.into(),
            value: row.try_get("value")?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PredictionReadingJoinRow {
    pub prediction_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub predicted_power: f64,
    pub horizon: f64,
    pub power_w: f64,
}
