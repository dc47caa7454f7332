use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Datelike, Timelike};

use crate::error::PipelineError;
use crate::weather::{WeatherForecast, WeatherPoint};

/// Plant-level context available to every feature in a request, independent
/// of the weather point being resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlantContext {
    pub capacity: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
}

type Resolver = fn(&WeatherPoint, &PlantContext) -> Option<f64>;

fn weather_table() -> &'static HashMap<&'static str, Resolver> {
    static TABLE: OnceLock<HashMap<&'static str, Resolver>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static str, Resolver> = HashMap::new();
        m.insert("temperature_2m", |p, _| p.temperature_2m);
        m.insert("relative_humidity_2m", |p, _| p.relative_humidity_2m);
        m.insert("cloud_cover_low", |p, _| p.cloud_cover_low);
        m.insert("cloud_cover_mid", |p, _| p.cloud_cover_mid);
        m.insert("cloud_cover", |p, _| p.cloud_cover);
        m.insert("wind_speed_10m", |p, _| p.wind_speed_10m);
        m.insert("wind_direction_10m", |p, _| p.wind_direction_10m);
        m.insert("shortwave_radiation", |p, _| p.shortwave_radiation);
        m.insert("diffuse_radiation", |p, _| p.diffuse_radiation);
        m.insert("direct_normal_irradiance", |p, _| p.direct_normal_irradiance);
        m.insert("shortwave_radiation_instant", |p, _| p.shortwave_radiation_instant);
        m.insert("diffuse_radiation_instant", |p, _| p.diffuse_radiation_instant);
        m.insert("direct_radiation_instant", |p, _| p.direct_radiation_instant);
        m.insert("et0_fao_evapotranspiration", |p, _| p.et0_fao_evapotranspiration);
        m.insert("vapour_pressure_deficit", |p, _| p.vapour_pressure_deficit);
        m.insert("is_day", |p, _| p.is_day);
        m.insert("sunshine_duration", |p, _| p.sunshine_duration);
        m
    })
}

fn time_table() -> &'static HashMap<&'static str, Resolver> {
    static TABLE: OnceLock<HashMap<&'static str, Resolver>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static str, Resolver> = HashMap::new();
        m.insert("hour", |p, _| Some(p.time.hour() as f64));
        m.insert("month", |p, _| Some(p.time.month() as f64));
        m.insert("day", |p, _| Some(p.time.day() as f64));
        m.insert("day_of_year", |p, _| Some(p.time.ordinal() as f64));
        m.insert("week_of_year", |p, _| Some(p.time.iso_week().week() as f64));
        m.insert("day_of_week", |p, _| Some(p.time.weekday().num_days_from_monday() as f64));
        // Trig features apply sin/cos to the raw hour (0..23) / month (1..12)
        // values, not normalized radians; models were trained against that.
        m.insert("hour_sin", |p, _| Some((p.time.hour() as f64).sin()));
        m.insert("hour_cos", |p, _| Some((p.time.hour() as f64).cos()));
        m.insert("month_sin", |p, _| Some((p.time.month() as f64).sin()));
        m.insert("month_cos", |p, _| Some((p.time.month() as f64).cos()));
        m.insert("datetime", |p, _| Some(p.time.timestamp() as f64));
        m
    })
}

fn context_table() -> &'static HashMap<&'static str, Resolver> {
    static TABLE: OnceLock<HashMap<&'static str, Resolver>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static str, Resolver> = HashMap::new();
        m.insert("capacity", |_, c| c.capacity);
        m.insert("latitude", |_, c| c.latitude);
        m.insert("longitude", |_, c| c.longitude);
        m.insert("elevation", |_, c| c.elevation);
        m
    })
}

fn lookup(name: &str) -> Option<Resolver> {
    weather_table()
        .get(name)
        .or_else(|| time_table().get(name))
        .or_else(|| context_table().get(name))
        .copied()
}

/// Builds a feature matrix with one row per forecast point, one column per
/// requested feature name, in the requested order. Validates the full
/// feature list up front; any unresolvable name aborts the whole matrix.
pub fn prepare(
    forecast: &WeatherForecast,
    features: &[String],
    context: PlantContext,
) -> Result<Vec<Vec<f64>>, PipelineError> {
    let resolvers: Vec<Resolver> = features
        .iter()
        .map(|name| {
            lookup(name).ok_or_else(|| PipelineError::UnsupportedFeature(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    Ok(forecast
        .points
        .iter()
        .map(|point| {
            resolvers
                .iter()
                .zip(features)
                .map(|(resolve, name)| match resolve(point, &context) {
                    Some(value) => value,
                    None => {
                        tracing::debug!(feature = %name, "feature resolved to null, substituting 0.0");
                        0.0
                    }
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_forecast() -> WeatherForecast {
        WeatherForecast {
            plant_id: 1,
            latitude: 45.8,
            longitude: 15.9,
            timezone: "Europe/Zagreb".to_string(),
            elevation: Some(100.0),
            fetch_time: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            points: vec![WeatherPoint {
                time: Utc.with_ymd_and_hms(2024, 6, 1, 0, 15, 0).unwrap(),
                shortwave_radiation: Some(42.0),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn resolves_weather_time_and_context_features_in_order() {
        let forecast = sample_forecast();
        let features = vec![
            "shortwave_radiation".to_string(),
            "hour".to_string(),
            "capacity".to_string(),
        ];
        let context = PlantContext {
            capacity: Some(1000.0),
            ..Default::default()
        };
        let matrix = prepare(&forecast, &features, context).unwrap();
        assert_eq!(matrix, vec![vec![42.0, 0.0, 1000.0]]);
    }

    #[test]
    fn missing_weather_channel_substitutes_zero() {
        let forecast = sample_forecast();
        let features = vec!["temperature_2m".to_string()];
        let matrix = prepare(&forecast, &features, PlantContext::default()).unwrap();
        assert_eq!(matrix, vec![vec![0.0]]);
    }

    #[test]
    fn unknown_feature_name_is_unsupported() {
        let forecast = sample_forecast();
        let features = vec!["made_up_feature".to_string()];
        let err = prepare(&forecast, &features, PlantContext::default()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFeature(_)));
    }

    #[test]
    fn matrix_preparation_is_deterministic() {
        let forecast = sample_forecast();
        let features = vec!["shortwave_radiation".to_string(), "month_sin".to_string()];
        let context = PlantContext {
            capacity: Some(500.0),
            ..Default::default()
        };
        let a = prepare(&forecast, &features, context).unwrap();
        let b = prepare(&forecast, &features, context).unwrap();
        assert_eq!(a, b);
    }
}
