use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Zagreb;
use reqwest::Client;

use crate::model_manager::Plant;
use crate::time::quantize_to_hour;

use super::models::{Minutely15, OpenMeteoResponse, WeatherForecast, WeatherPoint, CHANNELS};

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Typed read client for the Open-Meteo 15-minute forecast. All requests use
/// a fixed `Europe/Zagreb` timezone identifier; no plant in the source fleet
/// lives outside it, and nothing downstream is timezone-aware.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(http: Client, base_url: String, timeout_seconds: u64) -> Self {
        Self {
            http,
            base_url,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Fetches a 72h, 15-minute-resolution forecast for `plant`, starting at
    /// the current hour. Returns `None` on any network, status, or parse
    /// failure so the caller can skip this plant without aborting the run.
    pub async fn fetch(&self, plant: &Plant, now: DateTime<Utc>) -> Option<WeatherForecast> {
        let (latitude, longitude) = (plant.latitude?, plant.longitude?);
        let start = quantize_to_hour(now);
        let end = start + chrono::Duration::hours(72);

        let start_local = start.with_timezone(&Zagreb).format(LOCAL_TIME_FORMAT).to_string();
        let end_local = end.with_timezone(&Zagreb).format(LOCAL_TIME_FORMAT).to_string();
        let channels = CHANNELS.join(",");

        let response = match self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("minutely_15", channels),
                ("start_minutely_15", start_local),
                ("end_minutely_15", end_local),
                ("timezone", "Europe/Zagreb".to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, plant_id = plant.id, "weather fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), plant_id = plant.id, "weather provider returned error status");
            return None;
        }

        let body = match response.json::<OpenMeteoResponse>().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, plant_id = plant.id, "weather response decode failed");
                return None;
            }
        };

        let mut points = match parse_points(&body.minutely_15) {
            Ok(points) => points,
            Err(err) => {
                tracing::warn!(error = %err, plant_id = plant.id, "weather response had unparseable timestamps");
                return None;
            }
        };

        // The provider's first sample coincides with the cycle itself
        // (horizon=0); drop it so every persisted point has a positive horizon.
        if !points.is_empty() {
            points.remove(0);
        }

        Some(WeatherForecast {
            plant_id: plant.id,
            latitude,
            longitude,
            timezone: "Europe/Zagreb".to_string(),
            elevation: body.elevation.or(plant.elevation),
            fetch_time: start,
            points,
        })
    }
}

fn parse_points(data: &Minutely15) -> Result<Vec<WeatherPoint>, chrono::ParseError> {
    let mut points = Vec::with_capacity(data.time.len());
    for (i, time_str) in data.time.iter().enumerate() {
        let naive = NaiveDateTime::parse_from_str(time_str, LOCAL_TIME_FORMAT)?;
        let time = Zagreb
            .from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive));

        points.push(WeatherPoint {
            time,
            temperature_2m: at(&data.temperature_2m, i),
            relative_humidity_2m: at(&data.relative_humidity_2m, i),
            cloud_cover_low: at(&data.cloud_cover_low, i),
            cloud_cover_mid: at(&data.cloud_cover_mid, i),
            cloud_cover: at(&data.cloud_cover, i),
            wind_speed_10m: at(&data.wind_speed_10m, i),
            wind_direction_10m: at(&data.wind_direction_10m, i),
            shortwave_radiation: at(&data.shortwave_radiation, i),
            diffuse_radiation: at(&data.diffuse_radiation, i),
            direct_normal_irradiance: at(&data.direct_normal_irradiance, i),
            shortwave_radiation_instant: at(&data.shortwave_radiation_instant, i),
            diffuse_radiation_instant: at(&data.diffuse_radiation_instant, i),
            direct_radiation_instant: at(&data.direct_radiation_instant, i),
            et0_fao_evapotranspiration: at(&data.et0_fao_evapotranspiration, i),
            vapour_pressure_deficit: at(&data.vapour_pressure_deficit, i),
            is_day: at(&data.is_day, i),
            sunshine_duration: at(&data.sunshine_duration, i),
        });
    }
    Ok(points)
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutely_15_arrays_into_points() {
        let data = Minutely15 {
            time: vec!["2024-06-01T00:00".to_string(), "2024-06-01T00:15".to_string()],
            shortwave_radiation: vec![Some(1.0), Some(2.0)],
            ..Default::default()
        };
        let points = parse_points(&data).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].shortwave_radiation, Some(1.0));
        assert_eq!(points[1].shortwave_radiation, Some(2.0));
    }
}
