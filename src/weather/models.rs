use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One 15-minute-aligned weather sample. Channels are nullable because the
/// provider omits some of them for some locations.
#[derive(Debug, Clone, Default)]
pub struct WeatherPoint {
    pub time: DateTime<Utc>,
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub cloud_cover_low: Option<f64>,
    pub cloud_cover_mid: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub shortwave_radiation: Option<f64>,
    pub diffuse_radiation: Option<f64>,
    pub direct_normal_irradiance: Option<f64>,
    pub shortwave_radiation_instant: Option<f64>,
    pub diffuse_radiation_instant: Option<f64>,
    pub direct_radiation_instant: Option<f64>,
    pub et0_fao_evapotranspiration: Option<f64>,
    pub vapour_pressure_deficit: Option<f64>,
    pub is_day: Option<f64>,
    pub sunshine_duration: Option<f64>,
}

/// A fetched 72h forecast for one plant. `fetch_time` is the cycle
/// identifier shared by every prediction derived from it.
#[derive(Debug, Clone)]
pub struct WeatherForecast {
    pub plant_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub elevation: Option<f64>,
    pub fetch_time: DateTime<Utc>,
    pub points: Vec<WeatherPoint>,
}

/// The channel list requested from Open-Meteo's `minutely_15` block, in the
/// order the provider is asked to return parallel arrays for.
pub const CHANNELS: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover",
    "wind_speed_10m",
    "wind_direction_10m",
    "shortwave_radiation",
    "diffuse_radiation",
    "direct_normal_irradiance",
    "shortwave_radiation_instant",
    "diffuse_radiation_instant",
    "direct_radiation_instant",
    "et0_fao_evapotranspiration",
    "vapour_pressure_deficit",
    "is_day",
    "sunshine_duration",
];

#[derive(Debug, Deserialize)]
pub struct OpenMeteoResponse {
    pub elevation: Option<f64>,
    pub minutely_15: Minutely15,
}

#[derive(Debug, Deserialize, Default)]
pub struct Minutely15 {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover_low: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover_mid: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub shortwave_radiation: Vec<Option<f64>>,
    #[serde(default)]
    pub diffuse_radiation: Vec<Option<f64>>,
    #[serde(default)]
    pub direct_normal_irradiance: Vec<Option<f64>>,
    #[serde(default)]
    pub shortwave_radiation_instant: Vec<Option<f64>>,
    #[serde(default)]
    pub diffuse_radiation_instant: Vec<Option<f64>>,
    #[serde(default)]
    pub direct_radiation_instant: Vec<Option<f64>>,
    #[serde(default)]
    pub et0_fao_evapotranspiration: Vec<Option<f64>>,
    #[serde(default)]
    pub vapour_pressure_deficit: Vec<Option<f64>>,
    #[serde(default)]
    pub is_day: Vec<Option<f64>>,
    #[serde(default)]
    pub sunshine_duration: Vec<Option<f64>>,
}
