//! # Open-Meteo Weather Source
//!
//! Fetches current conditions from the Open-Meteo forecast endpoint and maps the
//! WMO weather code into a condition label and an icon key.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;
use crate::model::WeatherReading;
use crate::retrieve::ApiClient;
use crate::sources::SourceClient;

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m";

/// `current` block of the forecast response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenMeteoCurrent {
    pub time: Option<String>,
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub weather_code: Option<u16>,
    pub wind_speed_10m: Option<f64>,
}

/// Raw forecast response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenMeteoResponse {
    pub current: Option<OpenMeteoCurrent>,
}

/// Client for one fixed location.
pub struct OpenMeteoClient {
    api: ApiClient,
    latitude: f64,
    longitude: f64,
    location: String,
    temperature_unit: String,
}

impl OpenMeteoClient {
    pub fn new(
        api: ApiClient,
        latitude: f64,
        longitude: f64,
        location: impl Into<String>,
        temperature_unit: impl Into<String>,
    ) -> Self {
        Self {
            api,
            latitude,
            longitude,
            location: location.into(),
            temperature_unit: temperature_unit.into(),
        }
    }
}

#[async_trait]
impl SourceClient for OpenMeteoClient {
    type Raw = OpenMeteoResponse;
    type Record = WeatherReading;

    fn name(&self) -> &'static str {
        "weather"
    }

    async fn fetch_raw(&self) -> Result<OpenMeteoResponse, SourceError> {
        let query = [
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("temperature_unit", self.temperature_unit.clone()),
            ("timezone", "auto".to_string()),
        ];
        self.api.get_json("v1/forecast", &query).await
    }

    fn parse(&self, raw: OpenMeteoResponse) -> Result<WeatherReading, SourceError> {
        map_reading(&self.location, raw)
    }
}

/// Pure mapper from the raw response.
pub fn map_reading(location: &str, raw: OpenMeteoResponse) -> Result<WeatherReading, SourceError> {
    let current = raw
        .current
        .ok_or_else(|| SourceError::Decode("response has no 'current' block".to_string()))?;
    let (condition, icon) = describe_code(current.weather_code);

    Ok(WeatherReading {
        location: location.to_string(),
        temperature: current.temperature_2m,
        apparent_temperature: current.apparent_temperature,
        humidity: current.relative_humidity_2m,
        wind_speed: current.wind_speed_10m,
        condition: condition.to_string(),
        icon: icon.to_string(),
        observed_at: current.time,
    })
}

/// WMO weather interpretation codes.
fn describe_code(code: Option<u16>) -> (&'static str, &'static str) {
    match code {
        Some(0) => ("Clear", "clear"),
        Some(1..=2) => ("Partly cloudy", "partly-cloudy"),
        Some(3) => ("Overcast", "cloudy"),
        Some(45 | 48) => ("Fog", "fog"),
        Some(51..=57) => ("Drizzle", "drizzle"),
        Some(61..=67) | Some(80..=82) => ("Rain", "rain"),
        Some(71..=77) | Some(85..=86) => ("Snow", "snow"),
        Some(95..=99) => ("Thunderstorm", "thunderstorm"),
        _ => ("Unknown", "unknown"),
    }
}
