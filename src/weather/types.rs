use serde::{Deserialize, Serialize};

use crate::utils::LocalTime;

/// Where to look the weather up.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    City(String),
    Coords { lat: f64, lon: f64 },
}

impl Location {
    pub fn cache_key(&self) -> String {
        match self {
            Location::City(city) => format!("city:{}", city),
            Location::Coords { lat, lon } => format!("coords:{},{}", lat, lon),
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Location::City(city) => vec![("q", city.clone())],
            Location::Coords { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub temp: i64,
    pub condition: String,
    pub alert: String,
    /// Offset from UTC in seconds.
    pub timezone: i32,
    pub forecast: Vec<DailyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: String,
    pub temp: i64,
    pub condition: String,
}

/// Weather report plus the city's wall-clock time at the moment of the
/// request. The clock is never cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResponse {
    #[serde(flatten)]
    pub report: WeatherReport,
    pub local_time: LocalTime,
}

// OpenWeather wire format

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    pub name: String,
    pub main: WeatherMain,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    pub timezone: i32,
    #[serde(default)]
    pub alerts: Vec<WeatherAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: i32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub cnt: i32,
    pub list: Vec<ForecastItem>,
    pub city: ForecastCity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub main: WeatherMain,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    pub pop: Option<f64>,
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    pub country: Option<String>,
    pub timezone: i32,
}
