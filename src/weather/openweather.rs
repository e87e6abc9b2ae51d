use super::types::*;
use crate::config::Config;
use crate::upstream::{build_client, get_json_with_retry, UpstreamError};
use crate::utils::validate_coordinates;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

const NETWORK_ERROR: &str = "Network error or API unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Current => write!(f, "Weather"),
            Endpoint::Forecast => write!(f, "Forecast"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("API configuration error. Please contact support.")]
    MissingApiKey,
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("{endpoint} API request failed: {source}")]
    Upstream {
        endpoint: Endpoint,
        by_coords: bool,
        #[source]
        source: UpstreamError,
    },
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
}

impl WeatherError {
    /// Message safe to hand to the front end.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Upstream {
                endpoint,
                by_coords,
                source: source @ UpstreamError::Status { .. },
            } => source
                .upstream_message()
                .map(str::to_string)
                .unwrap_or_else(|| {
                    let subject = if *by_coords { "coordinates" } else { "city name" };
                    format!("{} API failed. Check {} or API key.", endpoint, subject)
                }),
            WeatherError::Upstream { .. } | WeatherError::JsonParsing(_) => NETWORK_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = build_client(config.upstream_timeout)?;
        Ok(Self { client, config })
    }

    /// Current conditions plus a daily forecast for `location`. Both
    /// OpenWeather calls run concurrently; either failing fails the report.
    pub async fn get_weather(&self, location: &Location) -> Result<WeatherReport, WeatherError> {
        if let Location::Coords { lat, lon } = location {
            validate_coordinates(*lat, *lon).map_err(WeatherError::InvalidCoordinates)?;
        }

        let (current, forecast) = tokio::try_join!(
            self.get_current(location),
            self.get_forecast(location)
        )?;

        Ok(WeatherReport::from_responses(&current, &forecast))
    }

    pub async fn get_current(&self, location: &Location) -> Result<CurrentWeatherResponse, WeatherError> {
        self.fetch(Endpoint::Current, &self.config.openweather_weather_path, location)
            .await
    }

    pub async fn get_forecast(&self, location: &Location) -> Result<ForecastResponse, WeatherError> {
        self.fetch(Endpoint::Forecast, &self.config.openweather_forecast_path, location)
            .await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        location: &Location,
    ) -> Result<T, WeatherError> {
        let api_key = self
            .config
            .openweather_api_key
            .as_deref()
            .ok_or(WeatherError::MissingApiKey)?;

        let url = format!(
            "{}{}",
            self.config.openweather_base_url.trim_end_matches('/'),
            path
        );

        let mut params = location.query_params();
        params.push(("units", "metric".to_string()));
        params.push(("appid", api_key.to_string()));
        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let json = get_json_with_retry(&self.client, &url, &query)
            .await
            .map_err(|source| WeatherError::Upstream {
                endpoint,
                by_coords: matches!(location, Location::Coords { .. }),
                source,
            })?;

        Ok(serde_json::from_value(json)?)
    }
}
