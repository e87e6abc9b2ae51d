use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheSettings, DEFAULT_ARTICLE_CAPACITY, DEFAULT_QUERY_CAPACITY, DEFAULT_QUERY_TTL};

#[derive(Clone, Debug)]
pub struct Config {
    pub newsapi_key: Option<String>,
    pub newsapi_base_url: String,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub openweather_weather_path: String,
    pub openweather_forecast_path: String,
    pub ipapi_base_url: String,
    pub upstream_timeout: Duration,
    pub bind_addr: String,
    pub news_cache: CacheSettings,
    pub weather_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank API keys count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let secret = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            newsapi_key: secret("NEWSAPI_KEY"),
            newsapi_base_url: string_or("NEWSAPI_BASE_URL", "https://newsapi.org"),
            openweather_api_key: secret("OPENWEATHER_API_KEY"),
            openweather_base_url: string_or("OPENWEATHER_BASE_URL", "https://api.openweathermap.org"),
            openweather_weather_path: string_or("OPENWEATHER_WEATHER_PATH", "/data/2.5/weather"),
            openweather_forecast_path: string_or("OPENWEATHER_FORECAST_PATH", "/data/2.5/forecast"),
            ipapi_base_url: string_or("IPAPI_BASE_URL", "https://ipapi.co"),
            upstream_timeout: Duration::from_secs(parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 30)?),
            bind_addr: string_or("BIND_ADDR", "0.0.0.0:8080"),
            news_cache: CacheSettings {
                article_capacity: parse_or(&lookup, "NEWS_CACHE_ARTICLE_CAPACITY", DEFAULT_ARTICLE_CAPACITY)?,
                query_capacity: parse_or(&lookup, "NEWS_CACHE_QUERY_CAPACITY", DEFAULT_QUERY_CAPACITY)?,
                query_ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "NEWS_CACHE_QUERY_TTL_SECS",
                    DEFAULT_QUERY_TTL.as_secs(),
                )?),
            },
            weather_cache_ttl: Duration::from_secs(parse_or(&lookup, "WEATHER_CACHE_TTL_SECS", 600)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is not valid: {}", name, e)),
        None => Ok(default),
    }
}
