pub mod forecast;
pub mod openweather;
pub mod types;

use moka::future::Cache;
use std::time::Duration;
use types::WeatherReport;

/// Weather reports keyed by [`types::Location::cache_key`].
pub type WeatherCache = Cache<String, WeatherReport>;

pub fn init_cache(ttl: Duration) -> WeatherCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(ttl)
        .build()
}
