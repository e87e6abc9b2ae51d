use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod geolocation;
mod news;
mod routes;
mod upstream;
mod utils;
mod weather;

use cache::NewsCache;
use config::Config;
use geolocation::IpApiClient;
use news::newsapi::NewsApiClient;
use routes::{create_router, AppState};
use weather::openweather::OpenWeatherClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_weather_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    if config.newsapi_key.is_none() {
        tracing::warn!("NEWSAPI_KEY is not set; news endpoints will answer 503 until it is configured");
    }
    if config.openweather_api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY is not set; weather endpoints will answer 503 until it is configured");
    }

    let news_cache = Arc::new(NewsCache::new(config.news_cache));
    let weather_cache = weather::init_cache(config.weather_cache_ttl);

    let news_client = Arc::new(NewsApiClient::new(&config)?);
    let geo_client = Arc::new(IpApiClient::new(&config)?);
    let weather_client = Arc::new(OpenWeatherClient::new(config.clone())?);

    let state = AppState {
        news_cache,
        weather_cache,
        news_client,
        weather_client,
        geo_client,
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
