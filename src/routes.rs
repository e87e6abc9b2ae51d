use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use crate::{
    cache::{CacheStats, NewsCache},
    geolocation::IpApiClient,
    news::{
        newsapi::{NewsApiClient, NewsApiError},
        types::{ArticleDetail, NewsArticle, NewsQueryOptions},
    },
    upstream::UpstreamError,
    utils::{format_time_for_timezone, search_suggestions, ErrorResponse, SearchSuggestion},
    weather::{
        openweather::{OpenWeatherClient, WeatherError},
        types::{Location, WeatherResponse},
        WeatherCache,
    },
};

const HEADLINES_KEY: &str = "headlines";
const ALL_NEWS_KEY: &str = "all-news";
const ALL_NEWS_PAGE_SIZE: u32 = 30;
const ARTICLE_LOOKUP_PAGE_SIZE: u32 = 100;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub news_cache: Arc<NewsCache>,
    pub weather_cache: WeatherCache,
    pub news_client: Arc<NewsApiClient>,
    pub weather_client: Arc<OpenWeatherClient>,
    pub geo_client: Arc<IpApiClient>,
}

/// Handler error, rendered as `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<NewsApiError> for ApiError {
    fn from(err: NewsApiError) -> Self {
        let status = match &err {
            NewsApiError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            NewsApiError::InsufficientArticles | NewsApiError::NoArticles => StatusCode::NOT_FOUND,
            NewsApiError::Upstream { .. } | NewsApiError::JsonParsing(_) => StatusCode::BAD_GATEWAY,
        };
        if status == StatusCode::NOT_FOUND {
            tracing::warn!("News request returned nothing usable: {}", err);
        } else {
            tracing::error!("News request failed: {}", err);
        }
        Self::new(status, err.user_message())
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        let status = match &err {
            WeatherError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            WeatherError::InvalidCoordinates(_) => StatusCode::BAD_REQUEST,
            WeatherError::Upstream {
                source: UpstreamError::Status { status, .. },
                ..
            } if status.as_u16() == 404 => StatusCode::NOT_FOUND,
            WeatherError::Upstream { .. } | WeatherError::JsonParsing(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::error!("Weather request failed: {}", err);
        Self::new(status, err.user_message())
    }
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct ArticleQuery {
    #[serde(rename = "fromSearch")]
    pub from_search: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheQuery {
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct GeolocationResponse {
    pub city: Option<String>,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Serves `key` from the query index, falling back to `fetch` and caching a
/// successful result.
async fn cached_or_fetch<F, Fut>(
    cache: &NewsCache,
    key: &str,
    fetch: F,
) -> Result<Vec<NewsArticle>, NewsApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<NewsArticle>, NewsApiError>>,
{
    if let Some(articles) = cache.get_query_result(key) {
        tracing::debug!(key, "News cache hit");
        return Ok(articles);
    }

    tracing::debug!(key, "News cache miss, fetching upstream");
    let articles = fetch().await?;
    cache.put_query_result(key, &articles);
    Ok(articles)
}

pub async fn get_headlines(State(state): State<AppState>) -> Result<Json<Vec<NewsArticle>>, ApiError> {
    let articles = cached_or_fetch(&state.news_cache, HEADLINES_KEY, || {
        state.news_client.top_headlines(None)
    })
    .await?;
    Ok(Json(articles))
}

pub async fn get_all_news(State(state): State<AppState>) -> Result<Json<Vec<NewsArticle>>, ApiError> {
    let options = NewsQueryOptions::with_page_size(ALL_NEWS_PAGE_SIZE);
    let articles = cached_or_fetch(&state.news_cache, ALL_NEWS_KEY, || {
        state.news_client.all_news("", &options)
    })
    .await?;
    Ok(Json(articles))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<NewsArticle>>, ApiError> {
    let query = match params.query {
        Some(query) if !query.is_empty() => query,
        _ => return Err(ApiError::bad_request("Please enter a search query")),
    };

    let options = NewsQueryOptions::default();
    let articles = cached_or_fetch(&state.news_cache, &query, || {
        state.news_client.search_news(&query, &options)
    })
    .await?;
    Ok(Json(articles))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ArticleQuery>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let from_search = params.from_search.as_deref().is_some_and(|v| !v.is_empty());

    if let (true, Some(query)) = (from_search, params.q.as_deref()) {
        let hit = state
            .news_cache
            .get_query_result(query)
            .and_then(|results| results.into_iter().find(|a| a.id == id));
        if let Some(article) = hit {
            return Ok(Json(article.into()));
        }
    }

    if let Some(article) = state.news_cache.get_article(&id) {
        return Ok(Json(article.into()));
    }

    let article = find_upstream_article(&state.news_client, &id)
        .await
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    state.news_cache.put_article(article.clone());
    Ok(Json(article.into()))
}

/// Scans the headlines, then a large general listing, for `id`.
async fn find_upstream_article(client: &NewsApiClient, id: &str) -> Option<NewsArticle> {
    match client.top_headlines(None).await {
        Ok(articles) => {
            if let Some(article) = articles.into_iter().find(|a| a.id == id) {
                return Some(article);
            }
        }
        Err(e) => tracing::warn!("Headline lookup for article {} failed: {}", id, e),
    }

    let options = NewsQueryOptions::with_page_size(ARTICLE_LOOKUP_PAGE_SIZE);
    match client.all_news("", &options).await {
        Ok(articles) => articles.into_iter().find(|a| a.id == id),
        Err(e) => {
            tracing::warn!("Listing lookup for article {} failed: {}", id, e);
            None
        }
    }
}

pub async fn get_search_suggestions(Query(params): Query<SuggestionQuery>) -> Json<Vec<SearchSuggestion>> {
    Json(search_suggestions(params.q.as_deref().unwrap_or_default()))
}

pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let location = weather_location(params)?;
    weather_for(&state, location).await
}

pub async fn get_weather_for_caller(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WeatherResponse>, ApiError> {
    let city = state
        .geo_client
        .city_by_ip(client_ip(&headers))
        .await
        .ok_or_else(|| ApiError::not_found("Could not detect city"))?;

    weather_for(&state, Location::City(city)).await
}

pub async fn get_geolocation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<GeolocationResponse> {
    let city = state.geo_client.city_by_ip(client_ip(&headers)).await;
    Json(GeolocationResponse { city })
}

fn weather_location(params: WeatherQuery) -> Result<Location, ApiError> {
    if let Some(city) = params.city.filter(|c| !c.is_empty()) {
        return Ok(Location::City(city));
    }

    match (params.lat, params.lon) {
        (Some(lat), Some(lon)) if !lat.is_empty() && !lon.is_empty() => {
            let lat = lat.trim().parse::<f64>();
            let lon = lon.trim().parse::<f64>();
            match (lat, lon) {
                (Ok(lat), Ok(lon)) => Ok(Location::Coords { lat, lon }),
                _ => Err(ApiError::bad_request("Invalid coordinates")),
            }
        }
        _ => Err(ApiError::bad_request("Missing city or coordinates")),
    }
}

async fn weather_for(state: &AppState, location: Location) -> Result<Json<WeatherResponse>, ApiError> {
    let key = location.cache_key();

    let report = match state.weather_cache.get(&key).await {
        Some(report) => {
            tracing::debug!(key = %key, "Weather cache hit");
            report
        }
        None => {
            let report = state.weather_client.get_weather(&location).await?;
            state.weather_cache.insert(key, report.clone()).await;
            report
        }
    };

    let local_time = format_time_for_timezone(report.timezone, chrono::Utc::now());
    Ok(Json(WeatherResponse { report, local_time }))
}

/// First public address from the proxy headers. Loopback and private
/// addresses are dropped so the lookup falls back to the server's own IP.
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());

    forwarded
        .or(real_ip)
        .and_then(|raw| raw.trim().parse::<IpAddr>().ok())
        .filter(is_public)
}

fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(&v4),
            None => {
                let first = v6.segments()[0];
                // fe80::/10 link-local, fc00::/7 unique-local
                let link_local = first & 0xffc0 == 0xfe80;
                let unique_local = first & 0xfe00 == 0xfc00;
                !(v6.is_loopback() || v6.is_unspecified() || link_local || unique_local)
            }
        },
    }
}

fn is_public_v4(v4: &Ipv4Addr) -> bool {
    !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified())
}

pub async fn get_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.news_cache.stats())
}

pub async fn get_cached_articles(State(state): State<AppState>) -> Json<Vec<NewsArticle>> {
    Json(state.news_cache.all_articles())
}

pub async fn clear_cache(
    State(state): State<AppState>,
    Query(params): Query<ClearCacheQuery>,
) -> Result<Json<CacheStats>, ApiError> {
    match params.scope.as_deref().unwrap_or("all") {
        "articles" => state.news_cache.clear_articles(),
        "queries" => state.news_cache.clear_query_index(),
        "all" => state.news_cache.clear_all(),
        other => return Err(ApiError::bad_request(format!("Unknown cache scope: {}", other))),
    }

    tracing::info!(scope = params.scope.as_deref().unwrap_or("all"), "News cache cleared");
    Ok(Json(state.news_cache.stats()))
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/news/headlines", get(get_headlines))
        .route("/api/news/all", get(get_all_news))
        .route("/api/news/:id", get(get_article))
        .route("/api/search-result", get(search))
        .route("/api/search-suggestions", get(get_search_suggestions))
        .route("/api/weather", get(get_weather))
        .route("/api/weather/auto", get(get_weather_for_caller))
        .route("/api/geolocation", get(get_geolocation))
        .route("/api/cache", delete(clear_cache))
        .route("/api/cache/stats", get(get_cache_stats))
        .route("/api/cache/articles", get(get_cached_articles))
        .with_state(state)
}
