use super::ids::generate_id_from_url;
use super::types::*;
use crate::config::Config;
use crate::upstream::{build_client, get_json_with_retry, UpstreamError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use thiserror::Error;

pub const DEFAULT_HEADLINE_SOURCES: &str = "bbc-news,cnn,reuters,associated-press,the-verge";

const TOP_HEADLINES_PATH: &str = "/v2/top-headlines";
const EVERYTHING_PATH: &str = "/v2/everything";

const NETWORK_ERROR: &str = "Network error or API unavailable. Please try again later.";
const SEARCH_NETWORK_ERROR: &str = "Network error or API unavailable";

#[derive(Error, Debug)]
pub enum NewsApiError {
    #[error("API key not configured")]
    MissingApiKey,
    #[error("News API request failed: {source}")]
    Upstream {
        search: bool,
        #[source]
        source: UpstreamError,
    },
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("Insufficient valid news articles available.")]
    InsufficientArticles,
    #[error("No articles found")]
    NoArticles,
}

impl NewsApiError {
    /// Message safe to hand to the front end.
    pub fn user_message(&self) -> String {
        match self {
            NewsApiError::Upstream {
                source: UpstreamError::Status { status, message },
                ..
            } => message
                .clone()
                .unwrap_or_else(|| format!("News API failed with status {}", status.as_u16())),
            NewsApiError::Upstream { search: true, .. } => SEARCH_NETWORK_ERROR.to_string(),
            NewsApiError::Upstream { .. } | NewsApiError::JsonParsing(_) => NETWORK_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config.upstream_timeout)?,
            base_url: config.newsapi_base_url.trim_end_matches('/').to_string(),
            api_key: config.newsapi_key.clone(),
        })
    }

    /// Top headlines from a comma-separated list of source ids. Blank means
    /// the default set of international outlets.
    pub async fn top_headlines(&self, sources: Option<&str>) -> Result<Vec<NewsArticle>, NewsApiError> {
        let sources = sources
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_HEADLINE_SOURCES);

        let response = self
            .fetch(TOP_HEADLINES_PATH, vec![("sources", sources.to_string())], false)
            .await?;

        listing_articles(response)
    }

    /// General listing. A keyword switches from top headlines to a full-text
    /// search sorted by `options.sort_by`.
    pub async fn all_news(
        &self,
        keyword: &str,
        options: &NewsQueryOptions,
    ) -> Result<Vec<NewsArticle>, NewsApiError> {
        let mut params = base_params(options);
        let path = if keyword.trim().is_empty() {
            TOP_HEADLINES_PATH
        } else {
            params.push(("q", keyword.to_string()));
            params.push(("sortBy", options.sort_by().to_string()));
            EVERYTHING_PATH
        };

        let response = self.fetch(path, params, false).await?;
        listing_articles(response)
    }

    /// Full-text search. Unlike the listings, articles without a body are kept.
    pub async fn search_news(
        &self,
        keyword: &str,
        options: &NewsQueryOptions,
    ) -> Result<Vec<NewsArticle>, NewsApiError> {
        let mut params = base_params(options);
        params.push(("q", keyword.to_string()));
        params.push(("sortBy", options.sort_by().to_string()));

        let response = self.fetch(EVERYTHING_PATH, params, true).await?;
        let articles = collect_articles(response, false);

        if articles.is_empty() {
            return Err(NewsApiError::NoArticles);
        }
        Ok(articles)
    }

    async fn fetch(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
        search: bool,
    ) -> Result<NewsApiResponse, NewsApiError> {
        let api_key = self.api_key.as_deref().ok_or(NewsApiError::MissingApiKey)?;
        params.push(("apiKey", api_key.to_string()));

        let url = format!("{}{}", self.base_url, path);
        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        tracing::debug!(path, "Requesting NewsAPI");
        let json = get_json_with_retry(&self.client, &url, &query)
            .await
            .map_err(|source| NewsApiError::Upstream { search, source })?;
        Ok(serde_json::from_value(json)?)
    }
}

fn base_params(options: &NewsQueryOptions) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("language", options.language().to_string()),
        ("pageSize", options.page_size().to_string()),
    ];
    if let Some(country) = options.country() {
        params.push(("country", country.to_string()));
    }
    params
}

/// Listings need at least two complete articles to be worth showing.
fn listing_articles(response: NewsApiResponse) -> Result<Vec<NewsArticle>, NewsApiError> {
    let articles = collect_articles(response, true);
    if articles.len() < 2 {
        return Err(NewsApiError::InsufficientArticles);
    }
    Ok(articles)
}

fn collect_articles(response: NewsApiResponse, require_content: bool) -> Vec<NewsArticle> {
    response
        .articles
        .into_iter()
        .filter_map(|raw| to_article(raw, require_content))
        .collect()
}

fn to_article(raw: NewsApiArticle, require_content: bool) -> Option<NewsArticle> {
    let title = non_empty(raw.title)?;
    let description = non_empty(raw.description)?;
    let url = non_empty(raw.url)?;
    let source = non_empty(raw.source.name)?;
    let content = match non_empty(raw.content) {
        Some(content) => content,
        None if require_content => return None,
        None => String::new(),
    };

    let published_at = raw
        .published_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Some(NewsArticle {
        id: generate_id_from_url(&url),
        title,
        description,
        content,
        url,
        source,
        source_id: raw.source.id,
        published_at,
        image_url: non_empty(raw.url_to_image),
        country: None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
