//! In-process result cache for news articles.
//!
//! Two bounded stores sit behind one lock:
//!
//! * the article store, keyed by article id, evicting in insertion order;
//! * the query index, mapping a lower-cased query to the ids it produced and
//!   the time it was cached. Entries older than the freshness window are
//!   dropped when read.
//!
//! The query index only holds ids, so a cached result set is a view over the
//! article store: articles evicted from the store silently disappear from the
//! results that referenced them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::clock::{Clock, SystemClock};
use super::fifo::FifoMap;
use super::CacheSettings;
use crate::news::types::NewsArticle;

#[derive(Debug, Clone)]
struct QueryRecord {
    article_ids: Vec<String>,
    cached_at: DateTime<Utc>,
}

struct Stores {
    articles: FifoMap<String, NewsArticle>,
    queries: FifoMap<String, QueryRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub article_count: usize,
    pub query_count: usize,
    pub article_ids: Vec<String>,
    pub queries: Vec<String>,
}

pub struct NewsCache {
    stores: Mutex<Stores>,
    query_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl NewsCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores: Mutex::new(Stores {
                articles: FifoMap::new(settings.article_capacity),
                queries: FifoMap::new(settings.query_capacity),
            }),
            query_ttl: settings.query_ttl,
            clock,
        }
    }

    pub fn put_article(&self, article: NewsArticle) {
        let mut stores = self.stores.lock();
        insert_article(&mut stores.articles, article);
    }

    pub fn get_article(&self, id: &str) -> Option<NewsArticle> {
        self.stores.lock().articles.get(id).cloned()
    }

    /// Every cached article, oldest first.
    pub fn all_articles(&self) -> Vec<NewsArticle> {
        self.stores.lock().articles.values().cloned().collect()
    }

    /// Caches the articles individually and records the result set for
    /// `query`, replacing any previous record and resetting its age.
    pub fn put_query_result(&self, query: &str, articles: &[NewsArticle]) {
        let key = normalize_query(query);
        let record = QueryRecord {
            article_ids: articles.iter().map(|a| a.id.clone()).collect(),
            cached_at: self.clock.now(),
        };

        let mut stores = self.stores.lock();
        for article in articles {
            insert_article(&mut stores.articles, article.clone());
        }
        if let Some((evicted, _)) = stores.queries.insert(key.clone(), record) {
            tracing::debug!(query = %evicted, "Evicted query result from news cache");
        }
        tracing::debug!(query = %key, count = articles.len(), "Cached query result");
    }

    /// Returns the cached result set for `query`, or `None` when the record is
    /// missing, expired, or no longer resolves to any cached article.
    pub fn get_query_result(&self, query: &str) -> Option<Vec<NewsArticle>> {
        let key = normalize_query(query);
        let now = self.clock.now();
        let mut stores = self.stores.lock();

        let record = stores.queries.get(&key)?;
        if self.is_expired(record, now) {
            stores.queries.remove(&key);
            tracing::debug!(query = %key, "Query result expired");
            return None;
        }

        let resolved = resolve_articles(&stores.articles, &record.article_ids);
        if resolved.is_empty() {
            tracing::debug!(query = %key, "Query result no longer resolves to any article");
            return None;
        }
        Some(resolved)
    }

    pub fn clear_articles(&self) {
        self.stores.lock().articles.clear();
    }

    pub fn clear_query_index(&self) {
        self.stores.lock().queries.clear();
    }

    pub fn clear_all(&self) {
        let mut stores = self.stores.lock();
        stores.articles.clear();
        stores.queries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let stores = self.stores.lock();
        CacheStats {
            article_count: stores.articles.len(),
            query_count: stores.queries.len(),
            article_ids: stores.articles.keys().cloned().collect(),
            queries: stores.queries.keys().cloned().collect(),
        }
    }

    fn is_expired(&self, record: &QueryRecord, now: DateTime<Utc>) -> bool {
        // A negative age (clock stepped backwards) counts as fresh.
        match (now - record.cached_at).to_std() {
            Ok(age) => age > self.query_ttl,
            Err(_) => false,
        }
    }
}

/// Query keys are case-folded only; surrounding whitespace is significant.
fn normalize_query(query: &str) -> String {
    query.to_lowercase()
}

fn insert_article(articles: &mut FifoMap<String, NewsArticle>, article: NewsArticle) {
    if let Some((evicted, _)) = articles.insert(article.id.clone(), article) {
        tracing::debug!(article_id = %evicted, "Evicted article from news cache");
    }
}

/// Looks up each id in order, skipping ids whose article has been evicted.
fn resolve_articles(articles: &FifoMap<String, NewsArticle>, ids: &[String]) -> Vec<NewsArticle> {
    ids.iter().filter_map(|id| articles.get(id.as_str()).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use chrono::TimeZone;

    fn article(id: &str) -> NewsArticle {
        NewsArticle {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: "description".to_string(),
            content: "content".to_string(),
            url: format!("https://example.com/{}", id),
            source: "Example".to_string(),
            source_id: Some("example".to_string()),
            published_at: None,
            image_url: None,
            country: None,
        }
    }

    fn cache_with_clock() -> (NewsCache, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = NewsCache::with_clock(CacheSettings::default(), clock.clone());
        (cache, clock)
    }

    fn small_cache(article_capacity: usize, query_capacity: usize) -> NewsCache {
        NewsCache::new(CacheSettings {
            article_capacity,
            query_capacity,
            ..Default::default()
        })
    }

    fn ids(articles: &[NewsArticle]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_article_store_is_bounded() {
        let cache = NewsCache::new(CacheSettings::default());
        for i in 1..=500 {
            cache.put_article(article(&format!("a{}", i)));
        }
        cache.put_article(article("a501"));

        assert_eq!(cache.stats().article_count, 500);
        assert!(cache.get_article("a1").is_none());
        assert!(cache.get_article("a2").is_some());
        assert!(cache.get_article("a501").is_some());
    }

    #[test]
    fn test_overwrite_does_not_refresh_eviction_order() {
        let cache = small_cache(3, 10);
        cache.put_article(article("a"));
        cache.put_article(article("b"));
        cache.put_article(article("c"));

        let mut updated = article("a");
        updated.title = "Updated".to_string();
        cache.put_article(updated);
        assert_eq!(cache.get_article("a").unwrap().title, "Updated");
        assert_eq!(cache.stats().article_count, 3);

        cache.put_article(article("d"));
        assert!(cache.get_article("a").is_none());
        assert!(cache.get_article("b").is_some());
        assert_eq!(cache.stats().article_ids, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_query_result_expires_after_window() {
        let (cache, clock) = cache_with_clock();
        cache.put_query_result("lagos weather", &[article("x")]);

        clock.advance(chrono::Duration::milliseconds(599_999));
        let hit = cache.get_query_result("lagos weather").unwrap();
        assert_eq!(ids(&hit), vec!["x"]);

        clock.advance(chrono::Duration::milliseconds(2));
        assert!(cache.get_query_result("lagos weather").is_none());
        // The expired record is gone, the article itself is not
        assert_eq!(cache.stats().query_count, 0);
        assert!(cache.get_article("x").is_some());
    }

    #[test]
    fn test_exact_window_boundary_is_fresh() {
        let (cache, clock) = cache_with_clock();
        cache.put_query_result("x", &[article("a")]);

        clock.advance(chrono::Duration::milliseconds(600_000));
        assert!(cache.get_query_result("x").is_some());
    }

    #[test]
    fn test_query_key_is_case_insensitive() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_query_result("Weather", &[article("a")]);

        let hit = cache.get_query_result("weather").unwrap();
        assert_eq!(ids(&hit), vec!["a"]);
        assert!(cache.get_query_result("WEATHER").is_some());
        assert_eq!(cache.stats().queries, vec!["weather"]);
    }

    #[test]
    fn test_query_key_keeps_whitespace() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_query_result("weather", &[article("a")]);

        assert!(cache.get_query_result(" weather").is_none());
        assert!(cache.get_query_result("weather ").is_none());
    }

    #[test]
    fn test_query_result_skips_evicted_articles() {
        let cache = small_cache(2, 10);
        cache.put_query_result("x", &[article("a"), article("b")]);
        cache.put_article(article("c"));

        let hit = cache.get_query_result("x").unwrap();
        assert_eq!(ids(&hit), vec!["b"]);
    }

    #[test]
    fn test_fully_evicted_query_result_is_a_miss() {
        let cache = small_cache(2, 10);
        cache.put_query_result("x", &[article("a"), article("b")]);
        cache.put_article(article("c"));
        cache.put_article(article("d"));

        assert!(cache.get_query_result("x").is_none());
        // The record itself is still present until it expires
        assert_eq!(cache.stats().query_count, 1);
    }

    #[test]
    fn test_empty_result_set_is_a_miss() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_query_result("nothing", &[]);

        assert!(cache.get_query_result("nothing").is_none());
    }

    #[test]
    fn test_query_index_is_bounded() {
        let cache = NewsCache::new(CacheSettings::default());
        for i in 0..51 {
            cache.put_query_result(&format!("q{}", i), &[article(&format!("a{}", i))]);
        }

        let stats = cache.stats();
        assert_eq!(stats.query_count, 50);
        assert!(!stats.queries.contains(&"q0".to_string()));
        assert!(cache.get_query_result("q0").is_none());
        assert!(cache.get_query_result("q1").is_some());
        assert!(cache.get_query_result("q50").is_some());
    }

    #[test]
    fn test_requery_replaces_record_and_resets_age() {
        let (cache, clock) = cache_with_clock();
        cache.put_query_result("x", &[article("a"), article("b")]);

        clock.advance(chrono::Duration::minutes(9));
        cache.put_query_result("X", &[article("c")]);

        clock.advance(chrono::Duration::minutes(9));
        let hit = cache.get_query_result("x").unwrap();
        assert_eq!(ids(&hit), vec!["c"]);
        assert_eq!(cache.stats().query_count, 1);
    }

    #[test]
    fn test_put_query_result_populates_article_store() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_query_result("headlines", &[article("a"), article("b")]);

        assert!(cache.get_article("a").is_some());
        assert!(cache.get_article("b").is_some());
        assert_eq!(ids(&cache.all_articles()), vec!["a", "b"]);
    }

    #[test]
    fn test_result_order_is_preserved() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_article(article("c"));
        cache.put_query_result("x", &[article("b"), article("c"), article("a")]);

        let hit = cache.get_query_result("x").unwrap();
        assert_eq!(ids(&hit), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_clear_operations() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_query_result("x", &[article("a")]);

        cache.clear_articles();
        assert_eq!(cache.stats().article_count, 0);
        assert_eq!(cache.stats().query_count, 1);
        assert!(cache.get_query_result("x").is_none());

        cache.put_query_result("y", &[article("b")]);
        cache.clear_query_index();
        assert_eq!(cache.stats().query_count, 0);
        assert!(cache.get_article("b").is_some());

        cache.put_query_result("z", &[article("c")]);
        cache.clear_all();
        let stats = cache.stats();
        assert_eq!(stats.article_count, 0);
        assert_eq!(stats.query_count, 0);
        assert!(stats.article_ids.is_empty());
        assert!(stats.queries.is_empty());
    }

    #[test]
    fn test_stats_list_keys_in_insertion_order() {
        let cache = NewsCache::new(CacheSettings::default());
        cache.put_query_result("Second", &[article("b")]);
        cache.put_article(article("a"));
        cache.put_query_result("first", &[article("c")]);

        let stats = cache.stats();
        assert_eq!(stats.article_count, 3);
        assert_eq!(stats.article_ids, vec!["b", "a", "c"]);
        assert_eq!(stats.queries, vec!["second", "first"]);
    }
}
