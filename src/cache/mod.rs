pub mod clock;
pub mod fifo;
pub mod news;

use std::time::Duration;

pub use news::{CacheStats, NewsCache};

pub const DEFAULT_ARTICLE_CAPACITY: usize = 500;
pub const DEFAULT_QUERY_CAPACITY: usize = 50;
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_millis(600_000);

/// Bounds for the news result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub article_capacity: usize,
    pub query_capacity: usize,
    pub query_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            article_capacity: DEFAULT_ARTICLE_CAPACITY,
            query_capacity: DEFAULT_QUERY_CAPACITY,
            query_ttl: DEFAULT_QUERY_TTL,
        }
    }
}
