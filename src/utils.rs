use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use serde::Serialize;

const MAX_SUGGESTIONS: usize = 5;

/// Canned searches offered while the user types.
pub const COMMON_SEARCHES: &[&str] = &[
    "weather in Lagos",
    "latest news today",
    "stock market news",
    "sports headlines",
    "technology updates",
    "political news",
    "entertainment news",
    "health articles",
    "business news",
    "science discoveries",
];

/// Validate latitude and longitude coordinates
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), String> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("Invalid latitude: {}. Must be between -90 and 90", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("Invalid longitude: {}. Must be between -180 and 180", lon));
    }
    Ok(())
}

/// Publish date label, e.g. `1st - Mar - 2024`.
pub fn format_news_date(date: &DateTime<Utc>) -> String {
    format!(
        "{} - {} - {}",
        ordinal_day(date.day()),
        date.format("%b"),
        date.year()
    )
}

fn ordinal_day(day: u32) -> String {
    if (4..=20).contains(&day) {
        return format!("{}th", day);
    }
    match day % 10 {
        1 => format!("{}st", day),
        2 => format!("{}nd", day),
        3 => format!("{}rd", day),
        _ => format!("{}th", day),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalTime {
    pub day: String,
    pub date: String,
    pub time: String,
}

/// Wall-clock time for a city given its UTC offset in seconds, as reported by
/// OpenWeather. Out-of-range offsets fall back to UTC.
pub fn format_time_for_timezone(offset_secs: i32, now: DateTime<Utc>) -> LocalTime {
    let offset = FixedOffset::east_opt(offset_secs).unwrap_or_else(|| Utc.fix());
    let local = now.with_timezone(&offset);

    LocalTime {
        day: local.format("%A").to_string(),
        date: local.format("%B %-d, %Y").to_string(),
        time: local.format("%I:%M %p").to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSuggestion {
    pub text: &'static str,
    pub href: String,
}

/// Case-insensitive substring match over [`COMMON_SEARCHES`].
pub fn search_suggestions(query: &str) -> Vec<SearchSuggestion> {
    if query.is_empty() {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    COMMON_SEARCHES
        .iter()
        .filter(|item| item.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .map(|&text| SearchSuggestion {
            text,
            href: format!("/search?q={}", urlencoding::encode(text)),
        })
        .collect()
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
