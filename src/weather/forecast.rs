use super::types::*;
use chrono::{FixedOffset, Offset, Utc};
use std::collections::HashSet;

pub const MAX_FORECAST_DAYS: usize = 7;

const NO_ALERTS: &str = "No alerts available";
const UNKNOWN_CONDITION: &str = "Unknown";

impl WeatherReport {
    pub fn from_responses(current: &CurrentWeatherResponse, forecast: &ForecastResponse) -> Self {
        let alert = current
            .alerts
            .first()
            .and_then(|a| a.description.clone())
            .unwrap_or_else(|| NO_ALERTS.to_string());

        Self {
            city: current.name.clone(),
            temp: round_half_up(current.main.temp),
            condition: primary_condition(&current.weather),
            alert,
            timezone: current.timezone,
            forecast: flatten_daily_forecast(&forecast.list, forecast.city.timezone),
        }
    }
}

/// Collapses the 3-hourly forecast into one entry per weekday: the first slot
/// seen for each day, in list order, up to [`MAX_FORECAST_DAYS`].
///
/// Weekdays are taken in the city's own offset, so a slot at 23:00 UTC may
/// already belong to the next day.
pub fn flatten_daily_forecast(items: &[ForecastItem], timezone_offset: i32) -> Vec<DailyForecast> {
    let offset = FixedOffset::east_opt(timezone_offset).unwrap_or_else(|| Utc.fix());

    let mut seen_days = HashSet::new();
    let mut days = Vec::new();

    for item in items {
        if days.len() >= MAX_FORECAST_DAYS {
            break;
        }

        let Some(ts) = chrono::DateTime::from_timestamp(item.dt, 0) else {
            continue;
        };
        let day = ts.with_timezone(&offset).format("%a").to_string();

        if seen_days.insert(day.clone()) {
            days.push(DailyForecast {
                date: day,
                temp: round_half_up(item.main.temp),
                condition: primary_condition(&item.weather),
            });
        }
    }

    days
}

fn primary_condition(conditions: &[WeatherCondition]) -> String {
    conditions
        .first()
        .map(|c| c.main.clone())
        .unwrap_or_else(|| UNKNOWN_CONDITION.to_string())
}

/// Rounds .5 towards positive infinity, so -2.5 becomes -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
