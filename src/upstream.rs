use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

const USER_AGENT: &str = "NewsWeatherServer/1.0";
const MAX_RETRIES: u32 = 3;
#[cfg(not(test))]
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
#[cfg(test)]
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Rate limited, retry after: {0}s")]
    RateLimited(u64),
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
}

impl UpstreamError {
    /// The upstream's own error message, if it sent one.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// GET `url` and decode a JSON body, retrying 429s with exponential backoff
/// and jitter.
pub async fn get_json_with_retry(
    client: &Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<Value, UpstreamError> {
    let mut retry_count = 0;
    let mut delay = INITIAL_BACKOFF;

    loop {
        let response = client.get(url).query(params).send().await?;

        match response.status() {
            status if status.is_success() => {
                let json: Value = response.json().await?;
                return Ok(json);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                if retry_count >= MAX_RETRIES {
                    return Err(UpstreamError::RateLimited(delay.as_secs()));
                }

                tracing::warn!(
                    "Rate limited by {}, retrying in {}ms",
                    url,
                    delay.as_millis()
                );

                sleep(delay).await;
                delay = delay.mul_f32(2.0 + fastrand::f32() * 0.5);
                retry_count += 1;
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(UpstreamError::Status {
                    status,
                    message: error_message(&body),
                });
            }
        }
    }
}

/// Pulls `message` out of a JSON error body. NewsAPI, OpenWeather and ipapi
/// all use this field.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("message")?
        .as_str()
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
