use crate::config::Config;
use crate::upstream::{build_client, get_json_with_retry, UpstreamError};
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeolocationError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("IP lookup failed: {0}")]
    Lookup(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpLocation {
    pub city: Option<String>,
    #[serde(default)]
    pub error: bool,
    pub reason: Option<String>,
}

/// ipapi.co client.
pub struct IpApiClient {
    client: Client,
    base_url: String,
}

impl IpApiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config.upstream_timeout)?,
            base_url: config.ipapi_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Locates `ip`, or this server's own public address when `None`.
    pub async fn lookup(&self, ip: Option<IpAddr>) -> Result<IpLocation, GeolocationError> {
        let url = match ip {
            Some(ip) => format!("{}/{}/json/", self.base_url, ip),
            None => format!("{}/json/", self.base_url),
        };
        let json = get_json_with_retry(&self.client, &url, &[]).await?;
        let location: IpLocation = serde_json::from_value(json)?;

        // ipapi reports some failures with a 200 and an error flag
        if location.error {
            return Err(GeolocationError::Lookup(
                location.reason.unwrap_or_else(|| "unknown reason".to_string()),
            ));
        }
        Ok(location)
    }

    /// Best-effort city detection; any failure is logged and yields `None`.
    pub async fn city_by_ip(&self, ip: Option<IpAddr>) -> Option<String> {
        match self.lookup(ip).await {
            Ok(location) => location.city.filter(|c| !c.trim().is_empty()),
            Err(e) => {
                tracing::warn!("City lookup by IP failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> IpApiClient {
        let uri = server.uri();
        let config = Config::from_lookup(|name| (name == "IPAPI_BASE_URL").then(|| uri.clone())).unwrap();
        IpApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_parses_ipapi_payload() {
        let location: IpLocation = serde_json::from_value(json!({
            "ip": "102.89.0.1",
            "city": "Lagos",
            "region": "Lagos",
            "country_code": "NG",
            "latitude": 6.4541,
            "longitude": 3.3947,
            "timezone": "Africa/Lagos"
        }))
        .unwrap();

        assert_eq!(location.city.as_deref(), Some("Lagos"));
        assert!(!location.error);
        assert_eq!(location.reason, None);
    }

    #[test]
    fn test_parses_error_payload() {
        let location: IpLocation = serde_json::from_value(json!({
            "ip": "127.0.0.1",
            "error": true,
            "reason": "Reserved IP Address",
            "reserved": true
        }))
        .unwrap();

        assert!(location.error);
        assert_eq!(location.reason.as_deref(), Some("Reserved IP Address"));
        assert_eq!(location.city, None);
    }

    #[tokio::test]
    async fn test_lookup_by_caller_ip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/102.89.0.1/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ip": "102.89.0.1",
                "city": "Lagos",
                "country_code": "NG"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ip: IpAddr = "102.89.0.1".parse().unwrap();
        assert_eq!(client_for(&server).city_by_ip(Some(ip)).await.as_deref(), Some("Lagos"));
    }

    #[tokio::test]
    async fn test_lookup_without_ip_uses_server_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "city": "Abuja" })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).city_by_ip(None).await.as_deref(), Some("Abuja"));
    }

    #[tokio::test]
    async fn test_error_flag_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": true,
                "reason": "RateLimited",
                "message": "Visit https://ipapi.co/ratelimited/ for details"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.lookup(None).await.unwrap_err();
        assert!(matches!(err, GeolocationError::Lookup(ref reason) if reason == "RateLimited"));
        assert_eq!(client.city_by_ip(None).await, None);
    }

    #[tokio::test]
    async fn test_blank_city_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "city": " " })))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).city_by_ip(None).await, None);
    }
}
