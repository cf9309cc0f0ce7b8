//! avalanche.org public product API client.
//!
//! Fetches the current forecast for one center/zone pair.
//! See: https://api.avalanche.org/v2/public/product

use reqwest::Url;
use std::time::Duration;

use crate::errors::AppError;
use crate::services::build_http_client;

/// Client for the forecast product endpoint of a single zone.
#[derive(Debug, Clone)]
pub struct AvalancheClient {
    client: reqwest::Client,
    endpoint: Url,
}

/// Build the product URL for a forecast center and zone.
///
/// Query values are percent-encoded; an unparsable base URL is a `Config` error.
pub fn forecast_endpoint(api_url: &str, center_id: &str, zone_id: &str) -> Result<Url, AppError> {
    Url::parse_with_params(
        api_url.trim_end_matches('/'),
        &[
            ("type", "forecast"),
            ("center_id", center_id),
            ("zone_id", zone_id),
        ],
    )
    .map_err(|e| AppError::Config(format!("Invalid forecast API URL '{}': {}", api_url, e)))
}

impl AvalancheClient {
    pub fn new(
        api_url: &str,
        center_id: &str,
        zone_id: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: forecast_endpoint(api_url, center_id, zone_id)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Fetch the raw forecast document.
    ///
    /// Transport errors, timeouts and non-2xx statuses are `Fetch` errors;
    /// a body that is not JSON is a `MalformedForecast`.
    pub async fn fetch_forecast(&self) -> Result<serde_json::Value, AppError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("avalanche.org request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!(
                "avalanche.org returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("avalanche.org body read failed: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| AppError::MalformedForecast(format!("response is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_forecast_endpoint() {
        assert_eq!(
            forecast_endpoint("https://api.avalanche.org/v2/public/product", "NWAC", "1648")
                .unwrap()
                .as_str(),
            "https://api.avalanche.org/v2/public/product?type=forecast&center_id=NWAC&zone_id=1648"
        );
    }

    #[test]
    fn test_forecast_endpoint_trailing_slash() {
        assert_eq!(
            forecast_endpoint("http://localhost:1234/product/", "SAC", "77")
                .unwrap()
                .as_str(),
            "http://localhost:1234/product?type=forecast&center_id=SAC&zone_id=77"
        );
    }

    #[test]
    fn test_forecast_endpoint_encodes_ids() {
        let url = forecast_endpoint("https://api.avalanche.org/v2/public/product", "A&B C", "1=2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.avalanche.org/v2/public/product?type=forecast&center_id=A%26B+C&zone_id=1%3D2"
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1], ("center_id".to_string(), "A&B C".to_string()));
        assert_eq!(pairs[2], ("zone_id".to_string(), "1=2".to_string()));
    }

    #[test]
    fn test_forecast_endpoint_invalid_base() {
        assert!(matches!(
            forecast_endpoint("not a url", "NWAC", "1648"),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_forecast_sends_encoded_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("center_id", "A&B C"))
            .and(query_param("zone_id", "1648"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = AvalancheClient::new(&server.uri(), "A&B C", "1648", TIMEOUT).unwrap();
        client.fetch_forecast().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_forecast_sends_zone_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product"))
            .and(query_param("type", "forecast"))
            .and(query_param("center_id", "NWAC"))
            .and(query_param("zone_id", "1648"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "author": "Dallas Glass"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            AvalancheClient::new(&format!("{}/product", server.uri()), "NWAC", "1648", TIMEOUT)
                .unwrap();
        let json = client.fetch_forecast().await.unwrap();
        assert_eq!(json["author"], "Dallas Glass");
    }

    #[tokio::test]
    async fn test_fetch_forecast_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = AvalancheClient::new(&server.uri(), "NWAC", "1648", TIMEOUT).unwrap();
        let err = client.fetch_forecast().await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(ref msg) if msg.contains("503")), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_forecast_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = AvalancheClient::new(&server.uri(), "NWAC", "1648", TIMEOUT).unwrap();
        assert!(matches!(
            client.fetch_forecast().await,
            Err(AppError::MalformedForecast(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_forecast_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client =
            AvalancheClient::new(&server.uri(), "NWAC", "1648", Duration::from_millis(200)).unwrap();
        assert!(matches!(client.fetch_forecast().await, Err(AppError::Fetch(_))));
    }
}
