//! Current weather tool backed by the wttr.in forecast service.
//!
//! The forecast provider occasionally answers with a `404` status while
//! still returning a usable body; such responses are accepted as-is.
//! Other non-success statuses are retried with exponential backoff, while
//! network-level failures and malformed bodies fail immediately.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::ACCEPT};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use super::common::{build_client, parse_json};
use super::retry::{RetryPolicy, RetryState};
use crate::core::config::UpstreamConfig;
use crate::domains::tools::error::{ToolError, UpstreamError};
use crate::domains::tools::handlers::ToolDefinition;

/// Parameters for the weather tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WeatherParams {
    /// The location to get the weather for, e.g. "Shanghai" or "New York".
    pub location_name: String,
}

/// HTTP client for the forecast provider.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    http: Client,
    endpoint: String,
    retry: RetryPolicy,
    span: Span,
}

impl ForecastClient {
    pub fn new(config: &UpstreamConfig, parent: &Span) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: build_client(config.timeout, &config.user_agent)?,
            endpoint: config.forecast.endpoint(),
            retry: config.forecast.retry.clone(),
            span: info_span!(parent: parent, "forecast"),
        })
    }

    /// Provider URL for a location, form-encoding the location text.
    pub fn forecast_url(&self, location: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(location.as_bytes()).collect();
        format!("{}/{}?format=j1", self.endpoint, encoded)
    }

    /// Fetch the forecast for a location.
    pub async fn get_forecast(&self, location: &str) -> Result<Value, UpstreamError> {
        let url = self.forecast_url(location);
        let mut state = RetryState::new(self.retry.clone());

        async {
            info!("Requesting weather data for location: {}", location);
            let result = self.fetch(&url, &mut state).await;
            debug!(
                attempts = state.attempts(),
                retries = state.retries(),
                ok = result.is_ok(),
                "Forecast call finished"
            );
            result
        }
        .instrument(self.span.clone())
        .await
    }

    /// GET `url` and parse its body, retrying non-success statuses.
    ///
    /// `state` records every attempt and backoff delay.
    pub async fn fetch(&self, url: &str, state: &mut RetryState) -> Result<Value, UpstreamError> {
        loop {
            let attempt = state.begin_attempt();

            let response = self
                .http
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| {
                    error!("Request error for {}: {}", url, e);
                    UpstreamError::Network(e)
                })?;

            let status = response.status();
            debug!(attempt, %status, "Response from {}", url);

            let body = response.bytes().await.map_err(UpstreamError::Network)?;

            if status.is_success() {
                return parse_json(url, &body);
            }

            if status == StatusCode::NOT_FOUND && !body.is_empty() {
                warn!("Got 404 but received content from {}", url);
                return parse_json(url, &body);
            }

            match state.next_delay() {
                Some(delay) => {
                    warn!(
                        attempt,
                        max_attempts = state.max_attempts(),
                        backoff_ms = delay.as_millis() as u64,
                        "HTTP {} from {}, retrying",
                        status,
                        url
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(
                        "HTTP {} from {} after {} attempt(s)",
                        status,
                        url,
                        state.attempts()
                    );
                    return Err(UpstreamError::Transient {
                        status,
                        attempts: state.attempts(),
                    });
                }
            }
        }
    }
}

/// Weather Tool implementation.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: ForecastClient,
}

impl WeatherTool {
    pub fn new(config: &UpstreamConfig, parent: &Span) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: ForecastClient::new(config, parent)?,
        })
    }
}

#[async_trait]
impl ToolDefinition for WeatherTool {
    const NAME: &'static str = "get_current_weather";
    const DESCRIPTION: &'static str = "Get current weather and forecast for a location";

    type Params = WeatherParams;

    async fn execute(&self, params: WeatherParams) -> Result<Value, ToolError> {
        self.client
            .get_forecast(&params.location_name)
            .await
            .map_err(|e| ToolError::execution(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> UpstreamConfig {
        let mut config = UpstreamConfig::default();
        config.timeout = Duration::from_secs(5);
        config.forecast.base_url = base_url.to_string();
        config.forecast.retry.base_delay = Duration::from_millis(10);
        config
    }

    fn client_for(server: &MockServer) -> ForecastClient {
        ForecastClient::new(&test_config(&server.uri()), &Span::none()).unwrap()
    }

    #[test]
    fn test_forecast_url_encodes_location() {
        let mut config = UpstreamConfig::default();
        config.forecast.locale = "en".to_string();
        let client = ForecastClient::new(&config, &Span::none()).unwrap();

        assert_eq!(
            client.forecast_url("New York"),
            "https://en.wttr.in/New+York?format=j1"
        );
        assert_eq!(
            client.forecast_url("São Paulo/BR"),
            "https://en.wttr.in/S%C3%A3o+Paulo%2FBR?format=j1"
        );
    }

    #[tokio::test]
    async fn test_first_attempt_success_has_no_retries() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"current_condition": [{"temp_C": "21"}]});

        Mock::given(method("GET"))
            .and(path("/Shanghai"))
            .and(query_param("format", "j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut state = RetryState::new(RetryPolicy {
            base_delay: Duration::from_millis(10),
            ..Default::default()
        });
        let result = client
            .fetch(&client.forecast_url("Shanghai"), &mut state)
            .await
            .unwrap();

        assert_eq!(result, body);
        assert_eq!(state.retries(), 0);
        assert!(state.delays().is_empty());
    }

    #[tokio::test]
    async fn test_two_failures_then_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut state = RetryState::new(RetryPolicy {
            base_delay: Duration::from_millis(10),
            ..Default::default()
        });
        let result = client
            .fetch(&client.forecast_url("Paris"), &mut state)
            .await
            .unwrap();

        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(state.retries(), 2);
        let delays = state.delays();
        assert_eq!(delays.len(), 2);
        assert!(delays[0] < delays[1]);
    }

    #[tokio::test]
    async fn test_not_found_with_body_is_degraded_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"weather": []}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.get_forecast("Atlantis").await.unwrap();
        assert_eq!(result, serde_json::json!({"weather": []}));
    }

    #[tokio::test]
    async fn test_not_found_without_body_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_forecast("Nowhere").await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Transient {
                status: StatusCode::NOT_FOUND,
                attempts: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut state = RetryState::new(RetryPolicy {
            base_delay: Duration::from_millis(5),
            ..Default::default()
        });
        let err = client
            .fetch(&client.forecast_url("Oslo"), &mut state)
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Transient { attempts: 3, .. }));
        assert_eq!(state.attempts(), 3);
        assert_eq!(state.delays().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_forecast("Berlin").await.unwrap_err();
        assert!(matches!(err, UpstreamError::DataFormat { .. }));
    }

    #[tokio::test]
    async fn test_network_failure_is_not_retried() {
        // Reserve a port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            ForecastClient::new(&test_config(&format!("http://{addr}")), &Span::none()).unwrap();
        let mut state = RetryState::new(RetryPolicy::default());
        let err = client
            .fetch(&client.forecast_url("Rome"), &mut state)
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Network(_)));
        assert_eq!(state.attempts(), 1);
        assert!(state.delays().is_empty());
    }

    #[tokio::test]
    async fn test_tool_execute_returns_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Tokyo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"area": "Tokyo"})))
            .mount(&server)
            .await;

        let tool = WeatherTool::new(&test_config(&server.uri()), &Span::none()).unwrap();
        let params = WeatherParams {
            location_name: "Tokyo".to_string(),
        };

        let value = tool.execute(params).await.unwrap();
        assert_eq!(value["area"], "Tokyo");
    }

    #[tokio::test]
    async fn test_tool_execute_wraps_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let tool = WeatherTool::new(&test_config(&server.uri()), &Span::none()).unwrap();
        let params = WeatherParams {
            location_name: "Lima".to_string(),
        };

        let err = tool.execute(params).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Execution {
                source: UpstreamError::DataFormat { .. },
                ..
            }
        ));
    }
}
