use crate::error::ServiceError;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

const USER_AGENT: &str = "SpaceAgent/0.1";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("Rate limited, retry after: {0}s")]
    RateLimited(u64),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Unexpected payload: {0}")]
    InvalidPayload(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        ServiceError::UpstreamUnavailable(err.to_string())
    }
}

/// Runs a provider call with an upper bound on how long it may take.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

/// Shared HTTP plumbing for the JSON feeds (N2YO, NOAA SWPC, NASA DONKI).
pub struct UpstreamClient {
    client: Client,
    max_retries: u32,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            max_retries: 3,
        })
    }

    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        let mut retry_count = 0;
        let mut delay = Duration::from_millis(500);

        loop {
            let response = self.client.get(url).query(params).send().await?;

            match response.status() {
                reqwest::StatusCode::OK => {
                    let json: Value = response.json().await?;
                    return Ok(json);
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    if retry_count >= self.max_retries {
                        return Err(ProviderError::RateLimited(delay.as_secs()));
                    }

                    tracing::warn!(
                        url,
                        retry_in_ms = delay.as_millis() as u64,
                        "Rate limited by upstream, backing off"
                    );

                    sleep(delay).await;
                    delay = delay.mul_f32(2.0 + fastrand::f32() * 0.5);
                    retry_count += 1;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(ProviderError::ApiError(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let slow = async {
            sleep(Duration::from_secs(60)).await;
            Ok::<_, ProviderError>(1)
        };

        let result = with_timeout(Duration::from_secs(10), slow).await;
        assert!(matches!(result, Err(ProviderError::Timeout(d)) if d == Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let fast = async { Ok::<_, ProviderError>(42) };
        assert_eq!(with_timeout(Duration::from_secs(1), fast).await.unwrap(), 42);
    }

    #[test]
    fn test_provider_error_maps_to_upstream_unavailable() {
        let err: ServiceError = ProviderError::RateLimited(4).into();
        assert!(matches!(err, ServiceError::UpstreamUnavailable(msg) if msg.contains("Rate limited")));
    }
}
