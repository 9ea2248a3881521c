//! Delivery step: POST one JSON payload per category batch to the ingestion
//! endpoint, retrying transient failures with capped exponential backoff.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::error::{EtlError, Result};
use crate::types::CategoryBatch;

/// Retry and timeout policy for batch delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of additional attempts after the first failure
    pub max_retries: u32,

    /// Base backoff duration in milliseconds (exponentially increased)
    pub backoff_ms: u64,

    /// Factor by which the backoff is increased with each retry
    pub backoff_factor: u64,

    /// Maximum backoff time in milliseconds
    pub max_backoff_ms: u64,

    /// Timeout for each individual request attempt in milliseconds
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 1000,
            backoff_factor: 2,
            max_backoff_ms: 10_000,
            timeout_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Calculate the backoff duration before the given retry attempt.
    ///
    /// Capped exponential: `min(backoff_ms * factor^attempt, max_backoff_ms)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .backoff_ms
            .saturating_mul(self.backoff_factor.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }
}

/// Response statuses that are worth another attempt.
fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// HTTP client for the ingestion endpoint.
///
/// The underlying `reqwest::Client` is built once per run and reused across
/// every batch delivery, so connections are pooled for the whole run.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    policy: RetryPolicy,
}

impl DeliveryClient {
    /// Create a delivery client for the given endpoint and bearer token.
    ///
    /// # Errors
    /// Returns `Config` if the token is empty, or `Http` if the underlying
    /// client cannot be constructed.
    pub fn new(endpoint: Url, token: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(EtlError::Config(
                "API token must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(policy.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token,
            policy,
        })
    }

    /// Deliver one category batch.
    ///
    /// A 2xx response is success. Transient statuses (429, 500, 502, 503,
    /// 504) and transport errors, including the per-attempt timeout, are
    /// retried up to `max_retries` additional times before surfacing as
    /// `DeliveryTransient`. Any other status is a `DeliveryRejected` with no
    /// retry.
    #[tracing::instrument(skip(self, batch), fields(category_id = batch.category_id, records = batch.data.len()))]
    pub async fn deliver(&self, batch: &CategoryBatch) -> Result<()> {
        let mut attempt: u32 = 0;

        loop {
            let reason = match self.send(batch).await {
                Ok(status) if status.is_success() => {
                    debug!(status = status.as_u16(), attempt, "delivery accepted");
                    return Ok(());
                }
                Ok(status) if is_transient(status) => format!("status {}", status.as_u16()),
                Ok(status) => {
                    return Err(EtlError::DeliveryRejected {
                        category_id: batch.category_id,
                        status: status.as_u16(),
                    });
                }
                Err(e) => format!("transport error: {e}"),
            };

            if attempt >= self.policy.max_retries {
                return Err(EtlError::DeliveryTransient {
                    category_id: batch.category_id,
                    attempts: attempt + 1,
                    reason,
                });
            }

            let backoff = self.policy.backoff(attempt);
            warn!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                reason = %reason,
                "transient delivery failure, backing off"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Perform a single POST attempt and return the response status.
    async fn send(&self, batch: &CategoryBatch) -> reqwest::Result<StatusCode> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Authorization", format!("Bearer {}", self.token))
            .json(batch)
            .send()
            .await?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutboundRecord;
    use rust_decimal::Decimal;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            backoff_ms: 10, // keep the suite fast
            max_backoff_ms: 50,
            ..RetryPolicy::default()
        }
    }

    fn test_batch() -> CategoryBatch {
        CategoryBatch {
            category_id: 3,
            data: vec![OutboundRecord {
                user_id: 7,
                item_name: "LAPTOP STAND".to_string(),
                total_spent: Decimal::new(4998, 2),
                timestamp: None,
            }],
        }
    }

    fn client_for(server: &MockServer) -> DeliveryClient {
        let endpoint = Url::parse(&format!("{}/receive", server.uri())).unwrap();
        DeliveryClient::new(endpoint, "test-token", test_policy()).unwrap()
    }

    #[test]
    fn test_backoff_is_capped_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0).as_millis(), 1000);
        assert_eq!(policy.backoff(1).as_millis(), 2000);
        assert_eq!(policy.backoff(2).as_millis(), 4000);
        assert_eq!(policy.backoff(3).as_millis(), 8000);
        // capped at max_backoff_ms from here on
        assert_eq!(policy.backoff(4).as_millis(), 10_000);
        assert_eq!(policy.backoff(10).as_millis(), 10_000);
    }

    #[test]
    fn test_empty_token_rejected() {
        let endpoint = Url::parse("https://api.example.com/receive").unwrap();
        let result = DeliveryClient::new(endpoint, "", RetryPolicy::default());
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[tokio::test]
    async fn test_successful_delivery_sends_wire_format_and_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/receive"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "categoryId": 3,
                "data": [{"userId": 7, "itemName": "LAPTOP STAND"}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.deliver(&test_batch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_400_fails_immediately_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.deliver(&test_batch()).await.unwrap_err();

        match err {
            EtlError::DeliveryRejected {
                category_id,
                status,
            } => {
                assert_eq!(category_id, 3);
                assert_eq!(status, 400);
            }
            other => panic!("expected DeliveryRejected, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_503_three_times_then_200_succeeds() {
        let server = MockServer::start().await;

        // First three attempts hit the transient failure, the fourth succeeds.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.deliver(&test_batch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_503_four_times_exhausts_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4) // initial attempt + 3 retries, then give up
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.deliver(&test_batch()).await.unwrap_err();

        match err {
            EtlError::DeliveryTransient {
                category_id,
                attempts,
                reason,
            } => {
                assert_eq!(category_id, 3);
                assert_eq!(attempts, 4);
                assert!(reason.contains("503"));
            }
            other => panic!("expected DeliveryTransient, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_429_is_retried_as_transient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.deliver(&test_batch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Point at a server that is no longer listening. `MockServer::start`
        // hands out a pooled server whose socket stays open after drop, so
        // bind and release a throwaway port instead.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Url::parse(&format!("http://{addr}/receive")).unwrap();
        let client = DeliveryClient::new(endpoint, "test-token", test_policy()).unwrap();

        let err = client.deliver(&test_batch()).await.unwrap_err();
        match err {
            EtlError::DeliveryTransient { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected DeliveryTransient, got: {other:?}"),
        }
    }
}
