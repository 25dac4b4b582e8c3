// src/services/notifier.rs

//! Webhook notifier.
//!
//! Delivery is fire-and-forget: failures are logged, never returned to the
//! poll loop. Retries follow a [`RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};

use crate::error::{AppError, Result};
use crate::models::FetchedRecord;
use crate::services::embed::WebhookPayload;

/// Posts a payload to the webhook.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Deliver once. A 429 answer must surface as [`AppError::RateLimited`].
    async fn post(&self, payload: &WebhookPayload) -> Result<()>;
}

/// HTTP transport posting JSON to a fixed webhook URL.
pub struct HttpTransport {
    client: Client,
    webhook_url: String,
}

impl HttpTransport {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(&self, payload: &WebhookPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited);
        }
        if !status.is_success() {
            return Err(AppError::Webhook {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    RateLimit,
}

/// Bounded retry with a fixed backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(5),
            retry_on: RetryOn::RateLimit,
        }
    }
}

impl RetryPolicy {
    /// Whether attempt number `attempt` (1-based) failing with `error` earns another try.
    pub fn should_retry(&self, attempt: u32, error: &AppError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match self.retry_on {
            RetryOn::RateLimit => error.is_rate_limited(),
        }
    }
}

/// Sends update and connectivity messages.
pub struct Notifier {
    transport: Box<dyn WebhookTransport>,
    policy: RetryPolicy,
}

impl Notifier {
    pub fn new(transport: Box<dyn WebhookTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Notifier posting to `webhook_url` with the default policy.
    pub fn http(client: Client, webhook_url: &str) -> Self {
        Self::new(
            Box::new(HttpTransport::new(client, webhook_url)),
            RetryPolicy::default(),
        )
    }

    /// Announce an update. Never fails; problems are logged.
    pub async fn notify(&self, record: &FetchedRecord, category: &str) {
        let payload = WebhookPayload::item_updated(record, category, Utc::now());
        match self.deliver(&payload).await {
            Ok(()) => log::info!("Update notification sent for: {}", record.title),
            Err(e) => log::error!(
                "Failed to send update notification for {} ({}): {}",
                record.title,
                record.id,
                e
            ),
        }
    }

    /// Deliver a payload under the retry policy, returning the final outcome.
    pub async fn deliver(&self, payload: &WebhookPayload) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.transport.post(payload).await {
                Ok(()) => return Ok(()),
                Err(e) if self.policy.should_retry(attempt, &e) => {
                    log::warn!(
                        "Webhook rate limited, waiting {}s and retrying...",
                        self.policy.backoff.as_secs_f64()
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> FetchedRecord {
        FetchedRecord {
            id: "42".to_string(),
            title: "Foo".to_string(),
            updated_at: 1_000_000_400,
            source_url: "https://steamcommunity.com/sharedfiles/filedetails/?id=42".to_string(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.backoff, Duration::from_secs(5));
        assert!(policy.should_retry(1, &AppError::RateLimited));
        assert!(!policy.should_retry(2, &AppError::RateLimited));
        assert!(!policy.should_retry(1, &AppError::Webhook { status: 500 }));
    }

    #[tokio::test]
    async fn test_success_sends_once() {
        let transport = FakeTransport::default();
        fake_notifier(&transport).notify(&record(), "A").await;
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_exactly_once() {
        let transport = FakeTransport::scripted(vec![Err(AppError::RateLimited), Ok(())]);
        let notifier = fake_notifier(&transport);

        let payload = WebhookPayload::item_updated(&record(), "A", Utc::now());
        assert!(notifier.deliver(&payload).await.is_ok());
        assert_eq!(transport.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_second_rate_limit_is_swallowed() {
        let transport =
            FakeTransport::scripted(vec![Err(AppError::RateLimited), Err(AppError::RateLimited)]);
        let notifier = fake_notifier(&transport);

        let payload = WebhookPayload::item_updated(&record(), "A", Utc::now());
        assert!(matches!(notifier.deliver(&payload).await, Err(AppError::RateLimited)));
        assert_eq!(transport.sent_count(), 2);

        // notify() itself never surfaces the error
        notifier.notify(&record(), "A").await;
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let transport = FakeTransport::scripted(vec![Err(AppError::Webhook { status: 500 })]);
        fake_notifier(&transport).notify(&record(), "A").await;
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_http_transport_maps_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Client::new(), format!("{}/hook", server.uri()));
        let payload = WebhookPayload::item_updated(&record(), "A", Utc::now());
        assert!(matches!(transport.post(&payload).await, Err(AppError::RateLimited)));
    }

    #[tokio::test]
    async fn test_http_notifier_retries_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(
            Box::new(HttpTransport::new(Client::new(), format!("{}/hook", server.uri()))),
            instant_policy(),
        );
        let payload = WebhookPayload::item_updated(&record(), "A", Utc::now());
        assert!(notifier.deliver(&payload).await.is_ok());
    }
}
