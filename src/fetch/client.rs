//! Retrying fetch client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::fetch::backoff::Backoff;
use crate::fetch::identity::{IdentityPool, RandomIdentityPool};
use crate::fetch::transport::{FetchRequest, ReqwestTransport, Transport};

/// Resilient fetcher: bounded retries with exponential backoff, a fresh
/// client identity on every attempt, and no caching.
///
/// Holds no mutable state, so one instance can be shared by every adapter.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    identities: Arc<dyn IdentityPool>,
    backoff: Backoff,
    max_attempts: u32,
    headers: Vec<(String, String)>,
}

impl FetchClient {
    /// Client over `reqwest` with the default browser identity pool.
    pub fn new(config: &RetryConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_parts(
            config,
            Arc::new(transport),
            Arc::new(RandomIdentityPool::default()),
        ))
    }

    pub fn with_parts(
        config: &RetryConfig,
        transport: Arc<dyn Transport>,
        identities: Arc<dyn IdentityPool>,
    ) -> Self {
        Self {
            transport,
            identities,
            backoff: Backoff::from_config(config),
            max_attempts: config.max_attempts.max(1),
            headers: Vec::new(),
        }
    }

    /// Extra header sent with every request (e.g. an API key).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    async fn attempt(
        &self,
        target: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String, FetchError> {
        let request = FetchRequest {
            target: target.to_string(),
            payload: payload.cloned(),
            user_agent: self.identities.pick(),
            headers: self.headers.clone(),
        };
        let response = self.transport.send(request).await?;
        if (200..300).contains(&response.status) {
            Ok(response.body)
        } else {
            Err(FetchError::HttpStatus {
                target: target.to_string(),
                code: response.status,
            })
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(
        &self,
        target: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.attempt(target, payload).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!(url = %target, attempt, "Fetch succeeded after retry");
                    }
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff.delay(attempt - 1);
                    warn!(
                        url = %target,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(url = %target, attempt, error = %e, "Fetch failed, giving up");
                    return Err(e);
                }
            }
        }
    }
}
