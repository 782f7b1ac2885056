//! Single HTTP round trip, behind a trait so the retry policy can be
//! exercised without a network.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub target: String,
    /// `Some` sends a JSON POST, `None` a GET.
    pub payload: Option<serde_json::Value>,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

/// Raw response, before status classification.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. Connection-level failures are `FetchError::Network`;
    /// any received status, including 4xx/5xx, is returned as a response.
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Browser-like headers sent alongside the rotated User-Agent.
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("DNT", "1"),
];

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::Network {
                target: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = reqwest::Url::parse(&request.target).map_err(|e| FetchError::InvalidTarget {
            target: request.target.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = match &request.payload {
            Some(body) => self.client.post(url).json(body),
            None => self.client.get(url),
        };
        builder = builder.header(reqwest::header::USER_AGENT, &request.user_agent);
        for (name, value) in DEFAULT_HEADERS {
            builder = builder.header(*name, *value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let network = |e: reqwest::Error| FetchError::Network {
            target: request.target.clone(),
            reason: e.to_string(),
        };

        let response = builder.send().await.map_err(network)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network)?;

        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_target_is_invalid_not_network() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let err = transport
            .send(FetchRequest {
                target: "not a url".into(),
                payload: None,
                user_agent: "test".into(),
                headers: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget { .. }));
        assert!(!err.is_retryable());
    }
}
