//! Resilient network fetch layer.
//!
//! - [`FetchClient`]: retrying client (exponential backoff + jitter,
//!   User-Agent rotation, 4xx fail fast)
//! - [`Transport`]: one HTTP round trip, `reqwest` by default
//! - [`IdentityPool`]: swappable source of client identities

pub mod backoff;
pub mod client;
pub mod identity;
pub mod transport;

pub use backoff::Backoff;
pub use client::FetchClient;
pub use identity::{FixedIdentity, IdentityPool, RandomIdentityPool};
pub use transport::{FetchRequest, FetchResponse, ReqwestTransport, Transport};

use async_trait::async_trait;

use crate::error::FetchError;

/// Anything that can turn a target (plus optional JSON payload) into content.
///
/// Adapters depend on this rather than on [`FetchClient`] so that caching
/// decorators and test doubles can stand in.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        target: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String, FetchError>;
}
