//! Source adapters.
//!
//! One adapter per publisher. Each owns its parsing rules and hands
//! normalized events to the orchestrator; a failing adapter only ever
//! affects its own status entry.

pub mod card_feed;
pub mod format;
pub mod meeting_index;
pub mod registry;
pub mod snapshot;

pub use card_feed::CardFeedAdapter;
pub use meeting_index::MeetingIndexAdapter;
pub use registry::{AdapterContext, AdapterRegistry, register_builtin_adapters};
pub use snapshot::SnapshotAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AdapterError;
use crate::pipeline::types::NormalizedEvent;

/// One fetched body and where it came from.
#[derive(Debug, Clone)]
pub struct RawPart {
    pub target: String,
    pub body: String,
}

/// Everything an adapter fetched in one `fetch_raw()` call.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub fetched_at: DateTime<Utc>,
    pub parts: Vec<RawPart>,
}

impl RawDocument {
    pub fn single(target: impl Into<String>, body: String) -> Self {
        Self {
            fetched_at: Utc::now(),
            parts: vec![RawPart {
                target: target.into(),
                body,
            }],
        }
    }
}

/// Contract between a source and the orchestrator.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Source id. Also the key into the configured priority list.
    fn id(&self) -> &str;

    /// Obtain the raw document(s). May issue several requests.
    async fn fetch_raw(&self) -> Result<RawDocument, AdapterError>;

    /// Convert raw documents into normalized events.
    ///
    /// Malformed individual records are logged and skipped; only a document
    /// that cannot be read at all is an error.
    fn parse(&self, raw: RawDocument) -> Result<Vec<NormalizedEvent>, AdapterError>;

    /// `fetch_raw` followed by `parse`.
    async fn fetch(&self) -> Result<Vec<NormalizedEvent>, AdapterError> {
        let raw = self.fetch_raw().await?;
        self.parse(raw)
    }
}
