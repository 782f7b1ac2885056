//! Local snapshot source: a card document saved to disk.
//!
//! Useful for replaying a captured day and for running without network
//! access. With no path configured the adapter reports itself offline.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::adapters::format::parse_card_parts;
use crate::adapters::{Adapter, RawDocument, RawPart};
use crate::error::AdapterError;
use crate::pipeline::types::NormalizedEvent;

pub struct SnapshotAdapter {
    id: String,
    path: Option<PathBuf>,
}

impl SnapshotAdapter {
    pub fn new(id: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }
}

#[async_trait]
impl Adapter for SnapshotAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_raw(&self) -> Result<RawDocument, AdapterError> {
        let Some(path) = &self.path else {
            return Err(AdapterError::Offline {
                adapter: self.id.clone(),
                reason: "no snapshot path configured".into(),
            });
        };
        debug!(adapter = %self.id, path = %path.display(), "Reading snapshot");

        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AdapterError::Offline {
                adapter: self.id.clone(),
                reason: format!("{}: {e}", path.display()),
            })?;

        Ok(RawDocument {
            fetched_at: Utc::now(),
            parts: vec![RawPart {
                target: path.display().to_string(),
                body,
            }],
        })
    }

    fn parse(&self, raw: RawDocument) -> Result<Vec<NormalizedEvent>, AdapterError> {
        let events = parse_card_parts(&self.id, raw)?;
        info!(adapter = %self.id, count = events.len(), "Parsed snapshot");
        Ok(events)
    }
}
