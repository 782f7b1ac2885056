//! Two-stage source: an index of races, then one detail document per race.
//!
//! Index:  `{ "races": [ { "href": "/race/123" }, ... ] }`
//! Detail: `{ "venue": "...", "event_type": "...", "number": 3,
//!            "start_time": "...", "runners": [...] }`
//!
//! Detail fetches run concurrently, at most [`DEFAULT_CONCURRENCY`] at a time
//! unless configured otherwise. A failed detail is logged and skipped;
//! the adapter only fails when the index itself fails or every detail does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adapters::format::{DEFAULT_EVENT_TYPE, parse_race};
use crate::adapters::{Adapter, RawDocument, RawPart};
use crate::error::{AdapterError, ParsingError};
use crate::fetch::Fetcher;
use crate::normalize::clean_text;
use crate::pipeline::types::NormalizedEvent;

/// Detail fetches in flight at once against one publisher.
pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct MeetingIndexAdapter {
    id: String,
    index_url: reqwest::Url,
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
}

impl MeetingIndexAdapter {
    pub fn new(id: impl Into<String>, index_url: reqwest::Url, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            id: id.into(),
            index_url,
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Resolve every `href` in the index against the index URL.
    fn detail_targets(&self, index_body: &str) -> Result<Vec<String>, AdapterError> {
        let index: Value = serde_json::from_str(index_body).map_err(|e| AdapterError::Parsing {
            adapter: self.id.clone(),
            reason: format!("index is not JSON: {e}"),
        })?;
        let races = index
            .get("races")
            .and_then(Value::as_array)
            .ok_or_else(|| AdapterError::Parsing {
                adapter: self.id.clone(),
                reason: "index has no races list".into(),
            })?;

        let mut targets = Vec::with_capacity(races.len());
        for entry in races {
            let Some(href) = entry.get("href").and_then(Value::as_str) else {
                warn!(adapter = %self.id, entry = %entry, "Index entry without href");
                continue;
            };
            match self.index_url.join(href) {
                Ok(url) => targets.push(url.to_string()),
                Err(e) => warn!(adapter = %self.id, href, error = %e, "Unresolvable href"),
            }
        }
        Ok(targets)
    }

    fn parse_detail(&self, body: &str) -> Result<NormalizedEvent, ParsingError> {
        let detail: Value = serde_json::from_str(body)?;
        let venue = detail
            .get("venue")
            .and_then(Value::as_str)
            .and_then(clean_text)
            .ok_or(ParsingError::MissingField("venue"))?;
        let event_type = detail
            .get("event_type")
            .and_then(Value::as_str)
            .and_then(clean_text)
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        parse_race(&self.id, &venue, &event_type, &detail)
    }
}

#[async_trait]
impl Adapter for MeetingIndexAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_raw(&self) -> Result<RawDocument, AdapterError> {
        let index_body = self.fetcher.fetch(self.index_url.as_str(), None).await?;
        let targets = self.detail_targets(&index_body)?;
        debug!(adapter = %self.id, details = targets.len(), "Fetched race index");

        let results: Vec<_> = stream::iter(targets.iter().cloned())
            .map(|target| async move {
                let result = self.fetcher.fetch(&target, None).await;
                (target, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut parts = Vec::with_capacity(results.len());
        let mut last_error = None;
        for (target, result) in results {
            match result {
                Ok(body) => parts.push(RawPart {
                    target: target.clone(),
                    body,
                }),
                Err(e) => {
                    warn!(adapter = %self.id, url = %target, error = %e, "Skipping race detail");
                    last_error = Some(e);
                }
            }
        }

        if parts.is_empty()
            && let Some(e) = last_error
        {
            return Err(e.into());
        }

        Ok(RawDocument {
            fetched_at: Utc::now(),
            parts,
        })
    }

    fn parse(&self, raw: RawDocument) -> Result<Vec<NormalizedEvent>, AdapterError> {
        let mut events = Vec::with_capacity(raw.parts.len());
        for part in &raw.parts {
            match self.parse_detail(&part.body) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    adapter = %self.id,
                    url = %part.target,
                    error = %e,
                    "Skipping malformed race detail"
                ),
            }
        }
        info!(adapter = %self.id, count = events.len(), "Parsed race details");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::FetchError;

    /// Serves bodies by URL; unknown URLs are 404s.
    struct RoutedFetcher {
        routes: HashMap<String, Result<String, FetchError>>,
    }

    #[async_trait]
    impl Fetcher for RoutedFetcher {
        async fn fetch(
            &self,
            target: &str,
            _payload: Option<&serde_json::Value>,
        ) -> Result<String, FetchError> {
            self.routes.get(target).cloned().unwrap_or(Err(FetchError::HttpStatus {
                target: target.to_string(),
                code: 404,
            }))
        }
    }

    fn adapter(routes: Vec<(&str, Result<String, FetchError>)>) -> MeetingIndexAdapter {
        let fetcher = RoutedFetcher {
            routes: routes.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        };
        MeetingIndexAdapter::new(
            "index",
            reqwest::Url::parse("https://index.test/today/index.json").unwrap(),
            Arc::new(fetcher),
        )
    }

    fn detail(number: u32) -> Result<String, FetchError> {
        Ok(serde_json::json!({
            "venue": "Ascot",
            "number": number,
            "start_time": "2026-10-18T14:30:00Z",
            "runners": [{"name": "Horse 1", "number": 1, "odds": "4/1"}]
        })
        .to_string())
    }

    #[tokio::test]
    async fn follows_index_to_details() {
        let index = r#"{"races": [{"href": "race/1.json"}, {"href": "/other/2.json"}]}"#;
        let adapter = adapter(vec![
            ("https://index.test/today/index.json", Ok(index.into())),
            ("https://index.test/today/race/1.json", detail(1)),
            ("https://index.test/other/2.json", detail(2)),
        ]);

        let mut events = adapter.fetch().await.unwrap();
        events.sort_by_key(|e| e.sequence);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);
        assert_eq!(events[0].source, "index");
    }

    #[tokio::test]
    async fn failed_and_malformed_details_are_skipped() {
        let index = r#"{"races": [{"href": "race/1.json"}, {"href": "race/2.json"}, {"href": "race/3.json"}, {}]}"#;
        let adapter = adapter(vec![
            ("https://index.test/today/index.json", Ok(index.into())),
            ("https://index.test/today/race/1.json", detail(1)),
            ("https://index.test/today/race/2.json", Ok(r#"{"number": 2}"#.into())),
        ]);

        let events = adapter.fetch().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 1);
    }

    #[tokio::test]
    async fn index_failure_fails_the_adapter() {
        let adapter = adapter(vec![]);
        let err = adapter.fetch().await.unwrap_err();
        assert!(matches!(err, AdapterError::Fetch(FetchError::HttpStatus { code: 404, .. })));
    }

    #[tokio::test]
    async fn all_details_failing_fails_the_adapter() {
        let index = r#"{"races": [{"href": "race/1.json"}]}"#;
        let adapter = adapter(vec![
            ("https://index.test/today/index.json", Ok(index.into())),
            (
                "https://index.test/today/race/1.json",
                Err(FetchError::Network {
                    target: "https://index.test/today/race/1.json".into(),
                    reason: "timed out".into(),
                }),
            ),
        ]);
        let err = adapter.fetch().await.unwrap_err();
        assert!(matches!(err, AdapterError::Fetch(FetchError::Network { .. })));
    }

    /// Counts how many fetches overlap; every fetch takes one second.
    #[derive(Default)]
    struct SlowFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(
            &self,
            target: &str,
            _payload: Option<&serde_json::Value>,
        ) -> Result<String, FetchError> {
            if target.ends_with("index.json") {
                let races: Vec<_> = (1..=10)
                    .map(|n| serde_json::json!({"href": format!("race/{n}.json")}))
                    .collect();
                return Ok(serde_json::json!({"races": races}).to_string());
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            detail(1)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn detail_fetches_are_bounded() {
        let fetcher = Arc::new(SlowFetcher::default());
        let adapter = MeetingIndexAdapter::new(
            "index",
            reqwest::Url::parse("https://index.test/today/index.json").unwrap(),
            fetcher.clone(),
        )
        .with_concurrency(3);

        let started = tokio::time::Instant::now();
        let raw = adapter.fetch_raw().await.unwrap();
        assert_eq!(raw.parts.len(), 10);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= std::time::Duration::from_secs(4));
        assert_eq!(raw.parts[9].target, "https://index.test/today/race/10.json");
    }

    #[tokio::test]
    async fn empty_index_is_ok_with_no_events() {
        let adapter = adapter(vec![(
            "https://index.test/today/index.json",
            Ok(r#"{"races": []}"#.into()),
        )]);
        assert!(adapter.fetch().await.unwrap().is_empty());
    }
}
