//! JSON card feed. One request returns every meeting for the day.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::adapters::format::parse_card_parts;
use crate::adapters::{Adapter, RawDocument};
use crate::error::AdapterError;
use crate::fetch::Fetcher;
use crate::pipeline::types::NormalizedEvent;

/// Placeholder in the feed URL replaced with the card date (`YYYY-MM-DD`).
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Adapter for publishers that expose the whole day's card as one JSON document.
pub struct CardFeedAdapter {
    id: String,
    url_template: String,
    date: Option<NaiveDate>,
    fetcher: Arc<dyn Fetcher>,
}

impl CardFeedAdapter {
    pub fn new(id: impl Into<String>, url_template: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            id: id.into(),
            url_template: url_template.into(),
            date: None,
            fetcher,
        }
    }

    /// Fetch a specific day instead of today (UTC).
    pub fn for_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    fn target(&self) -> String {
        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());
        self.url_template
            .replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
    }
}

#[async_trait]
impl Adapter for CardFeedAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_raw(&self) -> Result<RawDocument, AdapterError> {
        let target = self.target();
        debug!(adapter = %self.id, url = %target, "Fetching card feed");
        let body = self.fetcher.fetch(&target, None).await?;
        Ok(RawDocument::single(target, body))
    }

    fn parse(&self, raw: RawDocument) -> Result<Vec<NormalizedEvent>, AdapterError> {
        let events = parse_card_parts(&self.id, raw)?;
        info!(adapter = %self.id, count = events.len(), "Parsed card feed");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::FetchError;

    /// Returns a canned body and remembers the requested targets.
    struct CannedFetcher {
        body: Result<String, FetchError>,
        targets: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        fn new(body: Result<String, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                body,
                targets: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Fetcher for CannedFetcher {
        async fn fetch(
            &self,
            target: &str,
            _payload: Option<&serde_json::Value>,
        ) -> Result<String, FetchError> {
            self.targets.lock().unwrap().push(target.to_string());
            self.body.clone()
        }
    }

    const CARD: &str = r#"{
        "meetings": [{
            "venue": "Kempton",
            "event_type": "thoroughbred",
            "races": [{
                "id": "KEM-1", "number": 1, "start_time": "2026-10-18T13:10:00Z",
                "runners": [
                    {"name": "Horse 1", "number": 1, "odds": "2/1"},
                    {"name": "Horse 2", "number": 2, "odds": "evens"},
                    {"name": "Horse 3", "number": 3, "odds": "SP", "scratched": true}
                ]
            }]
        }]
    }"#;

    #[tokio::test]
    async fn fetches_dated_target_and_parses() {
        let fetcher = CannedFetcher::new(Ok(CARD.to_string()));
        let adapter = CardFeedAdapter::new("card_feed", "https://feed.test/v1/cards/{date}", fetcher.clone())
            .for_date(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());

        let events = adapter.fetch().await.unwrap();
        assert_eq!(
            fetcher.targets.lock().unwrap().as_slice(),
            ["https://feed.test/v1/cards/2026-10-18"]
        );
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.source, "card_feed");
        assert_eq!(event.venue, "Kempton");
        assert_eq!(event.participants.len(), 3);
        assert!(event.participants[2].scratched);
    }

    #[tokio::test]
    async fn fetch_failure_propagates_as_adapter_error() {
        let fetcher = CannedFetcher::new(Err(FetchError::HttpStatus {
            target: "https://feed.test".into(),
            code: 403,
        }));
        let adapter = CardFeedAdapter::new("card_feed", "https://feed.test", fetcher);

        let err = adapter.fetch().await.unwrap_err();
        assert!(matches!(err, AdapterError::Fetch(FetchError::HttpStatus { code: 403, .. })));
    }

    #[tokio::test]
    async fn unreadable_document_is_a_parsing_error() {
        let fetcher = CannedFetcher::new(Ok("<html>Access denied</html>".into()));
        let adapter = CardFeedAdapter::new("card_feed", "https://feed.test", fetcher);

        let err = adapter.fetch().await.unwrap_err();
        assert!(matches!(err, AdapterError::Parsing { .. }));
    }
}
