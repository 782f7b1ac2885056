//! Adapter registry.
//!
//! Sources are registered explicitly at startup as factories keyed by id.
//! Building the active set happens once per run, so configuration problems
//! surface before any network traffic.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;

use crate::adapters::{Adapter, CardFeedAdapter, MeetingIndexAdapter, SnapshotAdapter};
use crate::cache::{Cache, CachingFetcher};
use crate::config::SourceEndpoints;
use crate::error::ConfigError;
use crate::fetch::{FetchClient, Fetcher};

/// Header carrying the card feed API key.
pub const CARD_FEED_KEY_HEADER: &str = "X-Api-Key";

/// Shared resources handed to adapter factories.
#[derive(Clone)]
pub struct AdapterContext {
    pub client: FetchClient,
    pub cache: Option<(Arc<dyn Cache>, Duration)>,
    pub endpoints: SourceEndpoints,
}

impl AdapterContext {
    pub fn new(client: FetchClient, endpoints: SourceEndpoints) -> Self {
        Self {
            client,
            cache: None,
            endpoints,
        }
    }

    /// Serve repeated requests from `cache` for `ttl`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        self.cache = Some((cache, ttl));
        self
    }

    /// The shared client as a fetcher, wrapped in the cache if one is set.
    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        self.fetcher_with(self.client.clone())
    }

    /// Like [`fetcher`](Self::fetcher) but over a customised client.
    pub fn fetcher_with(&self, client: FetchClient) -> Arc<dyn Fetcher> {
        match &self.cache {
            Some((cache, ttl)) => Arc::new(CachingFetcher::new(Arc::new(client), cache.clone(), *ttl)),
            None => Arc::new(client),
        }
    }
}

type AdapterFactory =
    Box<dyn Fn(&AdapterContext) -> Result<Arc<dyn Adapter>, ConfigError> + Send + Sync>;

/// Ordered map of source id to adapter factory.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: Vec<(String, AdapterFactory)>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Ids must be unique.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> Result<(), ConfigError>
    where
        F: Fn(&AdapterContext) -> Result<Arc<dyn Adapter>, ConfigError> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.iter().any(|(existing, _)| *existing == id) {
            return Err(ConfigError::DuplicateAdapter(id));
        }
        tracing::debug!("Registered adapter: {}", id);
        self.factories.push((id, Box::new(factory)));
        Ok(())
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.factories.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Construct the active adapters in registration order.
    ///
    /// `selection` restricts the run to one registered id.
    pub fn build(
        &self,
        ctx: &AdapterContext,
        selection: Option<&str>,
    ) -> Result<Vec<Arc<dyn Adapter>>, ConfigError> {
        if self.factories.is_empty() {
            return Err(ConfigError::NoAdapters);
        }
        if let Some(name) = selection
            && !self.factories.iter().any(|(id, _)| id == name)
        {
            return Err(ConfigError::UnknownAdapter(name.to_string()));
        }

        self.factories
            .iter()
            .filter(|(id, _)| selection.is_none_or(|name| name == id))
            .map(|(_, factory)| factory(ctx))
            .collect()
    }
}

/// Register the reference adapters whose endpoints are configured.
///
/// `snapshot` is always registered; without a path it reports offline.
pub fn register_builtin_adapters(
    registry: &mut AdapterRegistry,
    endpoints: &SourceEndpoints,
) -> Result<(), ConfigError> {
    if endpoints.card_feed_url.is_some() {
        registry.register("card_feed", |ctx| {
            let url = ctx
                .endpoints
                .card_feed_url
                .clone()
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: "RACECARD_CARD_FEED_URL".into(),
                    hint: "set the card feed URL template".into(),
                })?;
            let fetcher = match &ctx.endpoints.card_feed_key {
                Some(key) => ctx.fetcher_with(
                    ctx.client
                        .clone()
                        .with_header(CARD_FEED_KEY_HEADER, key.expose_secret()),
                ),
                None => ctx.fetcher(),
            };
            Ok(Arc::new(CardFeedAdapter::new("card_feed", url, fetcher)) as Arc<dyn Adapter>)
        })?;
    }

    if endpoints.index_url.is_some() {
        registry.register("meeting_index", |ctx| {
            let raw = ctx
                .endpoints
                .index_url
                .as_deref()
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: "RACECARD_INDEX_URL".into(),
                    hint: "set the race index URL".into(),
                })?;
            let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                key: "RACECARD_INDEX_URL".into(),
                message: e.to_string(),
            })?;
            let mut adapter = MeetingIndexAdapter::new("meeting_index", url, ctx.fetcher());
            if let Some(limit) = ctx.endpoints.index_concurrency {
                adapter = adapter.with_concurrency(limit);
            }
            Ok(Arc::new(adapter) as Arc<dyn Adapter>)
        })?;
    }

    registry.register("snapshot", |ctx| {
        Ok(Arc::new(SnapshotAdapter::new("snapshot", ctx.endpoints.snapshot_path.clone()))
            as Arc<dyn Adapter>)
    })?;

    Ok(())
}
