//! Pipeline orchestrator: one aggregation run end to end.
//!
//! Flow:
//! 1. Validate configuration and build the active adapters
//! 2. Run every adapter concurrently, each under its own timeout
//! 3. Collect results against the overall deadline into a status report
//! 4. Filter, reconcile and score the surviving events
//!
//! Only configuration problems fail a run. Anything an adapter does,
//! including panicking, ends up as an `ERROR` status.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::{Adapter, AdapterContext, AdapterRegistry};
use crate::config::PipelineConfig;
use crate::error::{AdapterError, PipelineError};
use crate::pipeline::filter::EventFilter;
use crate::pipeline::merger::Reconciler;
use crate::pipeline::scoring::ScoringEngine;
use crate::pipeline::types::{AdapterStatus, NormalizedEvent, PipelineOutput, ScoredEvent};

/// Deadline used when the configured timeout is past the clock's range.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

type AdapterRun = (Result<Vec<NormalizedEvent>, AdapterError>, Duration);

/// Runs the fetch → reconcile → score pipeline over the registered adapters.
pub struct Orchestrator {
    config: PipelineConfig,
    registry: AdapterRegistry,
    context: AdapterContext,
    reconciler: Reconciler,
    scoring: ScoringEngine,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, registry: AdapterRegistry, context: AdapterContext) -> Self {
        let reconciler = Reconciler::from_config(&config);
        let scoring = ScoringEngine::new(config.scoring.clone());
        Self {
            config,
            registry,
            context,
            reconciler,
            scoring,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Run the pipeline once.
    ///
    /// `selection` restricts the run to a single registered adapter.
    /// Fails only when the configuration is unusable; adapter failures are
    /// reported in [`PipelineOutput::statuses`].
    pub async fn run(
        &self,
        selection: Option<&str>,
        filter: &EventFilter,
    ) -> Result<PipelineOutput, PipelineError> {
        self.config.validate()?;
        let adapters = self.registry.build(&self.context, selection)?;
        Ok(self.run_adapters(adapters, filter).await)
    }

    /// Run the given adapters. Assumes the configuration is valid.
    pub async fn run_adapters(
        &self,
        adapters: Vec<Arc<dyn Adapter>>,
        filter: &EventFilter,
    ) -> PipelineOutput {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let deadline = started
            .checked_add(self.config.pipeline_timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        info!(run_id = %run_id, adapters = adapters.len(), "Starting pipeline run");

        let handles: Vec<(String, JoinHandle<AdapterRun>)> = adapters
            .into_iter()
            .map(|adapter| {
                let id = adapter.id().to_string();
                let handle = tokio::spawn(run_adapter(adapter, self.config.adapter_timeout));
                (id, handle)
            })
            .collect();

        let mut statuses = Vec::with_capacity(handles.len());
        let mut collected = Vec::new();
        for (id, mut handle) in handles {
            let (result, elapsed) = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(run)) => run,
                Ok(Err(e)) => (
                    Err(AdapterError::Unexpected {
                        adapter: id.clone(),
                        reason: join_error_reason(e),
                    }),
                    started.elapsed(),
                ),
                Err(_) => {
                    handle.abort();
                    (
                        Err(AdapterError::Timeout {
                            adapter: id.clone(),
                            after: self.config.pipeline_timeout,
                        }),
                        started.elapsed(),
                    )
                }
            };

            match result {
                Ok(events) => {
                    info!(adapter = %id, count = events.len(), elapsed_ms = elapsed.as_millis() as u64, "Adapter succeeded");
                    statuses.push(AdapterStatus::ok(&id, events.len(), elapsed));
                    collected.extend(events);
                }
                Err(e) => {
                    match &e {
                        AdapterError::Unexpected { .. } => error!(adapter = %id, error = %e, "Adapter crashed"),
                        _ => warn!(adapter = %id, error = %e, "Adapter failed"),
                    }
                    statuses.push(AdapterStatus::error(&id, e.to_string(), elapsed));
                }
            }
        }

        let fetched = collected.len();
        let filtered = filter.apply(collected);
        let kept = filtered.len();
        let events: Vec<ScoredEvent> = self
            .reconciler
            .reconcile(filtered)
            .into_iter()
            .map(|merged| {
                let score = self.scoring.score(&merged);
                ScoredEvent { merged, score }
            })
            .collect();

        let output = PipelineOutput {
            run_id,
            started_at,
            events,
            statuses,
        };
        info!(
            run_id = %run_id,
            adapters_ok = output.statuses.iter().filter(|s| s.is_ok()).count(),
            adapters_failed = output.statuses.iter().filter(|s| !s.is_ok()).count(),
            events_fetched = fetched,
            events_kept = kept,
            events_merged = output.events.len(),
            qualified = output.qualified().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );
        output
    }
}

async fn run_adapter(adapter: Arc<dyn Adapter>, timeout: Duration) -> AdapterRun {
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, adapter.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout {
            adapter: adapter.id().to_string(),
            after: timeout,
        }),
    };
    (result, start.elapsed())
}

fn join_error_reason(e: JoinError) -> String {
    if e.is_cancelled() {
        return "task cancelled".to_string();
    }
    match e.try_into_panic() {
        Ok(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        Err(e) => e.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
