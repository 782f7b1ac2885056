//! Aggregation pipeline.
//!
//! Every run flows through:
//! 1. `Adapter::fetch()` — per-source I/O and normalization, run concurrently
//! 2. `EventFilter::apply()` — drop events the caller is not interested in
//! 3. `Reconciler::reconcile()` — one event per canonical identity
//! 4. `ScoringEngine::score()` — explainable qualification verdict
//!
//! The orchestrator drives the whole flow and owns the status report.

pub mod filter;
pub mod merger;
pub mod orchestrator;
pub mod scoring;
pub mod types;

pub use filter::EventFilter;
pub use merger::Reconciler;
pub use orchestrator::Orchestrator;
pub use scoring::{ScoringEngine, score};
