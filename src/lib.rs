//! Racecard: resilient multi-source race data aggregation.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
