//! Shared types for the aggregation pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::EventKey;

// ── Normalized entities ─────────────────────────────────────────────

/// A runner (or other participant) as reported by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParticipant {
    /// Merge key within an event.
    pub name: String,
    /// Program / saddle-cloth / trap number.
    pub number: u32,
    /// Decimal odds, always ≥ 1.0 when present.
    pub odds: Option<Decimal>,
    #[serde(default)]
    pub scratched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jockey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer: Option<String>,
}

impl NormalizedParticipant {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
            odds: None,
            scratched: false,
            jockey: None,
            trainer: None,
        }
    }

    /// Set the odds. Values below 1.0 are dropped.
    pub fn with_odds(mut self, odds: Decimal) -> Self {
        self.odds = crate::normalize::odds::validate(odds);
        self
    }

    pub fn scratched(mut self) -> Self {
        self.scratched = true;
        self
    }

    pub fn with_jockey(mut self, jockey: impl Into<String>) -> Self {
        self.jockey = Some(jockey.into());
        self
    }

    pub fn with_trainer(mut self, trainer: impl Into<String>) -> Self {
        self.trainer = Some(trainer.into());
        self
    }

    /// Odds usable for scoring: present, at least 1.0, and not scratched.
    pub fn live_odds(&self) -> Option<Decimal> {
        if self.scratched {
            return None;
        }
        self.odds.filter(|o| *o >= Decimal::ONE)
    }
}

/// One event as reported by one source, after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Originating source id.
    pub source: String,
    /// The publisher's own id. Kept for tracing only, never used for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<String>,
    pub venue: String,
    /// Race number within the venue's schedule.
    pub sequence: u32,
    pub start_time: DateTime<Utc>,
    /// e.g. "thoroughbred", "greyhound", "harness".
    pub event_type: String,
    pub participants: Vec<NormalizedParticipant>,
}

impl NormalizedEvent {
    pub fn canonical_key(&self, window: Duration) -> EventKey {
        EventKey::derive(&self.venue, self.sequence, self.start_time, window)
    }

    /// Participants that have not been scratched.
    pub fn active_participants(&self) -> impl Iterator<Item = &NormalizedParticipant> {
        self.participants.iter().filter(|p| !p.scratched)
    }
}

// ── Merged + scored ─────────────────────────────────────────────────

/// An event after reconciliation across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEvent {
    pub canonical_id: EventKey,
    /// The event that supplied the metadata (highest-priority contributor),
    /// with the merged participant list.
    #[serde(flatten)]
    pub event: NormalizedEvent,
    /// Contributing sources, highest priority first.
    pub provenance: Vec<String>,
}

/// Outcome of one scoring factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorResult {
    pub points: i32,
    pub ok: bool,
    pub reason: String,
}

/// Explainable qualification verdict for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total: i32,
    pub qualified: bool,
    pub reasons: Vec<String>,
    pub factors: BTreeMap<String, FactorResult>,
}

/// A merged event with its score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    pub merged: MergedEvent,
    pub score: ScoreResult,
}

impl ScoredEvent {
    /// Flatten into the record shape consumed by API and dashboard collaborators.
    pub fn to_record(&self) -> EventRecord {
        let event = &self.merged.event;
        EventRecord {
            id: self.merged.canonical_id.to_string(),
            venue: event.venue.clone(),
            sequence: event.sequence,
            start_time: event.start_time,
            event_type: event.event_type.clone(),
            participants: event.participants.clone(),
            provenance: self.merged.provenance.clone(),
            score: self.score.total,
            qualified: self.score.qualified,
            reasons: self.score.reasons.clone(),
        }
    }
}

/// Flat, serializable view of a scored event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub venue: String,
    pub sequence: u32,
    pub start_time: DateTime<Utc>,
    pub event_type: String,
    pub participants: Vec<NormalizedParticipant>,
    pub provenance: Vec<String>,
    pub score: i32,
    pub qualified: bool,
    pub reasons: Vec<String>,
}

// ── Status report ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdapterOutcome {
    Ok,
    Error,
}

/// Per-adapter entry in the status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub adapter_id: String,
    pub status: AdapterOutcome,
    pub event_count: usize,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

impl AdapterStatus {
    pub fn ok(adapter_id: impl Into<String>, event_count: usize, elapsed: Duration) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterOutcome::Ok,
            event_count,
            error_message: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn error(adapter_id: impl Into<String>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterOutcome::Error,
            event_count: 0,
            error_message: Some(message.into()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AdapterOutcome::Ok
    }
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub events: Vec<ScoredEvent>,
    pub statuses: Vec<AdapterStatus>,
}

impl PipelineOutput {
    pub fn qualified(&self) -> impl Iterator<Item = &ScoredEvent> {
        self.events.iter().filter(|e| e.score.qualified)
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.events.iter().map(ScoredEvent::to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn with_odds_drops_sub_unit_prices() {
        let p = NormalizedParticipant::new("Runner", 1).with_odds(dec!(0.8));
        assert_eq!(p.odds, None);
        let p = NormalizedParticipant::new("Runner", 1).with_odds(dec!(4.0));
        assert_eq!(p.odds, Some(dec!(4)));
    }

    #[test]
    fn scratched_runner_has_no_live_odds() {
        let p = NormalizedParticipant::new("Runner", 1)
            .with_odds(dec!(3.0))
            .scratched();
        assert_eq!(p.live_odds(), None);
    }

    #[test]
    fn status_serializes_upper_case() {
        let status = AdapterStatus::ok("card_feed", 4, Duration::from_millis(120));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["event_count"], 4);
        assert!(json["error_message"].is_null());

        let status = AdapterStatus::error("index", "HTTP 503", Duration::ZERO);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["error_message"], "HTTP 503");
    }

    #[test]
    fn participant_serialization_omits_empty_connections() {
        let p = NormalizedParticipant::new("Runner", 2).with_jockey("R. Moore");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["jockey"], "R. Moore");
        assert!(json.get("trainer").is_none());
    }
}
