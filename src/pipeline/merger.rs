//! Cross-source reconciliation.
//!
//! Events are grouped by canonical identity. Within a group the
//! highest-priority source supplies the event metadata, participants are
//! merged by name with higher priority winning, and every contributing
//! source is recorded in `provenance`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::normalize::EventKey;
use crate::pipeline::types::{MergedEvent, NormalizedEvent, NormalizedParticipant};

/// Deduplicates and merges events reported by several sources.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Source ids, highest priority first.
    priority: Vec<String>,
    window: Duration,
}

impl Reconciler {
    pub fn new(priority: Vec<String>, window: Duration) -> Self {
        Self { priority, window }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.source_priority.clone(), config.identity_window)
    }

    /// Rank of a source; unknown sources rank after every listed one.
    pub fn rank(&self, source: &str) -> usize {
        self.priority
            .iter()
            .position(|s| s == source)
            .unwrap_or(self.priority.len())
    }

    /// Merge events into one [`MergedEvent`] per canonical identity, ordered
    /// by identity.
    ///
    /// The result does not depend on the order of `events`.
    pub fn reconcile(&self, events: Vec<NormalizedEvent>) -> Vec<MergedEvent> {
        let total = events.len();
        let mut groups: BTreeMap<EventKey, Vec<NormalizedEvent>> = BTreeMap::new();
        for event in events {
            groups
                .entry(event.canonical_key(self.window))
                .or_default()
                .push(event);
        }

        let merged: Vec<MergedEvent> = groups
            .into_iter()
            .map(|(key, group)| self.merge_group(key, group))
            .collect();
        debug!(events_in = total, events_out = merged.len(), "Reconciled events");
        merged
    }

    fn merge_group(&self, key: EventKey, mut group: Vec<NormalizedEvent>) -> MergedEvent {
        if group.len() == 1 {
            let event = group.remove(0);
            return MergedEvent {
                canonical_id: key,
                provenance: vec![event.source.clone()],
                event,
            };
        }

        group.sort_by(|a, b| {
            (self.rank(&a.source), &a.source, &a.source_event_id)
                .cmp(&(self.rank(&b.source), &b.source, &b.source_event_id))
        });

        // Lowest priority first so higher-priority entries overwrite.
        let mut by_name: HashMap<String, NormalizedParticipant> = HashMap::new();
        for event in group.iter().rev() {
            for participant in &event.participants {
                by_name.insert(participant.name.clone(), participant.clone());
            }
        }
        let mut participants: Vec<NormalizedParticipant> = by_name.into_values().collect();
        participants.sort_by(|a, b| (a.number, &a.name).cmp(&(b.number, &b.name)));

        let mut provenance: Vec<String> = group.iter().map(|e| e.source.clone()).collect();
        provenance.dedup();

        let mut event = group.swap_remove(0);
        event.participants = participants;

        MergedEvent {
            canonical_id: key,
            event,
            provenance,
        }
    }
}
