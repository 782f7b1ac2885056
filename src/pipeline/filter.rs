//! Pre-reconciliation event filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::types::NormalizedEvent;

/// Drops events before they reach the reconciler.
///
/// Every bound is optional; the default filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Minimum number of non-scratched participants.
    pub min_participants: Option<usize>,
    /// Earliest start time, inclusive.
    pub from: Option<DateTime<Utc>>,
    /// Latest start time, inclusive.
    pub to: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn min_participants(mut self, count: usize) -> Self {
        self.min_participants = Some(count);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        if let Some(min) = self.min_participants
            && event.active_participants().count() < min
        {
            return false;
        }
        if self.from.is_some_and(|from| event.start_time < from) {
            return false;
        }
        if self.to.is_some_and(|to| event.start_time > to) {
            return false;
        }
        true
    }

    pub fn apply(&self, events: Vec<NormalizedEvent>) -> Vec<NormalizedEvent> {
        let before = events.len();
        let kept: Vec<_> = events.into_iter().filter(|e| self.matches(e)).collect();
        if kept.len() < before {
            debug!(dropped = before - kept.len(), kept = kept.len(), "Filtered events");
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::NormalizedParticipant;
    use chrono::{Duration, TimeZone};

    fn event(hour: u32, runners: usize, scratched: usize) -> NormalizedEvent {
        let participants = (0..runners)
            .map(|i| {
                let p = NormalizedParticipant::new(format!("Runner {i}"), i as u32 + 1);
                if i < scratched { p.scratched() } else { p }
            })
            .collect();
        NormalizedEvent {
            source: "a".into(),
            source_event_id: None,
            venue: "Ascot".into(),
            sequence: hour,
            start_time: Utc.with_ymd_and_hms(2026, 10, 18, hour, 0, 0).unwrap(),
            event_type: "thoroughbred".into(),
            participants,
        }
    }

    #[test]
    fn default_filter_keeps_everything() {
        let events = vec![event(12, 0, 0), event(13, 8, 8)];
        assert_eq!(EventFilter::default().apply(events).len(), 2);
    }

    #[test]
    fn scratched_runners_do_not_count_toward_minimum() {
        let filter = EventFilter::default().min_participants(4);
        assert!(filter.matches(&event(12, 4, 0)));
        assert!(!filter.matches(&event(12, 5, 2)));
    }

    #[test]
    fn start_time_window_is_inclusive() {
        let from = Utc.with_ymd_and_hms(2026, 10, 18, 13, 0, 0).unwrap();
        let filter = EventFilter::default().between(from, from + Duration::hours(2));
        let kept: Vec<u32> = filter
            .apply((12..=16).map(|h| event(h, 1, 0)).collect())
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(kept, [13, 14, 15]);
    }
}
