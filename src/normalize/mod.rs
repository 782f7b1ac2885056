//! Normalization shared by every adapter and by the reconciler.

pub mod odds;
pub mod venue;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use odds::parse_odds;
pub use venue::{clean_text, normalize_venue_name, venue_key};

/// Canonical identity of a real-world event.
///
/// Built from the venue key, the start time floored to a fixed window, and
/// the sequence number. Publisher-assigned ids are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub venue: String,
    pub bucket: DateTime<Utc>,
    pub sequence: u32,
}

impl EventKey {
    pub fn derive(venue: &str, sequence: u32, start_time: DateTime<Utc>, window: Duration) -> Self {
        Self {
            venue: venue_key(venue),
            bucket: time_bucket(start_time, window),
            sequence,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.venue,
            self.bucket.format("%Y%m%dT%H%M"),
            self.sequence
        )
    }
}

/// Floor a timestamp to the start of its window, counted from the Unix epoch.
///
/// A 24 hour window therefore buckets by UTC calendar day.
pub fn time_bucket(at: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let width = window.as_secs().max(1) as i64;
    let floored = at.timestamp().div_euclid(width) * width;
    DateTime::from_timestamp(floored, 0).unwrap_or(at)
}
