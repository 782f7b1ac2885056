//! Record-level parsing shared by the JSON-based reference adapters.
//!
//! Card documents look like:
//!
//! ```json
//! { "meetings": [ {
//!     "venue": "Ascot", "event_type": "thoroughbred",
//!     "races": [ {
//!         "id": "ASC-3", "number": 3, "start_time": "2026-10-18T14:30:00Z",
//!         "runners": [ { "name": "Horse 1", "number": 1, "odds": "5/2",
//!                        "scratched": false, "jockey": "J. Doyle" } ]
//!     } ]
//! } ] }
//! ```
//!
//! `start_time` is RFC 3339 text or Unix seconds; `odds` is any notation
//! accepted by [`crate::normalize::odds`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::adapters::RawDocument;
use crate::error::{AdapterError, ParsingError};
use crate::normalize::{clean_text, odds};
use crate::pipeline::types::{NormalizedEvent, NormalizedParticipant};

/// Event type used when a document does not say.
pub const DEFAULT_EVENT_TYPE: &str = "thoroughbred";

/// Parse every part of a fetched card document on behalf of `adapter`.
///
/// A part that is not a card document fails the whole fetch.
pub fn parse_card_parts(adapter: &str, raw: RawDocument) -> Result<Vec<NormalizedEvent>, AdapterError> {
    let mut events = Vec::new();
    for part in raw.parts {
        let parsed = parse_card_document(adapter, &part.body).map_err(|e| AdapterError::Parsing {
            adapter: adapter.to_string(),
            reason: format!("{}: {e}", part.target),
        })?;
        events.extend(parsed);
    }
    Ok(events)
}

/// Parse every meeting in a card document, skipping bad races.
///
/// Errors only when the body is not a card document at all.
pub fn parse_card_document(source: &str, body: &str) -> Result<Vec<NormalizedEvent>, ParsingError> {
    let doc: Value = serde_json::from_str(body)?;
    let meetings = doc
        .get("meetings")
        .and_then(Value::as_array)
        .ok_or(ParsingError::MissingField("meetings"))?;

    let mut events = Vec::new();
    for meeting in meetings {
        let Some(venue) = meeting.get("venue").and_then(Value::as_str).and_then(clean_text) else {
            warn!(source, "Skipping meeting without a venue");
            continue;
        };
        let event_type = text(meeting, "event_type").unwrap_or_else(|| DEFAULT_EVENT_TYPE.into());
        let races = meeting.get("races").and_then(Value::as_array).into_iter().flatten();

        for race in races {
            match parse_race(source, &venue, &event_type, race) {
                Ok(event) => events.push(event),
                Err(e) => {
                    let id = race.get("id").unwrap_or(&Value::Null);
                    warn!(source, venue = %venue, race = %id, error = %e, "Skipping malformed race");
                }
            }
        }
    }
    Ok(events)
}

/// Parse one race record. Malformed runners are skipped, not fatal.
pub fn parse_race(
    source: &str,
    venue: &str,
    event_type: &str,
    race: &Value,
) -> Result<NormalizedEvent, ParsingError> {
    let sequence = number(race)?;
    let start_time = parse_start_time(race.get("start_time").unwrap_or(&Value::Null))?;

    let mut participants = Vec::new();
    for runner in race.get("runners").and_then(Value::as_array).into_iter().flatten() {
        match parse_runner(runner) {
            Ok(p) => participants.push(p),
            Err(e) => warn!(source, venue, race = sequence, error = %e, "Skipping malformed runner"),
        }
    }

    Ok(NormalizedEvent {
        source: source.to_string(),
        source_event_id: race.get("id").and_then(id_string),
        venue: venue.to_string(),
        sequence,
        start_time,
        event_type: event_type.to_string(),
        participants,
    })
}

/// Parse one runner. A missing or unreadable price is "no odds", not an error.
pub fn parse_runner(runner: &Value) -> Result<NormalizedParticipant, ParsingError> {
    let name = runner
        .get("name")
        .and_then(Value::as_str)
        .and_then(clean_text)
        .ok_or(ParsingError::MissingField("name"))?;
    let mut participant = NormalizedParticipant::new(name, number(runner)?);
    participant.odds = runner.get("odds").and_then(odds::odds_from_json);
    participant.scratched = runner
        .get("scratched")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    participant.jockey = text(runner, "jockey");
    participant.trainer = text(runner, "trainer");
    Ok(participant)
}

fn parse_start_time(value: &Value) -> Result<DateTime<Utc>, ParsingError> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ParsingError::InvalidValue {
                field: "start_time",
                value: s.clone(),
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| ParsingError::InvalidValue {
                field: "start_time",
                value: n.to_string(),
            }),
        Value::Null => Err(ParsingError::MissingField("start_time")),
        other => Err(ParsingError::InvalidValue {
            field: "start_time",
            value: other.to_string(),
        }),
    }
}

fn number(value: &Value) -> Result<u32, ParsingError> {
    let raw = value.get("number").ok_or(ParsingError::MissingField("number"))?;
    raw.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ParsingError::InvalidValue {
            field: "number",
            value: raw.to_string(),
        })
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).and_then(clean_text)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
