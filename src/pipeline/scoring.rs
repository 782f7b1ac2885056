//! Explainable qualification scoring.
//!
//! Three factors, each reported with its points and a human-readable reason:
//! field size, favorite odds and second-favorite odds. Only participants
//! that are running and carry odds of at least 1.0 are counted.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::config::ScoringThresholds;
use crate::pipeline::types::{FactorResult, MergedEvent, ScoreResult};

pub const FIELD_SIZE: &str = "field_size";
pub const FAVORITE_ODDS: &str = "favorite_odds";
pub const SECOND_FAVORITE_ODDS: &str = "second_favorite_odds";

/// Reason given when no participant has usable odds.
pub const NO_ODDS_DATA: &str = "no odds data";
/// Reason appended when only one participant has usable odds.
pub const INSUFFICIENT_PARTICIPANTS: &str = "insufficient participants for full analysis";

/// Scores merged events against a fixed set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    thresholds: ScoringThresholds,
}

impl ScoringEngine {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    pub fn score(&self, event: &MergedEvent) -> ScoreResult {
        score(event, &self.thresholds)
    }
}

/// Score one event. Pure: identical input always gives identical output.
pub fn score(event: &MergedEvent, thresholds: &ScoringThresholds) -> ScoreResult {
    let mut odds: Vec<Decimal> = event
        .event
        .participants
        .iter()
        .filter_map(|p| p.live_odds())
        .collect();
    odds.sort();

    if odds.is_empty() {
        return ScoreResult {
            total: 0,
            qualified: false,
            reasons: vec![NO_ODDS_DATA.to_string()],
            factors: BTreeMap::new(),
        };
    }

    let mut factors = Vec::with_capacity(3);
    factors.push((FIELD_SIZE, field_size(odds.len(), thresholds)));

    if let [favorite, second, ..] = odds.as_slice() {
        factors.push((FAVORITE_ODDS, favorite_odds(*favorite, thresholds)));
        factors.push((SECOND_FAVORITE_ODDS, second_favorite_odds(*second, thresholds)));
    }

    let total: i32 = factors.iter().map(|(_, f)| f.points).sum();
    let mut reasons: Vec<String> = factors.iter().map(|(_, f)| f.reason.clone()).collect();
    if odds.len() == 1 {
        reasons.push(INSUFFICIENT_PARTICIPANTS.to_string());
    }

    ScoreResult {
        total,
        qualified: total >= thresholds.qualification_threshold,
        reasons,
        factors: factors
            .into_iter()
            .map(|(name, f)| (name.to_string(), f))
            .collect(),
    }
}

fn field_size(count: usize, t: &ScoringThresholds) -> FactorResult {
    if t.field_optimal.contains(count) {
        FactorResult {
            points: t.field_optimal.points,
            ok: true,
            reason: format!("Optimal field size ({count} runners)"),
        }
    } else if t.field_acceptable.contains(count) {
        FactorResult {
            points: t.field_acceptable.points,
            ok: true,
            reason: format!("Acceptable field size ({count} runners)"),
        }
    } else {
        FactorResult {
            points: t.field_penalty_points,
            ok: false,
            reason: format!("Field size not ideal ({count} runners)"),
        }
    }
}

fn favorite_odds(odds: Decimal, t: &ScoringThresholds) -> FactorResult {
    if odds <= t.favorite_max_odds {
        FactorResult {
            points: t.favorite_points,
            ok: true,
            reason: format!("Favorite odds OK ({odds})"),
        }
    } else {
        FactorResult {
            points: 0,
            ok: false,
            reason: format!("Favorite odds too high ({odds})"),
        }
    }
}

fn second_favorite_odds(odds: Decimal, t: &ScoringThresholds) -> FactorResult {
    if odds >= t.second_favorite_min_odds {
        FactorResult {
            points: t.second_favorite_points,
            ok: true,
            reason: format!("2nd Favorite odds OK ({odds})"),
        }
    } else {
        FactorResult {
            points: 0,
            ok: false,
            reason: format!("2nd Favorite odds too low ({odds})"),
        }
    }
}
