//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Retry and backoff settings for the fetch client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound on the exponential part of the delay.
    pub max_delay: Duration,
    /// Jitter added on top of each delay, as a fraction of it. Must be in `[0, 1)`.
    pub jitter_ratio: f64,
    /// Timeout for a single HTTP round trip.
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter_ratio: 0.5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Inclusive participant-count band with the points it awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRange {
    pub min: usize,
    pub max: usize,
    pub points: i32,
}

impl TierRange {
    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// Thresholds for the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    pub field_optimal: TierRange,
    pub field_acceptable: TierRange,
    /// Points awarded (usually negative) when the field is in neither tier.
    pub field_penalty_points: i32,
    /// The favorite passes when its odds are at or below this.
    pub favorite_max_odds: Decimal,
    pub favorite_points: i32,
    /// The second favorite passes when its odds are at or above this.
    pub second_favorite_min_odds: Decimal,
    pub second_favorite_points: i32,
    /// Minimum total score for an event to be qualified.
    pub qualification_threshold: i32,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            field_optimal: TierRange {
                min: 4,
                max: 6,
                points: 30,
            },
            field_acceptable: TierRange {
                min: 7,
                max: 8,
                points: 10,
            },
            field_penalty_points: -20,
            favorite_max_odds: dec!(3.5),
            favorite_points: 30,
            second_favorite_min_odds: dec!(4.0),
            second_favorite_points: 40,
            qualification_threshold: 75,
        }
    }
}

impl ScoringThresholds {
    /// Check the thresholds for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, tier) in [
            ("field_optimal", &self.field_optimal),
            ("field_acceptable", &self.field_acceptable),
        ] {
            if tier.min > tier.max {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("min {} exceeds max {}", tier.min, tier.max),
                });
            }
        }
        for (key, odds) in [
            ("favorite_max_odds", self.favorite_max_odds),
            ("second_favorite_min_odds", self.second_favorite_min_odds),
        ] {
            if odds < Decimal::ONE {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("decimal odds must be at least 1.0, got {odds}"),
                });
            }
        }
        Ok(())
    }
}

/// Everything a pipeline run needs besides the adapters themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source ids, highest priority first.
    pub source_priority: Vec<String>,
    pub scoring: ScoringThresholds,
    pub retry: RetryConfig,
    /// Deadline for a single adapter's `fetch()`.
    pub adapter_timeout: Duration,
    /// Deadline for the whole fan-out.
    pub pipeline_timeout: Duration,
    /// Width of the start-time bucket used for canonical event identity.
    pub identity_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_priority: Vec::new(),
            scoring: ScoringThresholds::default(),
            retry: RetryConfig::default(),
            adapter_timeout: Duration::from_secs(30),
            pipeline_timeout: Duration::from_secs(90),
            identity_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl PipelineConfig {
    /// Build a config from defaults overlaid with `RACECARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(list) = std::env::var("RACECARD_SOURCE_PRIORITY") {
            config.source_priority = split_list(&list);
        }

        let retry = &mut config.retry;
        override_from_env(&mut retry.max_attempts, "RACECARD_RETRY_ATTEMPTS")?;
        override_millis(&mut retry.min_delay, "RACECARD_RETRY_MIN_DELAY_MS")?;
        override_millis(&mut retry.max_delay, "RACECARD_RETRY_MAX_DELAY_MS")?;
        override_from_env(&mut retry.jitter_ratio, "RACECARD_RETRY_JITTER")?;
        override_secs(&mut retry.request_timeout, "RACECARD_REQUEST_TIMEOUT_SECS")?;

        let scoring = &mut config.scoring;
        override_from_env(&mut scoring.field_optimal.min, "RACECARD_FIELD_OPTIMAL_MIN")?;
        override_from_env(&mut scoring.field_optimal.max, "RACECARD_FIELD_OPTIMAL_MAX")?;
        override_from_env(&mut scoring.field_optimal.points, "RACECARD_FIELD_OPTIMAL_POINTS")?;
        override_from_env(&mut scoring.field_acceptable.min, "RACECARD_FIELD_ACCEPTABLE_MIN")?;
        override_from_env(&mut scoring.field_acceptable.max, "RACECARD_FIELD_ACCEPTABLE_MAX")?;
        override_from_env(
            &mut scoring.field_acceptable.points,
            "RACECARD_FIELD_ACCEPTABLE_POINTS",
        )?;
        override_from_env(&mut scoring.field_penalty_points, "RACECARD_FIELD_PENALTY_POINTS")?;
        override_from_env(&mut scoring.favorite_max_odds, "RACECARD_FAV_MAX_ODDS")?;
        override_from_env(&mut scoring.favorite_points, "RACECARD_FAV_POINTS")?;
        override_from_env(&mut scoring.second_favorite_min_odds, "RACECARD_SECOND_FAV_MIN_ODDS")?;
        override_from_env(&mut scoring.second_favorite_points, "RACECARD_SECOND_FAV_POINTS")?;
        override_from_env(&mut scoring.qualification_threshold, "RACECARD_QUALIFICATION_SCORE")?;

        override_secs(&mut config.adapter_timeout, "RACECARD_ADAPTER_TIMEOUT_SECS")?;
        override_secs(&mut config.pipeline_timeout, "RACECARD_PIPELINE_TIMEOUT_SECS")?;
        override_secs(&mut config.identity_window, "RACECARD_IDENTITY_WINDOW_SECS")?;

        config.validate()?;
        Ok(config)
    }

    /// Check all invariants. Called before any adapter runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "at least one attempt is required"));
        }
        if retry.min_delay > retry.max_delay {
            return Err(invalid(
                "retry.min_delay",
                format!("{:?} exceeds max_delay {:?}", retry.min_delay, retry.max_delay),
            ));
        }
        if !(0.0..1.0).contains(&retry.jitter_ratio) {
            return Err(invalid(
                "retry.jitter_ratio",
                format!("{} is outside [0, 1)", retry.jitter_ratio),
            ));
        }
        if self.adapter_timeout.is_zero() || self.pipeline_timeout.is_zero() {
            return Err(invalid("timeouts", "timeouts must be non-zero"));
        }
        if std::time::Instant::now().checked_add(self.pipeline_timeout).is_none() {
            return Err(invalid(
                "pipeline_timeout",
                format!("{:?} is beyond the clock's range", self.pipeline_timeout),
            ));
        }
        if self.adapter_timeout > self.pipeline_timeout {
            return Err(invalid(
                "adapter_timeout",
                format!(
                    "{:?} exceeds pipeline_timeout {:?}",
                    self.adapter_timeout, self.pipeline_timeout
                ),
            ));
        }
        if self.identity_window.as_secs() < 60 {
            return Err(invalid("identity_window", "window must be at least one minute"));
        }
        Ok(())
    }
}

/// Endpoints for the built-in adapters, read from the environment.
#[derive(Debug, Clone, Default)]
pub struct SourceEndpoints {
    pub card_feed_url: Option<String>,
    pub card_feed_key: Option<secrecy::SecretString>,
    pub index_url: Option<String>,
    pub snapshot_path: Option<std::path::PathBuf>,
    /// Cap on concurrent detail fetches for the race index.
    pub index_concurrency: Option<usize>,
}

impl SourceEndpoints {
    pub fn from_env() -> Result<Self, ConfigError> {
        let index_concurrency = match std::env::var("RACECARD_INDEX_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => return Err(invalid("RACECARD_INDEX_CONCURRENCY", "must be at least 1")),
                Ok(n) => Some(n),
                Err(e) => return Err(invalid("RACECARD_INDEX_CONCURRENCY", e.to_string())),
            },
            Err(_) => None,
        };
        Ok(Self {
            card_feed_url: std::env::var("RACECARD_CARD_FEED_URL").ok(),
            card_feed_key: std::env::var("RACECARD_CARD_FEED_KEY")
                .ok()
                .map(secrecy::SecretString::from),
            index_url: std::env::var("RACECARD_INDEX_URL").ok(),
            snapshot_path: std::env::var("RACECARD_SNAPSHOT_PATH").ok().map(Into::into),
            index_concurrency,
        })
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn override_from_env<T>(slot: &mut T, key: &str) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        *slot = raw.trim().parse().map_err(|e: T::Err| invalid(key, e.to_string()))?;
    }
    Ok(())
}

fn override_secs(slot: &mut Duration, key: &str) -> Result<(), ConfigError> {
    let mut secs = slot.as_secs();
    override_from_env(&mut secs, key)?;
    *slot = Duration::from_secs(secs);
    Ok(())
}

fn override_millis(slot: &mut Duration, key: &str) -> Result<(), ConfigError> {
    let mut millis = slot.as_millis() as u64;
    override_from_env(&mut millis, key)?;
    *slot = Duration::from_millis(millis);
    Ok(())
}
