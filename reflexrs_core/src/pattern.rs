use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Namespace used when a pattern is saved without an explicit space.
pub const GLOBAL_SPACE: &str = "global";

/// Maximum trigger length, counted in characters after trimming.
pub const MAX_TRIGGER_CHARS: usize = 500;

pub const MAX_STRENGTH: f64 = 100.0;
pub const DEFAULT_THRESHOLD: f64 = 50.0;
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// One decay period. `apply_decay` scales the per-period rate by how many
/// periods the elapsed time covers.
pub const DECAY_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A trigger → response association with strength/decay state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    pub trigger: String,
    pub response: String,

    pub strength: f64,
    pub threshold: f64,
    pub decay_rate: f64,
    pub decay_enabled: bool,

    pub reinforce_count: i64,
    pub decay_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,

    pub project: String,
    pub tags: Vec<String>,
    pub connections: Vec<String>,
    pub space_id: String,
    pub user_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `Some` once soft-deleted. Never cleared by normal operations.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Pattern {
    /// Create a fresh pattern with zero strength and default threshold.
    #[must_use]
    pub fn new(trigger: impl Into<String>, response: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            trigger: trigger.into(),
            response: response.into(),
            strength: 0.0,
            threshold: DEFAULT_THRESHOLD,
            decay_rate: DEFAULT_DECAY_RATE,
            decay_enabled: true,
            reinforce_count: 0,
            decay_count: 0,
            last_used_at: None,
            project: String::new(),
            tags: Vec::new(),
            connections: Vec::new(),
            space_id: GLOBAL_SPACE.to_string(),
            user_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    #[must_use]
    pub fn with_space(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = space_id.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_decay_rate(mut self, decay_rate: f64) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    /// Check every field bound. On success the trigger is rewritten trimmed.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        let trimmed = self.trigger.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new("trigger", "must not be empty"));
        }
        let len = trimmed.chars().count();
        if len > MAX_TRIGGER_CHARS {
            return Err(ValidationError::new(
                "trigger",
                format!("must be at most {MAX_TRIGGER_CHARS} characters, got {len}"),
            ));
        }
        if self.response.trim().is_empty() {
            return Err(ValidationError::new("response", "must not be empty"));
        }
        check_range("strength", self.strength, 0.0, MAX_STRENGTH)?;
        check_range("threshold", self.threshold, 0.0, MAX_STRENGTH)?;
        check_range("decay_rate", self.decay_rate, 0.0, 1.0)?;

        if trimmed.len() != self.trigger.len() {
            self.trigger = trimmed.to_string();
        }
        Ok(())
    }

    /// Lose `decay_rate` of the current strength per elapsed `DECAY_PERIOD`.
    ///
    /// Returns `false` without touching anything when decay is disabled or
    /// `elapsed` is zero.
    pub fn apply_decay(&mut self, elapsed: Duration) -> bool {
        if !self.decay_enabled || elapsed.is_zero() {
            return false;
        }
        let periods = elapsed.as_secs_f64() / DECAY_PERIOD.as_secs_f64();
        let retained = (1.0 - self.decay_rate.clamp(0.0, 1.0)).powf(periods);
        self.strength = clamp_strength(self.strength * retained);
        self.decay_count += 1;
        true
    }

    /// Raise strength by `amount`, saturating at 100.
    pub fn reinforce(&mut self, amount: f64) {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        self.strength = clamp_strength(self.strength + amount);
        self.reinforce_count += 1;
        self.last_used_at = Some(Utc::now());
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.strength >= self.threshold
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::new(
            field,
            format!("must be within [{min}, {max}], got {value}"),
        ));
    }
    Ok(())
}

fn clamp_strength(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_STRENGTH)
    }
}
