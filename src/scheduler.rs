use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutinelyError};

pub const MIN_EASINESS_FACTOR: f64 = 1.3;
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;
pub const MAX_MASTERY_LEVEL: f64 = 2.0;
/// Longest gap between reviews. Keeps due dates well inside the stored range.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;
const FAILED_EF_PENALTY: f64 = 0.2;
const FAILED_MASTERY_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub last_reviewed: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,
    pub review_count: u32,
    pub mastery_level: f64,
    pub interval: u32,
    pub easiness_factor: f64,
}

impl ReviewState {
    /// Fresh state for an item created at `created_at`. It is due immediately.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            last_reviewed: created_at,
            next_review_date: created_at,
            review_count: 0,
            mastery_level: 0.0,
            interval: 1,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    pub fn mastery_label(&self) -> &'static str {
        if self.mastery_level <= 0.0 {
            "New"
        } else if self.mastery_level >= MAX_MASTERY_LEVEL {
            "Mastered"
        } else {
            "Learning"
        }
    }
}

/// Recall quality, 0 (blackout) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i64) -> Result<Self> {
        if (0..=5).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(RoutinelyError::validation(format!(
                "Quality must be between 0 and 5, got {}",
                value
            )))
        }
    }

    pub fn from_input(value: Option<i64>) -> Result<Self> {
        match value {
            Some(v) => Self::new(v),
            None => Err(RoutinelyError::validation("Quality is required")),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_successful(self) -> bool {
        self.0 >= 3
    }
}

/// SM-2 variant shared by every reviewable item.
///
/// Quality 3-5 steps the interval 1 day, then 6 days, then previous interval
/// times EF, moves EF by the SM-2 delta and raises mastery for 4 (+0.5) and
/// 5 (+1). Quality 0-2 resets the interval to 1 day and drops mastery by 0.5
/// and EF by 0.2. The 1-day and 6-day steps are keyed off the total review
/// count, failed attempts included. Intervals never exceed
/// [`MAX_INTERVAL_DAYS`].
pub fn review(state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
    let mut next = state.clone();
    next.review_count = state.review_count.saturating_add(1);
    next.last_reviewed = now;

    if quality.is_successful() {
        next.interval = match next.review_count {
            1 => 1,
            2 => 6,
            _ => scaled_interval(state.interval, state.easiness_factor),
        };

        let q = quality.value() as f64;
        let delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
        next.easiness_factor = (state.easiness_factor + delta).max(MIN_EASINESS_FACTOR);

        next.mastery_level = match quality.value() {
            5 => (state.mastery_level + 1.0).min(MAX_MASTERY_LEVEL),
            4 => (state.mastery_level + 0.5).min(MAX_MASTERY_LEVEL),
            _ => state.mastery_level,
        };
    } else {
        next.interval = 1;
        next.mastery_level = (state.mastery_level - FAILED_MASTERY_PENALTY).max(0.0);
        next.easiness_factor =
            (state.easiness_factor - FAILED_EF_PENALTY).max(MIN_EASINESS_FACTOR);
    }

    next.next_review_date = now
        .checked_add_signed(Duration::days(next.interval as i64))
        .unwrap_or(now);
    next
}

fn scaled_interval(previous: u32, easiness_factor: f64) -> u32 {
    let scaled = (previous.max(1) as f64 * easiness_factor).round();
    scaled.clamp(1.0, MAX_INTERVAL_DAYS as f64) as u32
}
