//! Screen-time domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Bucket that active minutes accrue to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Games,
    Lessons,
    Quizzes,
    #[default]
    Other,
}

/// Per-category minute totals for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBreakdown {
    pub games: u32,
    pub lessons: u32,
    pub quizzes: u32,
    pub other: u32,
}

impl ActivityBreakdown {
    pub fn add(&mut self, category: ActivityCategory, minutes: u32) {
        match category {
            ActivityCategory::Games => self.games += minutes,
            ActivityCategory::Lessons => self.lessons += minutes,
            ActivityCategory::Quizzes => self.quizzes += minutes,
            ActivityCategory::Other => self.other += minutes,
        }
    }
}

/// One record per calendar day, retained for a rolling 30-day window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyScreenTime {
    pub date: NaiveDate,
    pub total_minutes: u32,
    pub breakdown: ActivityBreakdown,
    pub sessions: u32,
}

impl DailyScreenTime {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_minutes: 0,
            breakdown: ActivityBreakdown::default(),
            sessions: 0,
        }
    }
}

/// Persisted marker for the in-progress session. Written on session start
/// and refreshed on every tick, so a crash loses at most one interval of
/// foreground time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub started_at: DateTime<Utc>,
    pub ticks_committed: u32,
    pub category: ActivityCategory,
}
