//! XP, level, and streak rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::time_utils::yesterday;

/// XP required per level.
pub const XP_PER_LEVEL: u64 = 100;

/// Locally persisted progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub last_login_date: Option<NaiveDate>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 0,
            last_login_date: None,
        }
    }
}

/// `level == floor(xp / 100) + 1`. The stored level is display-only; this
/// function is the single source of truth.
pub fn level_for_xp(xp: u64) -> u32 {
    (xp / XP_PER_LEVEL) as u32 + 1
}

/// How a cold-start rollover changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    Incremented,
    Reset,
    Unchanged,
}

/// Daily streak rollover: last login yesterday increments, any other
/// non-today date (or a first login) resets to 1, a same-day login is a
/// no-op.
pub fn roll_streak(
    current: u32,
    last_login: Option<NaiveDate>,
    today: NaiveDate,
) -> (u32, StreakTransition) {
    match last_login {
        Some(date) if date == today => (current, StreakTransition::Unchanged),
        Some(date) if date == yesterday(today) => {
            (current.saturating_add(1), StreakTransition::Incremented)
        }
        _ => (1, StreakTransition::Reset),
    }
}
