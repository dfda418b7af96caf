//! Scheduler constants/helpers for periodic sync work.

/// Session tick cadence: one committed minute per tick.
pub const SESSION_TICK_INTERVAL_SECS: u64 = 60;

/// Background reconcile cadence (queue drain, class retry, wellbeing push).
pub const BACKGROUND_SYNC_INTERVAL_SECS: u64 = 300;

/// Maximum jitter (seconds) added to periodic cycle intervals.
pub const BACKGROUND_SYNC_JITTER_SECS: u64 = 5;

/// Short delay when operations are known to be waiting for replay.
pub const PENDING_DRAIN_DELAY_MS: u64 = 2_000;

/// Exponential backoff in seconds with cap.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    const MAX_EXPONENT: i32 = 8;
    const BASE_DELAY_SECONDS: i64 = 5;

    let capped = consecutive_failures.clamp(0, MAX_EXPONENT);
    2_i64.pow(capped as u32) * BASE_DELAY_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_seconds(0), 5);
        assert_eq!(backoff_seconds(1), 10);
        assert_eq!(backoff_seconds(2), 20);
        assert_eq!(backoff_seconds(9), backoff_seconds(8));
    }
}
