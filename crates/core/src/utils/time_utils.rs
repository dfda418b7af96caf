//! Clock abstraction so date-sensitive rules run deterministically in tests.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of "now" for every component that reads the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The calendar day before `today`.
pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}
