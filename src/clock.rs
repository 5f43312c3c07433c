//! Reference clock for "today" and "now".
//!
//! Everything that needs the current month, day or year takes its notion of
//! time from a [`Clock`] rather than reading the system clock at module load,
//! so current-month defaults and quote-time year substitution are
//! deterministic under test.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};

/// Source of the reference date/time threaded into every "today"-sensitive call.
pub trait Clock {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current calendar month (1-12).
    fn current_month(&self) -> u32 {
        self.today().month()
    }

    /// Current calendar year.
    fn current_year(&self) -> i32 {
        self.today().year()
    }
}

/// Clock backed by the system's local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a fixed instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_reports_pinned_month_and_year() {
        let instant = NaiveDate::from_ymd_opt(2014, 5, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.today(), instant.date());
        assert_eq!(clock.current_month(), 5);
        assert_eq!(clock.current_year(), 2014);
    }
}
