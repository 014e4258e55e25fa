//! Injectable wall clock, so multi-tick scenarios run without real time.

use chrono::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::Clock;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::cell::Cell;

    /// Test clock advanced by hand.
    #[derive(Debug)]
    pub struct ManualClock(Cell<DateTime<Utc>>);

    impl ManualClock {
        pub fn at(rfc3339: &str) -> Self {
            Self(Cell::new(
                DateTime::parse_from_rfc3339(rfc3339)
                    .expect("valid")
                    .with_timezone(&Utc),
            ))
        }

        pub fn advance_secs(&self, secs: i64) {
            self.0.set(self.0.get() + TimeDelta::seconds(secs));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }
}
