use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// The routing tables never sleep; they only compare timestamps. Injecting
/// the clock lets embedders (and tests) control when routes expire.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
