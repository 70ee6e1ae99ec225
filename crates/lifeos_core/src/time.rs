//! Injected clock.
//!
//! Nothing in the kernel reads the wall clock directly; the composition root
//! hands a `TimeProvider` to every component that needs "now".

use crate::model::framework::Timestamp;
use std::sync::Mutex;

pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedTimeProvider {
    current: Mutex<Timestamp>,
}

impl FixedTimeProvider {
    pub fn new(at: Timestamp) -> Self {
        Self {
            current: Mutex::new(at),
        }
    }

    pub fn set(&self, at: Timestamp) {
        if let Ok(mut current) = self.current.lock() {
            *current = at;
        }
    }

    pub fn advance_seconds(&self, seconds: i64) {
        if let Ok(mut current) = self.current.lock() {
            *current = current.plus_seconds(seconds);
        }
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> Timestamp {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedTimeProvider, TimeProvider};
    use crate::model::framework::Timestamp;

    #[test]
    fn fixed_provider_moves_only_when_told() {
        let start: Timestamp = "2024-03-04T09:00:00Z".parse().expect("timestamp");
        let clock = FixedTimeProvider::new(start);
        assert_eq!(clock.now(), start);
        clock.advance_seconds(60);
        assert_eq!(clock.now(), start.plus_seconds(60));
    }
}
