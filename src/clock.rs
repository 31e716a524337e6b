//! Time source used for backup timestamps and for pacing the run loop

use chrono::{Local, NaiveDateTime};
use std::sync::Mutex;
use std::time::Duration;

/// Format of every timestamp inserted into a file name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Wall clock plus the ability to wait, injected wherever time matters.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn sleep(&self, duration: Duration);

    /// Compact, sortable, second-resolution stamp for file names
    fn stamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Local time and a real thread sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to. Sleeping advances it instantly and
/// records the requested duration.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            if let Ok(delta) = chrono::Duration::from_std(by) {
                *now += delta;
            }
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}
