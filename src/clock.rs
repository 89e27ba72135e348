use std::cell::Cell;

use chrono::{Duration, Local, NaiveDateTime};

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the machine's local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Used to drive the engine deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { now: Cell::new(start) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
