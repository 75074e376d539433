use std::cell::Cell;
use std::time::{Duration, Instant};

/// Time source for the scan debounce, so tests can run on virtual time.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Cell<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Accumulating,
}

/// Last-keystroke-wins debounce. USB scanners type like a keyboard and send
/// no end-of-scan marker; a scan is complete once the field has been quiet
/// for `quiet`. At most one deadline is pending at any time.
#[derive(Debug, Clone)]
pub struct Debounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    pub fn state(&self) -> DetectorState {
        if self.deadline.is_some() {
            DetectorState::Accumulating
        } else {
            DetectorState::Idle
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels any pending deadline and arms a new one.
    pub fn keystroke(&mut self, now: Instant) -> Instant {
        let deadline = now + self.quiet;
        self.deadline = Some(deadline);
        deadline
    }

    /// Fires once the quiet period has elapsed, returning to `Idle`.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
