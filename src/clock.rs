use std::time::{Duration, Instant};

/// Source of elapsed time for the timer interrupt. The engine polls this
/// once per run-loop iteration and restarts it whenever it raises line 0.
pub trait Clock {
    /// Time since the last `restart` (or construction).
    fn elapsed_since_last_tick(&self) -> Duration;

    fn restart(&mut self);
}

/// Real wall-clock time, for running actual programs.
pub struct WallClock {
    last_tick: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        WallClock {
            last_tick: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn elapsed_since_last_tick(&self) -> Duration {
        self.last_tick.elapsed()
    }

    fn restart(&mut self) {
        self.last_tick = Instant::now();
    }
}

/// Hand-cranked clock for tests: time only passes when `advance` is called.
pub struct ManualClock {
    elapsed: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            elapsed: Duration::ZERO,
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn elapsed_since_last_tick(&self) -> Duration {
        self.elapsed
    }

    fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}
