use std::time::{Instant, SystemTime};

/// Time source for the controller: a monotonic clock to measure elapsed play
/// time, and wall-clock time to stamp `last_played`.
pub trait Clock {
    fn now(&self) -> Instant;
    fn wall_time(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }
}
