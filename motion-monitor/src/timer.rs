use std::time::{Duration, Instant};

/// Fixed rate loop pacer.
///
/// Each call to `sleep` blocks until the next tick boundary. A loop iteration that overruns by
/// more than one period does not cause a burst of catch-up ticks; the schedule restarts instead.
pub struct Timer {
    next: Instant,
    period: Duration,
}

impl Timer {
    pub fn new(period: Duration) -> Self {
        Self {
            next: Instant::now() + period,
            period,
        }
    }

    pub fn sleep(&mut self) {
        let now = Instant::now();

        if let Some(duration) = self.next.checked_duration_since(now) {
            std::thread::sleep(duration);
            self.next += self.period;
        } else {
            self.next = now + self.period;
        }
    }
}
