//! Report cadence.

/// Counts loop iterations and flags the ones a report is due on.
///
/// The counter ticks once per iteration whether or not the iteration
/// produced a reading, so reports land on exact multiples of the interval
/// and the cadence drifts with loop latency instead of tracking the wall
/// clock.
#[derive(Debug, Clone)]
pub struct ReportCadence {
    interval: u32,
    since_last: u32,
    iteration: u32,
}

impl ReportCadence {
    pub const fn new(interval: u32) -> Self {
        let interval = if interval == 0 { 1 } else { interval };
        Self {
            interval,
            since_last: 0,
            iteration: 0,
        }
    }

    /// Advances to the next iteration. True when a report is due.
    pub fn tick(&mut self) -> bool {
        self.iteration = self.iteration.wrapping_add(1);
        self.since_last += 1;
        if self.since_last >= self.interval {
            self.since_last = 0;
            true
        } else {
            false
        }
    }

    /// Iterations completed so far; the first `tick` makes this 1.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }
}
