use std::time::{Duration, Instant};

// Bound on catch-up so a stalled host frame cannot trigger a runaway burst
// of cycles.
const MAX_BURST: u32 = 64;

/// A fixed-rate scheduler domain. Each call to `due` reports how many whole
/// periods have elapsed since the last accounting, so callers can batch the
/// cycles owed for the current host frame.
pub struct Cadence {
    period: Duration,
    last: Instant,
}

impl Cadence {
    pub fn new(rate_hz: u64) -> Self {
        Self {
            period: Duration::from_nanos(1_000_000_000 / rate_hz.max(1)),
            last: Instant::now(),
        }
    }

    pub fn due(&mut self) -> u32 {
        let mut fired = 0;
        while fired < MAX_BURST && self.last.elapsed() >= self.period {
            self.last += self.period;
            fired += 1;
        }
        if fired == MAX_BURST {
            // drop the backlog instead of spiraling
            self.last = Instant::now();
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn nothing_due_before_the_first_period() {
        let mut cadence = Cadence::new(1);
        assert_eq!(cadence.due(), 0);
    }

    #[test]
    fn elapsed_periods_come_due_in_a_bounded_batch() {
        let mut cadence = Cadence::new(1000);
        thread::sleep(Duration::from_millis(10));
        let fired = cadence.due();
        assert!(fired >= 1);
        assert!(fired <= MAX_BURST);
    }
}
