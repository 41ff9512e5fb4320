//! Fixed-period cycle pacing.
//!
//! Best effort only: a cycle whose work overruns the period is followed
//! immediately by the next one. Nothing is skipped and nothing is caught up.

use crate::clock::Clock;

#[derive(Debug, Clone, Copy)]
pub struct Governor {
    period_ms: u32,
    cycle_start_ms: u64,
    last_busy_ms: u32,
}

impl Governor {
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            cycle_start_ms: 0,
            last_busy_ms: 0,
        }
    }

    pub fn start_cycle(&mut self, now_ms: u64) {
        self.cycle_start_ms = now_ms;
    }

    /// Records the time spent between cycle start and the end of the
    /// frame. Reported in the next frame.
    pub fn finish_work(&mut self, now_ms: u64) -> u32 {
        let busy = now_ms.saturating_sub(self.cycle_start_ms);
        self.last_busy_ms = u32::try_from(busy).unwrap_or(u32::MAX);
        if self.last_busy_ms > self.period_ms {
            efis_warn!("cycle overran: {} ms > {} ms", self.last_busy_ms, self.period_ms);
        }
        self.last_busy_ms
    }

    pub fn last_busy_ms(&self) -> u32 {
        self.last_busy_ms
    }

    /// Start time of the next cycle.
    pub fn deadline_ms(&self) -> u64 {
        self.cycle_start_ms + self.period_ms as u64
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.deadline_ms().saturating_sub(now_ms)
    }

    pub fn is_boundary(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.cycle_start_ms) >= self.period_ms as u64
    }

    /// Runs `service` at least once, then until the period has elapsed.
    /// Returns the time at which the boundary was observed.
    pub fn idle_until_boundary<C: Clock>(&self, clock: &C, mut service: impl FnMut()) -> u64 {
        loop {
            service();
            let now = clock.now_ms();
            if self.is_boundary(now) {
                return now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    #[test]
    fn waits_out_the_remaining_period() {
        let clock = MockClock::new();
        let mut g = Governor::new(100);
        g.start_cycle(clock.now_ms());
        clock.advance(30);
        assert_eq!(g.finish_work(clock.now_ms()), 30);
        assert_eq!(g.remaining_ms(clock.now_ms()), 70);

        let mut polls = 0;
        let at = g.idle_until_boundary(&clock, || {
            polls += 1;
            clock.advance(10);
        });
        assert_eq!(at, 100);
        assert_eq!(polls, 7);
    }

    #[test]
    fn overrun_skips_the_wait() {
        let clock = MockClock::new();
        let mut g = Governor::new(100);
        g.start_cycle(0);
        clock.set(250);
        assert_eq!(g.finish_work(clock.now_ms()), 250);
        assert!(g.is_boundary(clock.now_ms()));
        assert_eq!(g.remaining_ms(clock.now_ms()), 0);

        // still drains input once
        let mut polls = 0;
        assert_eq!(g.idle_until_boundary(&clock, || polls += 1), 250);
        assert_eq!(polls, 1);

        // next cycle starts at the observed time, not at the missed deadline
        g.start_cycle(250);
        assert_eq!(g.deadline_ms(), 350);
    }
}
