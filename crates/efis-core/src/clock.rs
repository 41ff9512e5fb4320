//! Monotonic time source.

use core::cell::Cell;

/// Milliseconds since start-up, monotonic.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `reference_ms`, saturating at zero.
    fn elapsed_since(&self, reference_ms: u64) -> u64 {
        self.now_ms().saturating_sub(reference_ms)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Clock advanced explicitly by the caller.
///
/// ```
/// use efis_core::clock::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// clock.advance(40);
/// assert_eq!(clock.now_ms(), 40);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: Cell<u64>,
}

impl MockClock {
    pub const fn new() -> Self {
        Self { now_ms: Cell::new(0) }
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates_for_future_reference() {
        let clock = MockClock::new();
        clock.set(1_000);
        assert_eq!(clock.elapsed_since(400), 600);
        assert_eq!(clock.elapsed_since(5_000), 0);
    }

    #[test]
    fn borrowed_clock_sees_shared_time() {
        let clock = MockClock::new();
        let by_ref = &clock;
        clock.advance(25);
        assert_eq!(by_ref.now_ms(), 25);
    }
}
