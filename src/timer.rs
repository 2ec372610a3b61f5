

use crate::Ts;

/// Clock trait provides access to UTC wall-clock time for slot scheduling.
///
/// Cycle alignment is derived from the UTC day boundary, so peers in a
/// decentralized cycle must agree on UTC to within a fraction of a slot.
/// That agreement is assumed, not enforced, by this crate.
pub trait Clock {
    /// Returns the number of milliseconds since the UTC epoch
    fn now_ms(&self) -> Ts;
}

/// Clock backed by the host system time
#[cfg(feature = "std")]
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now_ms(&self) -> Ts {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Ts)
            .unwrap_or(0)
    }
}

/// One-shot slot timer polled from the host loop.
///
/// The timer never blocks: it holds an absolute deadline and reports expiry
/// when polled. A deadline in the past fires at the earliest subsequent
/// poll. `stop` strictly cancels: a stopped timer never fires.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotTimer {
    deadline: Option<Ts>,
}

impl SlotTimer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Cancel any pending firing and arm the timer for absolute time `at`
    pub fn restart(&mut self, at: Ts) {
        self.deadline = Some(at);
    }

    /// Cancel; subsequent polls never fire until restarted
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Ts> {
        self.deadline
    }

    /// Check for expiry at time `now`
    pub fn poll(&self, now: Ts) -> bool {
        matches!(self.deadline, Some(at) if now >= at)
    }
}

impl Default for SlotTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mocks"))]
pub mod mock {
    use std::sync::{Arc, Mutex};

    use crate::Ts;

    /// Shared settable clock for driving deterministic schedules in tests
    #[derive(Clone, Debug)]
    pub struct MockClock(Arc<Mutex<Ts>>);

    impl MockClock {
        pub fn new() -> Self {
            Self(Arc::new(Mutex::new(0)))
        }

        pub fn set_ms(&mut self, val: Ts) {
            *self.0.lock().unwrap() = val;
        }

        pub fn inc_ms(&mut self, val: Ts) {
            let mut v = self.0.lock().unwrap();
            *v += val;
        }

        pub fn val(&self) -> Ts {
            *self.0.lock().unwrap()
        }
    }

    impl super::Clock for MockClock {
        fn now_ms(&self) -> Ts {
            *self.0.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timer_restart_and_poll() {
        let mut timer = SlotTimer::new();
        assert_eq!(timer.active(), false);
        assert_eq!(timer.poll(100), false);

        timer.restart(50);
        assert_eq!(timer.active(), true);
        assert_eq!(timer.poll(49), false);
        assert_eq!(timer.poll(50), true);

        // a deadline in the past still fires on the next poll
        assert_eq!(timer.poll(10_000), true);
    }

    #[test]
    fn timer_stop_cancels() {
        let mut timer = SlotTimer::new();
        timer.restart(50);
        timer.stop();

        assert_eq!(timer.active(), false);
        assert_eq!(timer.poll(100), false);

        // restart after stop re-arms
        timer.restart(200);
        assert_eq!(timer.poll(200), true);
    }

    #[test]
    fn mock_clock_shared() {
        use mock::MockClock;

        let mut a = MockClock::new();
        let b = a.clone();

        a.set_ms(123);
        assert_eq!(b.now_ms(), 123);

        a.inc_ms(7);
        assert_eq!(b.now_ms(), 130);
    }
}
