use jiff::Timestamp;

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
    /// Block and wait until the clock reaches the target time.
    fn wait_until(&self, target: Timestamp);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn wait_until(&self, target: Timestamp) {
        // Callers only ever wait for the next millisecond, so spinning is
        // cheaper than parking the thread.
        while Timestamp::now() < target {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use crate::clock::Clock;
    use jiff::{SignedDuration, Timestamp};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub(crate) struct TestClock {
        inner: Arc<Mutex<TestClockState>>,
    }

    struct TestClockState {
        now: Timestamp,
    }

    impl TestClock {
        pub(crate) fn new(now: Timestamp) -> Self {
            Self {
                inner: Arc::new(Mutex::new(TestClockState { now })),
            }
        }

        /// Moves the clock by `millis`, which may be negative.
        pub(crate) fn shift_millis(&self, millis: i64) {
            let mut state = self
                .inner
                .lock()
                .expect("test clock lock should not be poisoned");
            state.now = state.now + SignedDuration::from_millis(millis);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            self.inner
                .lock()
                .expect("test clock lock should not be poisoned")
                .now
        }

        fn wait_until(&self, target: Timestamp) {
            let mut state = self
                .inner
                .lock()
                .expect("test clock lock should not be poisoned");
            // jump straight to the target instead of blocking
            if target > state.now {
                state.now = target;
            }
        }
    }

    #[test]
    fn wait_until_jumps_forward() {
        let base = Timestamp::from_millisecond(1_000).unwrap();
        let clock = TestClock::new(base);
        assert_eq!(clock.now(), base);

        let target = Timestamp::from_millisecond(1_001).unwrap();
        clock.wait_until(target);
        assert_eq!(clock.now(), target);

        // waiting for the past is a no-op
        clock.wait_until(base);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn shift_moves_both_ways() {
        let clock = TestClock::new(Timestamp::from_millisecond(5_000).unwrap());
        clock.shift_millis(-3);
        assert_eq!(clock.now().as_millisecond(), 4_997);
        clock.shift_millis(10);
        assert_eq!(clock.now().as_millisecond(), 5_007);
    }
}
