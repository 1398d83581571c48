use crate::{
    clock::{Clock, SystemClock},
    error::Error,
    SnowflakeId,
};
use jiff::Timestamp;
use std::sync::Mutex;
use typed_builder::TypedBuilder;

const MAX_TIMESTAMP_MILLIS: i64 = (1_i64 << 41) - 1;
const SEQUENCE_MASK: u16 = (1 << 12) - 1;

/// Largest node id that fits in the 10-bit node field.
pub const MAX_NODE_ID: u16 = (1 << 10) - 1;

/// 2024-01-24T00:00:00Z, the zero point shared by every node of a deployment.
pub const DEFAULT_EPOCH: Timestamp = Timestamp::constant(1_706_054_400, 0);

/// Configures a Snowflake generator instance.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SnowflakeSettings {
    /// A unique node index in the range `[0, 1023]`.
    #[builder]
    pub node_id: u16,
    /// Custom epoch used as the zero point for the 41-bit timestamp field.
    #[builder(default = DEFAULT_EPOCH)]
    pub start_epoch: Timestamp,
}

#[derive(Debug, Default)]
struct GeneratorState {
    /// Milliseconds since the epoch of the last emitted id.
    last_elapsed_millis: Option<i64>,
    sequence: u16,
}

/// Node-local, time-ordered 64-bit id generator.
///
/// Every call runs inside one short critical section that reads the clock,
/// compares it with the last emitted timestamp and bumps the sequence. Ids
/// from one instance are strictly increasing; ids from different instances
/// are unique as long as their node ids differ.
pub struct Snowflake<C: Clock> {
    start_time: Timestamp,
    node_id: u16,
    clock: C,
    state: Mutex<GeneratorState>,
}

impl Snowflake<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(settings: SnowflakeSettings) -> Result<Self, Error> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Snowflake<C> {
    fn with_clock(settings: SnowflakeSettings, clock: C) -> Result<Self, Error> {
        if settings.node_id > MAX_NODE_ID {
            return Err(Error::InvalidNodeId {
                node_id: settings.node_id,
                max_node_id: MAX_NODE_ID,
            });
        }

        let now = clock.now();
        if settings.start_epoch > now {
            return Err(Error::EpochAhead {
                epoch: settings.start_epoch,
                now,
            });
        }

        Ok(Self {
            start_time: settings.start_epoch,
            node_id: settings.node_id,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    fn elapsed_millis(&self) -> i64 {
        self.clock.now().as_millisecond() - self.start_time.as_millisecond()
    }

    /// Generates the next unique SnowflakeId.
    ///
    /// - a clock that moved backwards fails the call with
    ///   [`Error::ClockRegression`]; no id is emitted and the state is untouched
    /// - an exhausted per-millisecond sequence waits for the next millisecond
    pub fn next_id(&self) -> Result<SnowflakeId, Error> {
        let mut state = self.state.lock().map_err(|_| Error::StatePoisoned)?;

        let mut now = self.elapsed_millis();
        let mut sequence = 0;

        // the clock fell behind the epoch before any id was emitted
        if now < 0 {
            return Err(Error::ClockRegression {
                last_ms: state.last_elapsed_millis.unwrap_or(0),
                now_ms: now,
            });
        }

        if let Some(last) = state.last_elapsed_millis {
            if now < last {
                return Err(Error::ClockRegression {
                    last_ms: last,
                    now_ms: now,
                });
            }

            if now == last {
                sequence = (state.sequence + 1) & SEQUENCE_MASK;
                if sequence == 0 {
                    now = self.wait_next_millis(last)?;
                }
            }
        }

        if now > MAX_TIMESTAMP_MILLIS {
            return Err(Error::OverTimeLimit);
        }

        let id = SnowflakeId::new()
            .with_timestamp(now as u64)
            .with_node_id(self.node_id)
            .with_sequence(sequence);

        state.last_elapsed_millis = Some(now);
        state.sequence = sequence;

        Ok(id)
    }

    fn wait_next_millis(&self, last: i64) -> Result<i64, Error> {
        let target = Timestamp::from_millisecond(self.start_time.as_millisecond() + last + 1)
            .map_err(|_| Error::OverTimeLimit)?;
        loop {
            self.clock.wait_until(target);
            let now = self.elapsed_millis();
            if now > last {
                return Ok(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn make_generator(node_id: u16, clock_millis: i64) -> (Snowflake<TestClock>, TestClock) {
        let epoch = Timestamp::from_millisecond(0).unwrap();
        let settings = SnowflakeSettings::builder()
            .node_id(node_id)
            .start_epoch(epoch)
            .build();
        let clock = TestClock::new(Timestamp::from_millisecond(clock_millis).unwrap());
        let gen = Snowflake::with_clock(settings, clock.clone()).unwrap();
        (gen, clock)
    }

    #[test]
    fn first_id_has_sequence_zero() {
        let (gen, _) = make_generator(0, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 100);
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let (gen, _) = make_generator(0, 100);
        let seqs: Vec<u16> = (0..3).map(|_| gen.next_id().unwrap().sequence()).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn new_millisecond_resets_sequence() {
        let (gen, clock) = make_generator(0, 100);
        gen.next_id().unwrap();
        gen.next_id().unwrap();
        clock.shift_millis(1);
        let id = gen.next_id().unwrap();
        assert_eq!(id.timestamp(), 101);
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn exhausted_sequence_rolls_into_next_millisecond() {
        let (gen, _) = make_generator(0, 100);
        let mut seen = HashSet::new();
        for _ in 0..4096 {
            let id = gen.next_id().unwrap();
            assert_eq!(id.timestamp(), 100);
            assert!(seen.insert(id.as_u64()));
        }

        // the 4097th id must come from the following millisecond
        let id = gen.next_id().unwrap();
        assert_eq!(id.timestamp(), 101);
        assert_eq!(id.sequence(), 0);
        assert!(seen.insert(id.as_u64()));
    }

    #[test]
    fn clock_regression_fails_without_emitting() {
        let (gen, clock) = make_generator(0, 1_000);
        let before = gen.next_id().unwrap();

        clock.shift_millis(-5);
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockRegression {
                last_ms: 1_000,
                now_ms: 995
            })
        );

        // once the clock catches up, generation continues from the old state
        clock.shift_millis(5);
        let after = gen.next_id().unwrap();
        assert_eq!(after.sequence(), before.sequence() + 1);
        assert!(after.as_u64() > before.as_u64());
    }

    #[test]
    fn clock_behind_epoch_fails_on_first_call() {
        let settings = SnowflakeSettings::builder()
            .node_id(0)
            .start_epoch(Timestamp::from_millisecond(1_000).unwrap())
            .build();
        let clock = TestClock::new(Timestamp::from_millisecond(1_005).unwrap());
        let gen = Snowflake::with_clock(settings, clock.clone()).unwrap();

        clock.shift_millis(-10);
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockRegression {
                last_ms: 0,
                now_ms: -5
            })
        );

        // the state is not poisoned
        clock.shift_millis(20);
        let id = gen.next_id().unwrap();
        assert_eq!(id.timestamp(), 15);
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let (gen, clock) = make_generator(9, 50);
        let mut last = 0;
        for i in 0..10_000 {
            if i % 777 == 0 {
                clock.shift_millis(1);
            }
            let id = gen.next_id().unwrap().as_u64();
            assert!(id > last, "id {id} not greater than {last}");
            last = id;
        }
    }

    #[test]
    fn node_id_is_embedded() {
        let (gen, _) = make_generator(MAX_NODE_ID, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(id.node_id(), MAX_NODE_ID);
        assert_eq!(id.as_u64(), (100 << 22) | ((MAX_NODE_ID as u64) << 12));
    }

    #[test]
    fn invalid_node_id_is_rejected() {
        let settings = SnowflakeSettings::builder().node_id(1024).build();
        assert!(matches!(
            Snowflake::new(settings),
            Err(Error::InvalidNodeId {
                node_id: 1024,
                max_node_id: 1023
            })
        ));
    }

    #[test]
    fn epoch_ahead_is_rejected() {
        let settings = SnowflakeSettings::builder()
            .node_id(0)
            .start_epoch(Timestamp::from_millisecond(2_000).unwrap())
            .build();
        let clock = TestClock::new(Timestamp::from_millisecond(1_000).unwrap());
        assert!(matches!(
            Snowflake::with_clock(settings, clock),
            Err(Error::EpochAhead { .. })
        ));
    }

    #[test]
    fn overtime_limit_returns_error() {
        let (gen, _) = make_generator(0, MAX_TIMESTAMP_MILLIS + 1);
        assert_eq!(gen.next_id(), Err(Error::OverTimeLimit));
    }

    #[test]
    fn concurrent_callers_never_collide() {
        let gen = Arc::new(Snowflake::new(SnowflakeSettings::builder().node_id(1).build()).unwrap());

        let ids: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let gen = Arc::clone(&gen);
                    s.spawn(move || {
                        (0..2_000)
                            .map(|_| gen.next_id().unwrap().as_u64())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
