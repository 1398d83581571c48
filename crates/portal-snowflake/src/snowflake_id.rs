use modular_bitfield::prelude::*;
use std::fmt;

/// A 64-bit time-ordered identifier.
///
/// Fields are packed least significant first, so the numeric value is
/// `timestamp << 22 | node_id << 12 | sequence` with the top bit left clear.
/// Comparing two ids from the same node numerically orders them by emission.
#[bitfield]
#[repr(u64)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnowflakeId {
    /// 12 bits for the per-millisecond sequence.
    pub sequence: B12,
    /// 10 bits for node ID (allows up to 1024 nodes).
    pub node_id: B10,
    /// 41 bits for timestamp (milliseconds since a custom epoch).
    pub timestamp: B41,
    #[skip]
    __: B1,
}

impl SnowflakeId {
    pub fn as_u64(&self) -> u64 {
        u64::from(*self)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("timestamp", &self.timestamp())
            .field("node_id", &self.node_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}
