pub mod error;
pub mod factory;
pub mod seq;

pub use error::GeneratorError;
pub use factory::{build_generator, GeneratorSettings};
pub use seq::{InMemorySequence, SequenceGenerator};

use async_trait::async_trait;
use portal_snowflake::{Clock, Snowflake};
use std::fmt;

/// Which strategy produced an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Snowflake,
    Sequence,
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorKind::Snowflake => f.write_str("snowflake"),
            GeneratorKind::Sequence => f.write_str("sequence"),
        }
    }
}

/// Trait for generating unique 64-bit ids.
///
/// Implementations are pure generators that don't interact with the link
/// store. Uniqueness is the implementation's responsibility; ordering
/// guarantees differ per strategy.
#[async_trait]
pub trait IdGenerator: Send + Sync + 'static {
    async fn next_id(&self) -> Result<u64, GeneratorError>;

    fn kind(&self) -> GeneratorKind;
}

#[async_trait]
impl<C: Clock + 'static> IdGenerator for Snowflake<C> {
    async fn next_id(&self) -> Result<u64, GeneratorError> {
        // The critical section never awaits, so it stays on this thread.
        Ok(Snowflake::next_id(self)?.as_u64())
    }

    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Snowflake
    }
}
