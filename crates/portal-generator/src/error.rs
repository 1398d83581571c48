use portal_core::{ErrorKind, SequenceError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    /// The local clock went backwards. Not retried automatically.
    #[error("clock moved backwards: last={last_ms}ms, now={now_ms}ms")]
    ClockRegression { last_ms: i64, now_ms: i64 },
    #[error("snowflake generator failed: {0}")]
    Snowflake(portal_snowflake::Error),
    #[error("sequence source failed: {0}")]
    Sequence(#[from] SequenceError),
}

impl GeneratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeneratorError::ClockRegression { .. } => ErrorKind::ClockRegression,
            GeneratorError::Snowflake(_) => ErrorKind::Internal,
            GeneratorError::Sequence(e) => e.kind(),
        }
    }
}

impl From<portal_snowflake::Error> for GeneratorError {
    fn from(err: portal_snowflake::Error) -> Self {
        match err {
            portal_snowflake::Error::ClockRegression { last_ms, now_ms } => {
                GeneratorError::ClockRegression { last_ms, now_ms }
            }
            other => GeneratorError::Snowflake(other),
        }
    }
}
