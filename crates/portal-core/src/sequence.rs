use crate::error::SequenceError;
use async_trait::async_trait;

/// An external atomic counter.
///
/// Each call must return a value never returned before by the same source.
/// Ordering is only as strong as the backend that owns the counter.
#[async_trait]
pub trait SequenceSource: Send + Sync + 'static {
    async fn next_value(&self) -> Result<u64, SequenceError>;
}
