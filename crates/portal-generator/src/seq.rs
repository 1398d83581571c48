use crate::{GeneratorError, GeneratorKind, IdGenerator};
use async_trait::async_trait;
use portal_core::{SequenceError, SequenceSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An id generator that delegates uniqueness to an external atomic counter.
///
/// Ids are increasing only as observed by the counter's owner, but no local
/// clock is involved.
#[derive(Clone)]
pub struct SequenceGenerator {
    source: Arc<dyn SequenceSource>,
}

impl SequenceGenerator {
    pub fn new(source: Arc<dyn SequenceSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl IdGenerator for SequenceGenerator {
    async fn next_id(&self) -> Result<u64, GeneratorError> {
        Ok(self.source.next_value().await?)
    }

    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Sequence
    }
}

/// A process-local counter.
///
/// Only unique within one process. Intended for single-node deployments and
/// tests; shared deployments use a Redis-backed source.
#[derive(Debug, Default)]
pub struct InMemorySequence {
    counter: AtomicU64,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the counter after `offset`, so the first value is `offset + 1`.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }
}

#[async_trait]
impl SequenceSource for InMemorySequence {
    async fn next_value(&self) -> Result<u64, SequenceError> {
        // saturates at u64::MAX so an exhausted counter never restarts at zero
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|_| SequenceError::InvalidData("counter overflowed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn in_memory_sequence_starts_at_one() {
        let sequence = InMemorySequence::new();
        assert_eq!(sequence.next_value().await.unwrap(), 1);
        assert_eq!(sequence.next_value().await.unwrap(), 2);
        assert_eq!(sequence.next_value().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn in_memory_sequence_with_offset() {
        let sequence = InMemorySequence::with_offset(1000);
        assert_eq!(sequence.next_value().await.unwrap(), 1001);
        assert_eq!(sequence.next_value().await.unwrap(), 1002);
    }

    #[tokio::test]
    async fn in_memory_sequence_reports_overflow() {
        let sequence = InMemorySequence::with_offset(u64::MAX);
        assert!(sequence.next_value().await.is_err());
    }

    #[tokio::test]
    async fn exhausted_sequence_stays_exhausted() {
        let sequence = InMemorySequence::with_offset(u64::MAX - 1);
        assert_eq!(sequence.next_value().await.unwrap(), u64::MAX);
        for _ in 0..3 {
            assert!(sequence.next_value().await.is_err());
        }
    }

    #[tokio::test]
    async fn sequence_generator_is_unique_under_concurrency() {
        let generator = Arc::new(SequenceGenerator::new(Arc::new(InMemorySequence::new())));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move { generator.next_id().await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }
        assert_eq!(seen.len(), 32);
        assert_eq!(generator.kind(), GeneratorKind::Sequence);
    }

    #[tokio::test]
    async fn sequence_errors_surface() {
        struct Down;

        #[async_trait]
        impl SequenceSource for Down {
            async fn next_value(&self) -> Result<u64, SequenceError> {
                Err(SequenceError::Unavailable("connection refused".into()))
            }
        }

        let generator = SequenceGenerator::new(Arc::new(Down));
        let err = generator.next_id().await.unwrap_err();
        assert!(matches!(err, GeneratorError::Sequence(_)));
        assert_eq!(err.kind(), portal_core::ErrorKind::StoreUnavailable);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SequenceGenerator>();
        assert_send_sync::<InMemorySequence>();
    }
}
