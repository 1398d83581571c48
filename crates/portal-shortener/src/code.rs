use crate::ShortenerError;
use portal_core::base62::ALPHABET;
use portal_core::{LinkRepository, ShortCode};
use portal_generator::IdGenerator;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Generated codes checked against the store before giving up on ids.
pub const MAX_GENERATION_ATTEMPTS: usize = 3;
/// Length of the random fallback code.
pub const RANDOM_CODE_LENGTH: usize = 8;

/// Produces the short code for a new link.
///
/// Existence checks here are advisory. Two creators can both pass them; the
/// store's uniqueness constraint decides the winner at insert time.
#[derive(Clone)]
pub struct CodeGenerator {
    ids: Arc<dyn IdGenerator>,
    links: Arc<dyn LinkRepository>,
}

impl CodeGenerator {
    pub fn new(ids: Arc<dyn IdGenerator>, links: Arc<dyn LinkRepository>) -> Self {
        Self { ids, links }
    }

    /// Validates a caller-chosen code and checks that it was never taken.
    pub async fn custom(&self, raw: &str) -> Result<ShortCode, ShortenerError> {
        let code = ShortCode::custom(raw)?;
        if self.links.exists(&code).await? {
            return Err(ShortenerError::CodeConflict(code.to_string()));
        }
        Ok(code)
    }

    /// Encodes fresh ids until one is free, then falls back to a random code.
    ///
    /// The random code is not pre-checked.
    pub async fn generate(&self) -> Result<ShortCode, ShortenerError> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let id = self.ids.next_id().await?;
            let code = ShortCode::from_id(id);
            if !self.links.exists(&code).await? {
                return Ok(code);
            }
            debug!(code = %code, attempt, generator = %self.ids.kind(), "generated code already taken");
        }

        let code = random_code(RANDOM_CODE_LENGTH);
        warn!(
            attempts = MAX_GENERATION_ATTEMPTS,
            fallback = %code,
            "every generated code collided, using a random code"
        );
        Ok(code)
    }
}

/// A code of `len` symbols drawn from the base62 alphabet by the thread-local CSPRNG.
pub fn random_code(len: usize) -> ShortCode {
    let mut rng = rand::rng();
    let code: String = (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    ShortCode::new_unchecked(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use portal_core::repository::Result as StoreResult;
    use portal_core::{
        base62, LinkChanges, LinkPage, LinkRecord, ListFilter, PageRequest, StorageError,
    };
    use portal_generator::{GeneratorError, GeneratorKind, InMemorySequence, SequenceGenerator};
    use portal_storage::InMemoryRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always hands out the same id.
    struct StuckIds {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdGenerator for StuckIds {
        async fn next_id(&self) -> Result<u64, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        }

        fn kind(&self) -> GeneratorKind {
            GeneratorKind::Sequence
        }
    }

    struct RegressedClock;

    #[async_trait]
    impl IdGenerator for RegressedClock {
        async fn next_id(&self) -> Result<u64, GeneratorError> {
            Err(GeneratorError::ClockRegression {
                last_ms: 100,
                now_ms: 90,
            })
        }

        fn kind(&self) -> GeneratorKind {
            GeneratorKind::Snowflake
        }
    }

    fn sequential(links: Arc<InMemoryRepository>) -> CodeGenerator {
        let ids = SequenceGenerator::new(Arc::new(InMemorySequence::new()));
        CodeGenerator::new(Arc::new(ids), links)
    }

    async fn take(links: &InMemoryRepository, code: &str) {
        links
            .create(LinkRecord::new(
                ShortCode::new_unchecked(code),
                "https://example.com",
                Timestamp::now(),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn generates_base62_of_next_id() {
        let generator = sequential(Arc::new(InMemoryRepository::new()));
        assert_eq!(generator.generate().await.unwrap().as_str(), "1");
        assert_eq!(generator.generate().await.unwrap().as_str(), "2");
    }

    #[tokio::test]
    async fn skips_taken_codes() {
        let links = Arc::new(InMemoryRepository::new());
        take(&links, "1").await;
        take(&links, "2").await;

        let generator = sequential(links);
        assert_eq!(generator.generate().await.unwrap().as_str(), "3");
    }

    #[tokio::test]
    async fn falls_back_to_random_after_three_collisions() {
        let links = Arc::new(InMemoryRepository::new());
        take(&links, &base62::encode(42)).await;

        let ids = Arc::new(StuckIds {
            calls: AtomicUsize::new(0),
        });
        let generator = CodeGenerator::new(ids.clone(), links);

        let code = generator.generate().await.unwrap();
        assert_eq!(ids.calls.load(Ordering::SeqCst), MAX_GENERATION_ATTEMPTS);
        assert_eq!(code.as_str().len(), RANDOM_CODE_LENGTH);
        assert!(base62::is_alphabet(code.as_str()));
    }

    #[tokio::test]
    async fn clock_regression_is_surfaced() {
        let generator =
            CodeGenerator::new(Arc::new(RegressedClock), Arc::new(InMemoryRepository::new()));
        let err = generator.generate().await.unwrap_err();
        assert_eq!(err.kind(), portal_core::ErrorKind::ClockRegression);
    }

    #[tokio::test]
    async fn custom_code_is_validated_then_checked() {
        let links = Arc::new(InMemoryRepository::new());
        take(&links, "taken").await;
        let generator = sequential(links);

        assert_eq!(generator.custom("my-link").await.unwrap().as_str(), "my-link");
        assert!(matches!(
            generator.custom("ab").await,
            Err(ShortenerError::InvalidCustomCode(_))
        ));
        assert!(matches!(
            generator.custom("no spaces").await,
            Err(ShortenerError::InvalidCustomCode(_))
        ));
        assert!(matches!(
            generator.custom("taken").await,
            Err(ShortenerError::CodeConflict(_))
        ));
    }

    #[tokio::test]
    async fn store_errors_during_check_are_surfaced() {
        struct Down;

        fn down<T>() -> StoreResult<T> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        #[async_trait]
        impl LinkRepository for Down {
            async fn create(&self, _record: LinkRecord) -> StoreResult<LinkRecord> {
                down()
            }

            async fn find_by_code(&self, _code: &ShortCode) -> StoreResult<LinkRecord> {
                down()
            }

            async fn exists(&self, _code: &ShortCode) -> StoreResult<bool> {
                down()
            }

            async fn update_with_version(
                &self,
                _code: &ShortCode,
                _expected_version: u64,
                _changes: &LinkChanges,
            ) -> StoreResult<LinkRecord> {
                down()
            }

            async fn increment_clicks(&self, _code: &ShortCode, _delta: u64) -> StoreResult<()> {
                down()
            }

            async fn list(&self, _filter: &ListFilter, _page: PageRequest) -> StoreResult<LinkPage> {
                down()
            }

            async fn expire_due(&self, _now: Timestamp) -> StoreResult<Vec<ShortCode>> {
                down()
            }
        }

        let ids = SequenceGenerator::new(Arc::new(InMemorySequence::new()));
        let generator = CodeGenerator::new(Arc::new(ids), Arc::new(Down));
        let err = generator.generate().await.unwrap_err();
        assert_eq!(err.kind(), portal_core::ErrorKind::StoreUnavailable);
    }

    #[test]
    fn random_codes_use_the_alphabet() {
        let code = random_code(RANDOM_CODE_LENGTH);
        assert_eq!(code.as_str().len(), RANDOM_CODE_LENGTH);
        assert!(base62::is_alphabet(code.as_str()));
    }
}
