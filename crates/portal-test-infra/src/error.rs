use std::result::Result as StdResult;
use thiserror::Error;

/// A fixture container failed to start or to report its address.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("fixture container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
}

/// A type alias for `Result` with `TestInfraError`.
pub type Result<T> = StdResult<T, TestInfraError>;
