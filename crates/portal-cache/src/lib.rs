//! Volatile cache backends and the best-effort wrapper the services use.
//!
//! [`LinkCache`] is the raw collaborator contract: it reports every failure.
//! [`ResolutionCache`] sits in front of it, bounds each call with a timeout
//! and turns failures into misses, so a broken cache only ever degrades the
//! service to store-only behavior.

pub mod cache;
pub mod moka;
pub mod redis;
pub mod resolution;
pub mod sequence;

pub use cache::{CacheKeys, LinkCache, Result, CLICKS_TTL};
pub use moka::MokaLinkCache;
pub use redis::RedisLinkCache;
pub use resolution::{CacheSettings, ResolutionCache};
pub use sequence::{RedisSequence, DEFAULT_SEQUENCE_KEY};
