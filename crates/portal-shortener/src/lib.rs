//! Link management for the short-link service.
//!
//! This crate owns the creation path (URL policy, code generation, write
//! through to the cache) and every other mutation of link records. Core
//! types are re-exported from `portal_core`.

pub mod code;
pub mod destination;
pub mod error;
pub mod service;

pub use code::CodeGenerator;
pub use destination::UrlPolicy;
pub use error::ShortenerError;
pub use service::{
    BatchFailure, BatchOutcome, CreateLink, LinkInfo, LinkService, UpdateLink, DEFAULT_DAILY_DAYS,
    MAX_BATCH_SIZE, MAX_DAILY_DAYS,
};
