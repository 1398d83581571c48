//! Core types and traits for the Portal short-link service.
//!
//! This crate holds the pieces shared by the shortener, the redirector and
//! the storage backends: short codes and their base62 codec, the link and
//! click data model, the store contracts, the error taxonomy and the
//! dispatcher used for detached background work.

pub mod background;
pub mod base62;
pub mod click;
pub mod error;
pub mod link;
pub mod repository;
pub mod sequence;
pub mod shortcode;

pub use background::{Dispatcher, DispatcherConfig};
pub use click::{
    ClickContext, ClickEvent, ClickSummary, ClickWindow, DailyClicks, DailyTally, DeviceClass,
};
pub use error::{CacheError, CoreError, ErrorKind, SequenceError, StorageError};
pub use link::{LinkChanges, LinkPage, LinkRecord, LinkStatus, ListFilter, PageRequest};
pub use repository::{ClickRepository, LinkRepository};
pub use sequence::SequenceSource;
pub use shortcode::ShortCode;
