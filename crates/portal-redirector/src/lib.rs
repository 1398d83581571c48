//! Resolution of short codes to destination URLs.
//!
//! [`ResolutionService`] serves lookups cache first and falls back to the
//! durable store, checking the link's status on that path only. Each
//! successful resolution hands a [`ClickRecorder`] run to the dispatcher.

pub mod device;
pub mod error;
pub mod recorder;
pub mod redirector;
pub mod service;

pub use error::RedirectError;
pub use recorder::{ClickOutcome, ClickRecorder, CountryLookup, NoCountryLookup};
pub use redirector::{Redirector, ResolveSource, Resolved};
pub use service::ResolutionService;

pub type Result<T> = std::result::Result<T, RedirectError>;
