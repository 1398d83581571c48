use crate::Result;
use async_trait::async_trait;
use portal_core::{ClickContext, ShortCode};
use std::fmt;

/// Where a resolution found its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveSource {
    Cache,
    Store,
}

impl fmt::Display for ResolveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveSource::Cache => f.write_str("cache"),
            ResolveSource::Store => f.write_str("store"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub url: String,
    pub source: ResolveSource,
}

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to its destination URL and schedules the click
    /// accounting for it.
    async fn resolve(&self, code: &ShortCode, context: ClickContext) -> Result<Resolved>;
}
