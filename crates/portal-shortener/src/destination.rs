//! Destination URL validation and normalization.

use crate::ShortenerError;
use typed_builder::TypedBuilder;
use url::{Host, Url};

pub const MAX_URL_LENGTH: usize = 2048;

/// Rules every destination URL must satisfy before it is stored.
#[derive(Debug, Clone, TypedBuilder)]
pub struct UrlPolicy {
    #[builder(default = MAX_URL_LENGTH)]
    pub max_length: usize,
    /// Refuse `localhost`, loopback and unspecified addresses.
    #[builder(default = true)]
    pub reject_local_hosts: bool,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UrlPolicy {
    /// Validates `raw` and returns its canonical form.
    ///
    /// Scheme and host are lowercased, a default port is dropped and query
    /// parameters are ordered by key. Path and fragment are kept as given.
    pub fn normalize(&self, raw: &str) -> Result<String, ShortenerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
        }
        if raw.len() > self.max_length {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL is {} bytes long, the limit is {}",
                raw.len(),
                self.max_length
            )));
        }

        let mut url = Url::parse(raw).map_err(|e| ShortenerError::InvalidUrl(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ShortenerError::InvalidUrl(format!(
                    "URL scheme must be http or https: {other}"
                )))
            }
        }

        let host = url
            .host()
            .ok_or_else(|| ShortenerError::InvalidUrl(format!("URL has no host: {raw}")))?;
        if self.reject_local_hosts && is_local(&host) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL points at a local address: {host}"
            )));
        }

        // `Url` lowercases the scheme and domain of http(s) URLs and drops
        // their default ports while parsing.
        sort_query(&mut url);

        Ok(url.to_string())
    }
}

fn is_local(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.');
            domain.eq_ignore_ascii_case("localhost")
                || domain.to_ascii_lowercase().ends_with(".localhost")
        }
        Host::Ipv4(ip) => ip.is_loopback() || ip.is_unspecified(),
        Host::Ipv6(ip) => ip.is_loopback() || ip.is_unspecified(),
    }
}

fn sort_query(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    // stable: repeated keys keep their relative order
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    url.query_pairs_mut().clear().extend_pairs(pairs);
}
