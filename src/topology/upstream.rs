//! Upstream URL parsing.
//!
//! Stakers declare `https://host[:port]/...`. Only the host and port are
//! used; everything after the first `/` is ignored. An empty port (`host:/`)
//! means the default.

use crate::topology::EntryError;

/// Port used when the declared URL has none.
pub const DEFAULT_UPSTREAM_PORT: u16 = 443;

/// Host and port taken from a declared upstream URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamUrl {
    pub host: String,
    pub port: u16,
}

/// Parse a declared upstream URL.
pub fn parse_upstream_url(raw: &str) -> Result<UpstreamUrl, EntryError> {
    let malformed = || EntryError::MalformedUrl(raw.to_string());

    let rest = raw.strip_prefix("https://").ok_or_else(malformed)?;
    let (authority, _path) = rest.split_once('/').ok_or_else(malformed)?;

    let (host, port) = match authority.split_once(':') {
        Some((host, "")) => (host, DEFAULT_UPSTREAM_PORT),
        Some((host, port)) => {
            if !port.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            (host, port.parse::<u16>().map_err(|_| malformed())?)
        }
        None => (authority, DEFAULT_UPSTREAM_PORT),
    };

    let valid_host = !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-');
    if !valid_host {
        return Err(malformed());
    }

    Ok(UpstreamUrl {
        host: host.to_string(),
        port,
    })
}
