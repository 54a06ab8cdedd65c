//! HTTP HEAD / metadata probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers: `Content-Length`,
//! `Accept-Ranges: bytes`, and the ETag/Last-Modified validators used for
//! resume safety. The same header parsing serves the GET responses of the
//! transfer unit.

mod parse;

use anyhow::{Context, Result};
use std::str;
use std::time::Duration;

pub use parse::{parse_headers, ContentRange, HeaderLines, ResponseMeta};

/// Performs a HEAD request and returns parsed metadata of the final response.
///
/// Follows redirects. Runs in the current thread; call from `spawn_blocking`
/// if used from async code.
pub fn probe(url: &str, connect_timeout: Duration) -> Result<ResponseMeta> {
    let mut lines = HeaderLines::default();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.nobody(true)?; // HEAD request
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.useragent(crate::USER_AGENT)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(connect_timeout + Duration::from_secs(15))?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s);
            }
            true
        })?;
        transfer.perform().context("HEAD request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("HEAD {} returned HTTP {}", url, code);
    }

    Ok(parse_headers(lines.lines()))
}
