//! Parse HTTP response header lines into ResponseMeta.

/// Collects raw header lines of the *last* response in a redirect chain.
/// A new status line (`HTTP/...`) discards everything collected before it.
#[derive(Debug, Default, Clone)]
pub struct HeaderLines {
    lines: Vec<String>,
}

impl HeaderLines {
    pub fn push(&mut self, raw: &str) {
        let line = raw.trim_end();
        if line.starts_with("HTTP/") {
            self.lines.clear();
        }
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Parsed `Content-Range: bytes first-last/complete` (either side may be `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub first: Option<u64>,
    pub last: Option<u64>,
    /// Full resource length; `None` for `*` or a value that does not fit in u64.
    pub complete_length: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, complete) = rest.split_once('/')?;
        let complete_length = complete.trim().parse::<u64>().ok();
        let (first, last) = match range.trim() {
            "*" => (None, None),
            r => {
                let (a, b) = r.split_once('-')?;
                (a.trim().parse::<u64>().ok(), b.trim().parse::<u64>().ok())
            }
        };
        Some(Self {
            first,
            last,
            complete_length,
        })
    }
}

/// Metadata of one HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Status code from the status line (0 if none was seen).
    pub status: u32,
    /// Body length in bytes, if `Content-Length` is present and fits in u64.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `ETag` value exactly as sent (quotes and `W/` prefix kept).
    pub etag: Option<String>,
    /// `Last-Modified` value if present.
    pub last_modified: Option<String>,
    pub content_range: Option<ContentRange>,
}

impl ResponseMeta {
    /// Strong ETag, if the server sent one (weak tags cannot be used with If-Range).
    pub fn strong_etag(&self) -> Option<&str> {
        self.etag.as_deref().filter(|e| !e.starts_with("W/"))
    }

    /// Total resource length: from Content-Range when present, else Content-Length
    /// for a full (non-partial) response.
    pub fn resource_length(&self) -> Option<u64> {
        match self.content_range {
            Some(cr) => cr.complete_length,
            None if self.status != 206 => self.content_length,
            None => None,
        }
    }
}

fn parse_status_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Parse collected header lines into ResponseMeta.
pub fn parse_headers(lines: &[String]) -> ResponseMeta {
    let mut meta = ResponseMeta::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            meta.status = parse_status_line(line).unwrap_or(0);
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            meta.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            meta.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("etag") {
            meta.etag = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            meta.last_modified = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-range") {
            meta.content_range = ContentRange::parse(value);
        }
    }

    meta
}
