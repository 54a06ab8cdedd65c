//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves several paths, each a static body with optional validators. Supports
//! HEAD, `Range: bytes=X-` / `X-Y`, and `If-Range`. Resources can be made to
//! fail with a fixed status (always, or for the first few GETs), block HEAD,
//! ignore ranges, omit Content-Length, stream slowly, or cut the connection
//! after K bytes. The server records the `Range` and `If-Range` headers of
//! every GET and the peak number of GETs in flight.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Resource {
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// Answer every request with this status and an empty body.
    pub status: Option<u16>,
    /// Statuses for the first GETs, one per request, before serving normally.
    pub fail_first: Vec<u16>,
    /// Send 200/206 bodies without Content-Length, delimited by connection close.
    pub no_length: bool,
    /// HEAD answers 405.
    pub block_head: bool,
    /// GET ignores Range and always sends 200 with the full body.
    pub ignore_ranges: bool,
    /// Close the connection after this many body bytes ...
    pub cut_after: Option<usize>,
    /// ... for this many GET responses.
    pub cuts: usize,
    /// Pause between 1 KiB body pieces.
    pub throttle: Option<Duration>,
}

impl Resource {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn with_etag(mut self, etag: &str) -> Self {
        self.etag = Some(etag.to_string());
        self
    }

    pub fn with_last_modified(mut self, date: &str) -> Self {
        self.last_modified = Some(date.to_string());
        self
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct ServerState {
    resources: Mutex<HashMap<String, Resource>>,
    /// Every GET in arrival order.
    gets: Mutex<Vec<Get>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Handle to a running server; the listener thread lives until the process exits.
#[derive(Debug, Clone)]
pub struct TestServer {
    base: String,
    state: Arc<ServerState>,
}

impl TestServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(ServerState::default());
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Adds or replaces the resource at `path` (e.g. "/file.bin").
    pub fn serve(&self, path: &str, resource: Resource) -> String {
        self.state
            .resources
            .lock()
            .unwrap()
            .insert(path.to_string(), resource);
        self.url(path)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Range headers of the GETs received for `path`.
    pub fn ranges(&self, path: &str) -> Vec<Option<String>> {
        self.gets_for(path).into_iter().map(|g| g.range).collect()
    }

    /// If-Range headers of the GETs received for `path`.
    pub fn if_ranges(&self, path: &str) -> Vec<Option<String>> {
        self.gets_for(path).into_iter().map(|g| g.if_range).collect()
    }

    fn gets_for(&self, path: &str) -> Vec<Get> {
        self.state
            .gets
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.path == path)
            .cloned()
            .collect()
    }

    pub fn get_count(&self) -> usize {
        self.state.gets.lock().unwrap().len()
    }

    /// Peak number of GET responses being sent at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct Get {
    path: String,
    range: Option<String>,
    if_range: Option<String>,
}

struct Request {
    method: String,
    path: String,
    range: Option<String>,
    if_range: Option<String>,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 || buf.len() > 64 * 1024 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&buf);
    let mut lines = text.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let mut range = None;
    let mut if_range = None;
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            } else if name.eq_ignore_ascii_case("if-range") {
                if_range = Some(value.trim().to_string());
            }
        }
    }
    Some(Request {
        method,
        path,
        range,
        if_range,
    })
}

/// Parses `bytes=X-` or `bytes=X-Y` into (start, inclusive end).
fn parse_range(value: &str) -> Option<(u64, Option<u64>)> {
    let bounds = value.strip_prefix("bytes=")?;
    let (a, b) = bounds.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = match b.trim() {
        "" => None,
        e => Some(e.parse().ok()?),
    };
    Some((start, end))
}

fn validators(res: &Resource) -> String {
    let mut h = String::new();
    if let Some(etag) = &res.etag {
        h.push_str(&format!("ETag: {}\r\n", etag));
    }
    if let Some(lm) = &res.last_modified {
        h.push_str(&format!("Last-Modified: {}\r\n", lm));
    }
    h
}

fn handle(mut stream: TcpStream, state: &ServerState) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    let resource = state.resources.lock().unwrap().get(&req.path).cloned();
    let Some(res) = resource else {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    };

    let scripted = if req.method == "GET" {
        let mut resources = state.resources.lock().unwrap();
        match resources.get_mut(&req.path) {
            Some(r) if !r.fail_first.is_empty() => Some(r.fail_first.remove(0)),
            _ => None,
        }
    } else {
        None
    };
    if let Some(status) = res.status.or(scripted) {
        if req.method == "GET" {
            record_get(state, &req);
        }
        let _ = stream.write_all(
            format!(
                "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            )
            .as_bytes(),
        );
        return;
    }

    let total = res.body.len() as u64;
    if req.method == "HEAD" {
        if res.block_head {
            let _ = stream.write_all(
                b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
        let _ = stream.write_all(
            format!(
                "HTTP/1.1 200 OK\r\n{}Accept-Ranges: bytes\r\n{}Connection: close\r\n\r\n",
                content_length(&res, res.body.len()),
                validators(&res)
            )
            .as_bytes(),
        );
        return;
    }
    if req.method != "GET" {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    // Consume one cut, if any remain.
    let cut = {
        let mut resources = state.resources.lock().unwrap();
        match resources.get_mut(&req.path) {
            Some(r) if r.cuts > 0 => {
                r.cuts -= 1;
                r.cut_after
            }
            _ => None,
        }
    };
    record_get(state, &req);
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let if_range_ok = match &req.if_range {
        None => true,
        Some(v) => res.etag.as_deref() == Some(v) || res.last_modified.as_deref() == Some(v),
    };
    let range = req
        .range
        .as_deref()
        .filter(|_| !res.ignore_ranges && if_range_ok)
        .and_then(parse_range);

    let (head, slice): (String, &[u8]) = match range {
        Some((start, _)) if start >= total => (
            format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n",
                total
            ),
            &[],
        ),
        Some((start, end)) => {
            let end = end.unwrap_or(total - 1).min(total - 1);
            let slice = &res.body[start as usize..=end as usize];
            (
                format!(
                    "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes {}-{}/{}\r\n{}",
                    start,
                    end,
                    total,
                    content_length(&res, slice.len())
                ),
                slice,
            )
        }
        None => (
            format!("HTTP/1.1 200 OK\r\n{}", content_length(&res, res.body.len())),
            &res.body[..],
        ),
    };
    let header = format!(
        "{}Accept-Ranges: bytes\r\n{}Connection: close\r\n\r\n",
        head,
        validators(&res)
    );

    let send = slice.len().min(cut.unwrap_or(usize::MAX));
    let mut ok = stream.write_all(header.as_bytes()).is_ok();
    let mut pieces = slice[..send].chunks(1024).peekable();
    while let Some(piece) = pieces.next() {
        if !ok {
            break;
        }
        ok = stream.write_all(piece).is_ok() && stream.flush().is_ok();
        // Pause only between pieces: the response must count as finished
        // as soon as its last byte is out.
        if let (Some(pause), true) = (res.throttle, pieces.peek().is_some()) {
            thread::sleep(pause);
        }
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    if cut.is_some() || res.no_length {
        let _ = stream.shutdown(std::net::Shutdown::Both);
    }
}

fn record_get(state: &ServerState, req: &Request) {
    state.gets.lock().unwrap().push(Get {
        path: req.path.clone(),
        range: req.range.clone(),
        if_range: req.if_range.clone(),
    });
}

fn content_length(res: &Resource, len: usize) -> String {
    if res.no_length {
        String::new()
    } else {
        format!("Content-Length: {}\r\n", len)
    }
}
