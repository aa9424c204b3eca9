use crate::response::RecordedResponse;
use dashmap::DashMap;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

/// `may_minihttp` keeps at most this many custom headers per response.
pub const MAX_RESPONSE_HEADERS: usize = 16;

/// Upper bound on distinct header lines kept for the process lifetime.
const HEADER_CACHE_CAPACITY: usize = 4096;

/// `may_minihttp` only accepts `&'static str` header lines. Each distinct
/// `Name: value` line is leaked once and reused for every later response.
static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);

pub(crate) fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// The `'static` wire line for one header. Once the cache is full, new
/// lines are leaked per response instead of being cached.
fn header_line(name: &str, value: &str) -> &'static str {
    let line = format!("{name}: {value}");
    if let Some(existing) = HEADER_LINES.get(&line) {
        return *existing;
    }
    let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
    if HEADER_LINES.len() >= HEADER_CACHE_CAPACITY {
        debug!(header = %name, "Header line cache full; line not cached");
        return leaked;
    }
    *HEADER_LINES.entry(line).or_insert(leaked)
}

/// Copy a dispatched response onto the wire response.
///
/// An uncommitted response goes out as `200` with whatever was recorded.
/// `Content-Length` is added by `may_minihttp`.
pub fn write_recorded(res: &mut Response, recorded: &RecordedResponse) {
    let status = recorded.status_or_default();
    res.status_code(usize::from(status), status_reason(status));

    for (index, (name, value)) in recorded.headers().iter().enumerate() {
        if index >= MAX_RESPONSE_HEADERS {
            warn!(
                dropped = recorded.headers().len() - MAX_RESPONSE_HEADERS,
                "Too many response headers"
            );
            break;
        }
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        res.header(header_line(name, value));
    }
    res.body_vec(recorded.body().to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(204), "No Content");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(799), "Unknown");
    }

    #[test]
    fn test_header_lines_are_interned() {
        let a = header_line("Vary", "Origin");
        let b = header_line("Vary", "Origin");
        assert_eq!(a, "Vary: Origin");
        // Another test may fill the cache first; only cached lines are shared.
        if HEADER_LINES.contains_key("Vary: Origin") {
            assert!(std::ptr::eq(a, b));
        }
    }

    #[test]
    fn test_header_lines_survive_a_full_cache() {
        for i in 0..=HEADER_CACHE_CAPACITY {
            header_line("Access-Control-Allow-Origin", &format!("https://site{i}.example"));
        }
        assert!(HEADER_LINES.len() >= HEADER_CACHE_CAPACITY);

        let line = header_line("Location", "/api/v1/users/4097");
        assert_eq!(line, "Location: /api/v1/users/4097");
        assert_eq!(header_line("Vary", "Origin"), "Vary: Origin");
    }
}
