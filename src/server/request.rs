use crate::ids::RequestId;
use crate::request::{parse_query, HeaderVec, ParamVec, Request};
use http::Method;
use std::io::{self, Read};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RequestParseError {
    #[error("invalid HTTP method '{0}'")]
    Method(String),
    #[error("failed to read request body: {0}")]
    Body(#[from] io::Error),
}

/// Build a [`Request`] from the pieces of a parsed HTTP request.
///
/// Header names are lower-cased; non-UTF-8 header values are decoded
/// lossily. A valid ULID in `x-request-id` becomes the request id.
///
/// # Errors
///
/// [`RequestParseError::Method`] when the method is not a valid token.
pub fn build_request<'h, I>(
    method: &str,
    target: &str,
    headers: I,
    body: Vec<u8>,
) -> Result<Request, RequestParseError>
where
    I: IntoIterator<Item = (&'h str, &'h [u8])>,
{
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RequestParseError::Method(method.to_string()))?;
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, parse_query(q)),
        None => (target, ParamVec::new()),
    };
    let headers: HeaderVec = headers
        .into_iter()
        .map(|(name, value)| {
            (
                Arc::from(name.to_ascii_lowercase()),
                String::from_utf8_lossy(value).into_owned(),
            )
        })
        .collect();
    let id = RequestId::from_header_or_new(
        headers
            .iter()
            .find(|(k, _)| k.as_ref() == "x-request-id")
            .map(|(_, v)| v.as_str()),
    );

    debug!(
        request_id = %id,
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_count = query.len(),
        body_bytes = body.len(),
        "HTTP request parsed"
    );

    Ok(Request {
        id,
        method,
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        query,
        headers,
        body,
    })
}

/// Convert a `may_minihttp` request, buffering its body.
///
/// # Errors
///
/// See [`RequestParseError`].
pub fn parse_request(req: may_minihttp::Request) -> Result<Request, RequestParseError> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let headers: Vec<(String, Vec<u8>)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_string(), h.value.to_vec()))
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    build_request(
        &method,
        &target,
        headers.iter().map(|(k, v)| (k.as_str(), v.as_slice())),
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_splits_target_and_lowercases_headers() {
        let req = build_request(
            "post",
            "/api/v1/users?dry_run=true",
            [("Content-Type", b"application/json".as_slice())],
            b"{}".to_vec(),
        )
        .unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/api/v1/users");
        assert_eq!(req.query_param("dry_run"), Some("true"));
        assert_eq!(req.headers[0].0.as_ref(), "content-type");
        assert_eq!(req.body(), b"{}");
    }

    #[test]
    fn test_request_id_header_is_honoured() {
        let id = RequestId::new().to_string();
        let req = build_request("GET", "/", [("X-Request-Id", id.as_bytes())], Vec::new()).unwrap();
        assert_eq!(req.id.to_string(), id);
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let err = build_request("G T", "/", [], Vec::new()).unwrap_err();
        assert!(matches!(err, RequestParseError::Method(_)));
    }
}
