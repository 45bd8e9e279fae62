//! File Responses
//!
//! Turns a served body into the client response: `Last-Modified` from the
//! stored copy, `If-Modified-Since` revalidation and single byte ranges.

use std::time::SystemTime;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::proxy::{Served, ServedFrom};

/// Formats a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// True when the client copy, dated by `If-Modified-Since`, is still
/// current. Compared at whole-second resolution; unparsable dates are ignored.
fn not_modified(request: &HeaderMap, modified: SystemTime) -> bool {
    let Some(since) = request
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
    else {
        return false;
    };

    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    /// No usable range; send everything
    Full,
    /// Inclusive bounds
    Partial(u64, u64),
    Unsatisfiable,
}

/// Interprets a `Range` header against a body of `len` bytes.
///
/// Only a single `bytes=` range is honoured. Multiple ranges and malformed
/// values fall back to the full body.
fn byte_range(request: &HeaderMap, len: u64) -> ByteRange {
    let Some(spec) = request
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("bytes="))
    else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix form: the final `last` bytes
        return match last.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial(len.saturating_sub(n), len - 1),
            Err(_) => ByteRange::Full,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if last.is_empty() {
        u64::MAX
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end,
            _ => return ByteRange::Full,
        }
    };

    if start >= len {
        ByteRange::Unsatisfiable
    } else {
        ByteRange::Partial(start, end.min(len - 1))
    }
}

/// Builds the response for a GET or HEAD of `served`.
pub fn file_response(
    served: Served,
    request: &HeaderMap,
    content_type: String,
    head: bool,
) -> Response {
    let cache_status = match served.source {
        ServedFrom::Cache => "HIT",
        ServedFrom::Origin => "MISS",
    };
    let last_modified = http_date(served.modified);

    if not_modified(request, served.modified) {
        return (
            StatusCode::NOT_MODIFIED,
            [(header::LAST_MODIFIED, last_modified)],
            [("x-cache", cache_status)],
        )
            .into_response();
    }

    let len = served.body.len() as u64;
    let (status, body, content_range) = match byte_range(request, len) {
        ByteRange::Full => (StatusCode::OK, served.body, None),
        ByteRange::Partial(start, end) => (
            StatusCode::PARTIAL_CONTENT,
            served.body.slice(start as usize..=end as usize),
            Some([(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, len))]),
        ),
        ByteRange::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", len))],
                [("x-cache", cache_status)],
            )
                .into_response();
        }
    };

    // HEAD keeps the length of the body it leaves out
    let (body, content_length) = if head {
        let length = body.len().to_string();
        (Bytes::new(), Some([(header::CONTENT_LENGTH, length)]))
    } else {
        (body, None)
    };

    (
        status,
        [
            (header::CONTENT_TYPE, content_type),
            (header::LAST_MODIFIED, last_modified),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        content_range,
        content_length,
        [("x-cache", cache_status)],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    use axum::http::HeaderValue;

    fn served(body: &'static [u8], modified: SystemTime) -> Served {
        Served {
            body: Bytes::from_static(body),
            source: ServedFrom::Cache,
            modified,
        }
    }

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_str(value).unwrap());
        map
    }

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[test]
    fn test_http_date_format() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_not_modified_boundaries() {
        let modified = UNIX_EPOCH + Duration::from_millis(784_111_777_400);

        let same_second = headers(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert!(not_modified(&same_second, modified));

        let earlier = headers(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:36 GMT");
        assert!(!not_modified(&earlier, modified));

        let garbage = headers(header::IF_MODIFIED_SINCE, "yesterday");
        assert!(!not_modified(&garbage, modified));

        assert!(!not_modified(&HeaderMap::new(), modified));
    }

    #[test]
    fn test_byte_range_forms() {
        let range = |v: &str| byte_range(&headers(header::RANGE, v), 10);

        assert_eq!(byte_range(&HeaderMap::new(), 10), ByteRange::Full);
        assert_eq!(range("bytes=0-3"), ByteRange::Partial(0, 3));
        assert_eq!(range("bytes=4-"), ByteRange::Partial(4, 9));
        assert_eq!(range("bytes=5-100"), ByteRange::Partial(5, 9));
        assert_eq!(range("bytes=-3"), ByteRange::Partial(7, 9));
        assert_eq!(range("bytes=-30"), ByteRange::Partial(0, 9));
        assert_eq!(range("bytes=10-"), ByteRange::Unsatisfiable);
        assert_eq!(range("bytes=-0"), ByteRange::Unsatisfiable);
        assert_eq!(range("bytes=0-1,4-5"), ByteRange::Full);
        assert_eq!(range("bytes=5-2"), ByteRange::Full);
        assert_eq!(range("items=0-3"), ByteRange::Full);
    }

    #[tokio::test]
    async fn test_full_response_headers() {
        let modified = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let response = file_response(
            served(b"0123456789", modified),
            &HeaderMap::new(),
            "image/png".to_string(),
            false,
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::LAST_MODIFIED],
            "Sun, 06 Nov 1994 08:49:37 GMT"
        );
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(response.headers()["x-cache"], "HIT");
        assert_eq!(body_of(response).await, Bytes::from_static(b"0123456789"));
    }

    #[tokio::test]
    async fn test_partial_response() {
        let response = file_response(
            served(b"0123456789", SystemTime::now()),
            &headers(header::RANGE, "bytes=2-4"),
            "image/png".to_string(),
            false,
        );

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-4/10");
        assert_eq!(body_of(response).await, Bytes::from_static(b"234"));
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let response = file_response(
            served(b"0123456789", SystemTime::now()),
            &headers(header::RANGE, "bytes=50-"),
            "image/png".to_string(),
            false,
        );

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[tokio::test]
    async fn test_head_keeps_length_without_body() {
        let response = file_response(
            served(b"0123456789", SystemTime::now()),
            &HeaderMap::new(),
            "image/png".to_string(),
            true,
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        assert!(body_of(response).await.is_empty());
    }
}
