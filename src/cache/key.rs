//! Resource Key Module
//!
//! Turns an inbound request path into the identifier used for both the
//! on-disk location and the upstream URL.

use std::fmt;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;

use crate::cache::{MAX_KEY_LENGTH, MAX_SEGMENT_LENGTH, STAGING_PREFIX};
use crate::error::{ProxyError, Result};

// == Resource Key ==
/// Normalized, storage-safe identifier of a cached resource.
///
/// Every segment is percent-decoded and guaranteed to be a plain file name:
/// no `.`/`..`, no separators, no NUL or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    segments: Vec<String>,
    canonical: String,
}

impl ResourceKey {
    // == Constructor ==
    /// Normalizes a raw (still percent-encoded) request path.
    ///
    /// Empty and `.` segments are dropped. Anything that could address a
    /// location outside the cache root is rejected rather than cleaned.
    pub fn from_request_path(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();

        for raw_segment in raw.split('/') {
            let segment = percent_decode_str(raw_segment)
                .decode_utf8()
                .map_err(|_| invalid(raw, "path is not valid UTF-8"))?;

            if segment.is_empty() || segment == "." {
                continue;
            }
            if segment == ".." {
                return Err(invalid(raw, "parent directory segment"));
            }
            if segment.contains('\0') {
                return Err(invalid(raw, "NUL byte"));
            }
            if segment.contains('/') || segment.contains('\\') {
                return Err(invalid(raw, "encoded path separator"));
            }
            if segment.chars().any(char::is_control) {
                return Err(invalid(raw, "control character"));
            }
            if segment.starts_with(STAGING_PREFIX) {
                return Err(invalid(raw, "reserved file name"));
            }
            if segment.len() > MAX_SEGMENT_LENGTH {
                return Err(invalid(raw, "segment too long"));
            }

            segments.push(segment.into_owned());
        }

        if segments.is_empty() {
            return Err(invalid(raw, "no resource named"));
        }

        let canonical = format!("/{}", segments.join("/"));
        if canonical.len() > MAX_KEY_LENGTH {
            return Err(invalid(raw, "path too long"));
        }

        Ok(Self {
            segments,
            canonical,
        })
    }

    /// Canonical `/a/b.png` form.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Decoded path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Location relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn invalid(raw: &str, reason: &str) -> ProxyError {
    ProxyError::InvalidPath(format!("{} ({})", raw.escape_debug(), reason))
}
