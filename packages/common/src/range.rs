//! Parsing of single-range HTTP `Range` headers against a known resource size.
//!
//! Only the `bytes` unit is understood. When a header lists several ranges,
//! the first one is honoured and the rest are ignored, so the response is
//! always a single contiguous window.

const BYTES_PREFIX: &str = "bytes=";

/// An inclusive byte window `[start, end]` within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` value for a partial response.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Result of evaluating a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No header was sent; the whole resource should be served.
    NoRange,
    /// The header selects a window that lies inside the resource.
    Satisfiable(ByteRange),
    /// The header is well formed but points outside the resource.
    Unsatisfiable,
    /// The header could not be understood.
    Malformed,
}

/// `Content-Range` value for a 416 response.
pub fn unsatisfied_content_range(total: u64) -> String {
    format!("bytes */{total}")
}

/// Evaluate an optional `Range` header value against `total` bytes.
///
/// * `bytes=<start>-<end>` selects `[start, end]`.
/// * `bytes=<start>-` runs to the last byte.
/// * `bytes=-<n>` selects the final `n` bytes.
///
/// Any bound at or past `total`, or an `end` before `start`, is unsatisfiable.
/// Non-numeric bounds and other units are malformed.
pub fn parse_range(header: Option<&str>, total: u64) -> RangeOutcome {
    let Some(header) = header else {
        return RangeOutcome::NoRange;
    };

    let Some(spec) = header.trim().strip_prefix(BYTES_PREFIX) else {
        return RangeOutcome::Malformed;
    };

    let first = spec.split(',').next().unwrap_or_default().trim();
    let Some((start_str, end_str)) = first.split_once('-') else {
        return RangeOutcome::Malformed;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return parse_suffix(end_str, total);
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return RangeOutcome::Malformed;
    };

    let end = if end_str.is_empty() {
        match total.checked_sub(1) {
            Some(last) => last,
            None => return RangeOutcome::Unsatisfiable,
        }
    } else {
        match end_str.parse::<u64>() {
            Ok(end) => end,
            Err(_) => return RangeOutcome::Malformed,
        }
    };

    if start >= total || end >= total || end < start {
        return RangeOutcome::Unsatisfiable;
    }

    RangeOutcome::Satisfiable(ByteRange { start, end })
}

fn parse_suffix(len_str: &str, total: u64) -> RangeOutcome {
    let Ok(suffix) = len_str.parse::<u64>() else {
        return RangeOutcome::Malformed;
    };
    if suffix == 0 || total == 0 {
        return RangeOutcome::Unsatisfiable;
    }
    RangeOutcome::Satisfiable(ByteRange {
        start: total.saturating_sub(suffix),
        end: total - 1,
    })
}
