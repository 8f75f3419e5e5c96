//! `Accept` and `Content-Type` parsing.
//!
//! Both parsers are deliberately forgiving: a malformed `Accept` segment is
//! dropped rather than failing the whole header, and an unparsable
//! `Content-Type` yields an empty [`FormatId`] so that the caller falls back to
//! sniffing.
//!
//! | Header | Input | Result |
//! |--------|-------|--------|
//! | Accept | `application/xml;q=0.7, application/json` | two entries, json preferred |
//! | Accept | `garbage, text/xml` | one entry (`text/xml`) |
//! | Content-Type | `application/json; charset=utf-8` | `application/json` |
//! | Content-Type | `nonsense` | empty |
//!
//! # Examples
//!
//! ```
//! use rpc_encoding_http::protocol::{parse_accept, parse_content_type};
//!
//! let accept = parse_accept("application/xml;q=0.7,application/json;q=0.8");
//! assert_eq!(accept.highest().as_str(), "application/json");
//!
//! let ct = parse_content_type("text/xml; charset=utf-8");
//! assert_eq!(ct.as_str(), "text/xml");
//! ```

use super::media_type::MediaType;
use crate::types::FormatId;
use http::HeaderMap;

/// One entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    /// The accepted format (parameters other than `q` are discarded).
    pub format: FormatId,
    /// Preference weight in `[0.0, 1.0]`; defaults to `1.0`.
    pub quality: f32,
}

impl AcceptEntry {
    /// Create an entry, clamping the quality into `[0.0, 1.0]`.
    pub fn new(format: impl Into<FormatId>, quality: f32) -> Self {
        AcceptEntry {
            format: format.into(),
            quality: quality.clamp(0.0, 1.0),
        }
    }
}

/// A parsed `Accept` header, entries kept in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptHeader {
    /// Entries that parsed successfully.
    pub entries: Vec<AcceptEntry>,
}

impl AcceptHeader {
    /// The format with the highest quality; see [`highest`].
    #[must_use]
    pub fn highest(&self) -> FormatId {
        highest(&self.entries)
    }

    /// Whether no entries survived parsing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an `Accept` header value.
///
/// The value is split on commas; each segment is parsed as a media type with
/// an optional `q` parameter. Segments that fail to parse, or whose `q` is not
/// a number, are dropped. A missing `q` means `1.0`; out-of-range values are
/// clamped into `[0.0, 1.0]`.
///
/// Quoted parameter values containing commas are not supported: the split
/// is purely textual.
pub fn parse_accept(raw: &str) -> AcceptHeader {
    let entries = raw
        .split(',')
        .filter_map(|segment| {
            let media = MediaType::parse(segment).ok()?;
            let quality = match media.param("q") {
                Some(q) => q.trim().parse::<f32>().ok().filter(|q| !q.is_nan())?,
                None => 1.0,
            };
            Some(AcceptEntry::new(media.into_format(), quality))
        })
        .collect();

    AcceptHeader { entries }
}

/// The format of the entry with the strictly greatest quality.
///
/// Scans linearly, replacing the candidate only on a strictly greater
/// quality, starting from zero. Ties therefore resolve to the first maximum
/// in header order, and an empty list (or one where every quality is zero)
/// yields an empty [`FormatId`].
///
/// # Examples
///
/// ```
/// use rpc_encoding_http::protocol::{highest, AcceptEntry};
///
/// let entries = vec![
///     AcceptEntry::new("application/xml", 0.9),
///     AcceptEntry::new("application/json", 0.9),
/// ];
/// assert_eq!(highest(&entries).as_str(), "application/xml");
/// assert!(highest(&[]).is_empty());
/// ```
pub fn highest(entries: &[AcceptEntry]) -> FormatId {
    let mut best = FormatId::empty();
    let mut max = 0.0_f32;

    for entry in entries {
        if entry.quality > max {
            max = entry.quality;
            best = entry.format.clone();
        }
    }

    best
}

/// Parse a `Content-Type` header value into its bare format.
///
/// Only the first comma-separated segment is considered; parameters are
/// discarded. Any parse failure yields an empty [`FormatId`].
pub fn parse_content_type(raw: &str) -> FormatId {
    let first = raw.split(',').next().unwrap_or_default();
    MediaType::parse(first)
        .map(MediaType::into_format)
        .unwrap_or_default()
}

/// Read a header as text, treating absent or non-ASCII values as empty.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &http::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accept_with_qualities() {
        let accept =
            parse_accept("application/xml;q=0.7,application/json;q=0.8,application/postcard;q=0.9");
        assert_eq!(accept.entries.len(), 3);
        assert_eq!(accept.entries[0].format, "application/xml");
        assert!((accept.entries[0].quality - 0.7).abs() < f32::EPSILON);
        assert_eq!(accept.highest(), "application/postcard");
    }

    #[test]
    fn test_parse_accept_defaults_quality() {
        let accept = parse_accept("text/xml");
        assert_eq!(accept.entries, vec![AcceptEntry::new("text/xml", 1.0)]);
    }

    #[test]
    fn test_parse_accept_drops_malformed() {
        let accept = parse_accept("garbage, application/json;q=abc, text/xml;q=0.5,");
        assert_eq!(accept.entries.len(), 1);
        assert_eq!(accept.entries[0].format, "text/xml");
    }

    #[test]
    fn test_parse_accept_clamps_quality() {
        let accept = parse_accept("application/json;q=7, text/xml;q=-1");
        assert!((accept.entries[0].quality - 1.0).abs() < f32::EPSILON);
        assert_eq!(accept.entries[1].quality, 0.0);
    }

    #[test]
    fn test_highest_first_maximum_wins() {
        let accept = parse_accept("application/json, text/xml");
        assert_eq!(accept.highest(), "application/json");
    }

    #[test]
    fn test_highest_ignores_zero_quality() {
        let accept = parse_accept("application/json;q=0");
        assert!(accept.highest().is_empty());
        assert!(parse_accept("").highest().is_empty());
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type("application/json; charset=utf-8"),
            "application/json"
        );
        assert_eq!(parse_content_type("Text/XML, application/json"), "text/xml");
        assert!(parse_content_type("").is_empty());
        assert!(parse_content_type("not-a-type").is_empty());
    }
}
