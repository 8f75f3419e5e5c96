//! Media type grammar (`type/subtype *( ";" name "=" value )`).
//!
//! Follows the RFC 7231 §3.1.1.1 shape: both halves of the essence are tokens,
//! parameter names are tokens, parameter values are tokens or quoted strings.
//! Type, subtype and parameter names are case-insensitive and normalised to
//! lowercase; parameter values keep their case.

use crate::error::{EncodingError, Result};
use crate::types::FormatId;
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// RFC 7230 `token`.
fn is_token(s: &str) -> bool {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"^[!#$%&'*+.^_`|~0-9A-Za-z-]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// A parsed media type: its essence as a [`FormatId`] plus parameters.
///
/// # Examples
///
/// ```
/// use rpc_encoding_http::protocol::MediaType;
///
/// let media = MediaType::parse("Text/Plain; charset=\"UTF-8\"").unwrap();
/// assert_eq!(media.format().as_str(), "text/plain");
/// assert_eq!(media.param("charset"), Some("UTF-8"));
///
/// assert!(MediaType::parse("not a media type").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    format: FormatId,
    params: BTreeMap<String, String>,
}

impl MediaType {
    /// Parse a single media type.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::InvalidMediaType`] when the essence is not
    /// `token/token`, a parameter is malformed, or a parameter name repeats.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || EncodingError::InvalidMediaType(raw.to_string());

        let (essence, rest) = match raw.find(';') {
            Some(pos) => (&raw[..pos], &raw[pos..]),
            None => (raw, ""),
        };

        let (kind, subtype) = essence.trim().split_once('/').ok_or_else(invalid)?;
        if !is_token(kind) || !is_token(subtype) {
            return Err(invalid());
        }

        let params = parse_params(rest).ok_or_else(invalid)?;

        Ok(MediaType {
            format: FormatId::new(format!("{kind}/{subtype}")),
            params,
        })
    }

    /// The `type/subtype` essence.
    #[inline]
    #[must_use]
    pub fn format(&self) -> &FormatId {
        &self.format
    }

    /// Consume the media type, keeping only its essence.
    #[must_use]
    pub fn into_format(self) -> FormatId {
        self.format
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All parameters, keyed by lowercase name.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl FromStr for MediaType {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self> {
        MediaType::parse(s)
    }
}

/// Parse `*( ";" name "=" value )`. Empty parameters (`;;` or a trailing `;`)
/// are tolerated.
fn parse_params(mut rest: &str) -> Option<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Some(params);
        }
        rest = rest.strip_prefix(';')?.trim_start();
        if rest.is_empty() || rest.starts_with(';') {
            continue;
        }

        let eq = rest.find('=')?;
        let name = rest[..eq].trim_end();
        if !is_token(name) {
            return None;
        }
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let (value, consumed) = parse_quoted(quoted)?;
            rest = &quoted[consumed..];
            value
        } else {
            let end = rest.find(';').unwrap_or(rest.len());
            let value = rest[..end].trim_end();
            if !is_token(value) {
                return None;
            }
            rest = &rest[end..];
            value.to_string()
        };

        if params.insert(name.to_ascii_lowercase(), value).is_some() {
            return None;
        }
    }
}

/// Parse the body of a quoted string (after the opening quote). Returns the
/// unescaped value and the number of bytes consumed including the closing quote.
fn parse_quoted(s: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = s.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, i + 1)),
            '\\' => value.push(chars.next()?.1),
            c => value.push(c),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let media = MediaType::parse("application/json").unwrap();
        assert_eq!(media.format(), &FormatId::new("application/json"));
        assert!(media.params().is_empty());
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let media = MediaType::parse("  APPLICATION/Xml ;  Q=0.5 ").unwrap();
        assert_eq!(media.format().as_str(), "application/xml");
        assert_eq!(media.param("q"), Some("0.5"));
    }

    #[test]
    fn test_parse_quoted_value() {
        let media = MediaType::parse(r#"text/plain; note="a \"quoted\" ; value""#).unwrap();
        assert_eq!(media.param("note"), Some(r#"a "quoted" ; value"#));
    }

    #[test]
    fn test_parse_trailing_semicolon() {
        let media = MediaType::parse("text/plain;").unwrap();
        assert_eq!(media.format().as_str(), "text/plain");
    }

    #[test]
    fn test_parse_wildcards() {
        assert_eq!(MediaType::parse("*/*").unwrap().format().as_str(), "*/*");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(MediaType::parse("").is_err());
        assert!(MediaType::parse("json").is_err());
        assert!(MediaType::parse("application/").is_err());
        assert!(MediaType::parse("application/json/extra").is_err());
        assert!(MediaType::parse("application/json; q").is_err());
        assert!(MediaType::parse("application/json; a=1; A=2").is_err());
        assert!(MediaType::parse(r#"text/plain; note="unterminated"#).is_err());
    }
}
