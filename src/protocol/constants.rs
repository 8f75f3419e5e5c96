//! Protocol constants: well-known media types and the status success range.

/// Media types registered by [`Registry::with_default_codecs`](crate::Registry::with_default_codecs).
pub mod media {
    /// JSON, primary identifier.
    pub const APPLICATION_JSON: &str = "application/json";
    /// JSON, legacy identifier.
    pub const TEXT_JSON: &str = "text/json";
    /// XML, primary identifier.
    pub const APPLICATION_XML: &str = "application/xml";
    /// XML, legacy identifier.
    pub const TEXT_XML: &str = "text/xml";
    /// Postcard binary, primary identifier.
    pub const APPLICATION_POSTCARD: &str = "application/postcard";
    /// Postcard binary, octet-stream flavoured identifier.
    pub const OCTET_STREAM_POSTCARD: &str = "application/octet-stream+postcard";
    /// Plain text; carries bare error messages on non-success responses.
    pub const TEXT_PLAIN: &str = "text/plain";
}

/// Sniff hints of the default codecs: first code points that suggest a format.
pub mod hints {
    /// JSON documents open with an object or an array.
    pub const JSON: &[char] = &['{', '['];
    /// XML documents open with a tag or a prolog.
    pub const XML: &[char] = &['<'];
    /// The binary format has no recognisable leading byte.
    pub const BINARY: &[char] = &[];
}

/// Lowest status code treated as success.
pub const SUCCESS_MIN: u16 = 200;

/// Highest status code treated as success.
pub const SUCCESS_MAX: u16 = 299;

/// Whether `status` lies within the success range (200–299 inclusive).
#[inline]
#[must_use]
pub fn is_success(status: http::StatusCode) -> bool {
    (SUCCESS_MIN..=SUCCESS_MAX).contains(&status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_success_range_is_inclusive() {
        assert!(is_success(StatusCode::OK));
        assert!(is_success(StatusCode::from_u16(299).unwrap()));
        assert!(!is_success(StatusCode::from_u16(199).unwrap()));
        assert!(!is_success(StatusCode::MULTIPLE_CHOICES));
        assert!(!is_success(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
