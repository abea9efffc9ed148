//! Parsing limits.

use serde::Deserialize;

/// Bounds applied while parsing a request.
///
/// Every token the parser extracts is cut at its bound; nothing over a limit
/// is ever an error. Limits are in bytes.
///
/// Deserializes from partial configs: missing fields keep their defaults.
///
/// # Example
///
/// ```
/// use burrow_core::ParseLimits;
///
/// let limits = ParseLimits::new().with_max_line_len(4096);
/// assert_eq!(limits.max_line_len, 4096);
/// assert_eq!(limits.max_url_len, 255);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseLimits {
    /// Capacity of the line buffer. Bytes past it are dropped.
    pub max_line_len: usize,
    /// Maximum method token length.
    pub max_method_len: usize,
    /// Maximum raw URL token length.
    pub max_url_len: usize,
    /// Maximum protocol version token length.
    pub max_version_len: usize,
    /// Maximum header name length (including the trailing colon).
    pub max_header_name_len: usize,
    /// Maximum header value length.
    pub max_header_value_len: usize,
    /// Maximum query key length, before decoding.
    pub max_query_key_len: usize,
    /// Maximum query value length, before decoding.
    pub max_query_value_len: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_method_len: 15,
            max_url_len: 255,
            max_version_len: 15,
            max_header_name_len: 31,
            max_header_value_len: 255,
            max_query_key_len: 31,
            max_query_value_len: 255,
        }
    }
}

impl ParseLimits {
    /// Creates limits with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line buffer capacity.
    #[must_use]
    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    /// Set the raw URL bound.
    #[must_use]
    pub fn with_max_url_len(mut self, len: usize) -> Self {
        self.max_url_len = len;
        self
    }

    /// Set the header name bound.
    #[must_use]
    pub fn with_max_header_name_len(mut self, len: usize) -> Self {
        self.max_header_name_len = len;
        self
    }

    /// Set the header value bound.
    #[must_use]
    pub fn with_max_header_value_len(mut self, len: usize) -> Self {
        self.max_header_value_len = len;
        self
    }

    /// Set the query key and value bounds.
    #[must_use]
    pub fn with_query_bounds(mut self, key_len: usize, value_len: usize) -> Self {
        self.max_query_key_len = key_len;
        self.max_query_value_len = value_len;
        self
    }
}
