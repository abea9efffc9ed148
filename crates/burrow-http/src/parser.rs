//! Request line and header line parsers.
//!
//! Both parsers work on one logical line at a time, as produced by the
//! [`LineAccumulator`](crate::LineAccumulator): CR bytes already removed,
//! no trailing LF.
//!
//! Tokens are scanned with fixed widths. A token longer than its bound in
//! [`ParseLimits`] is cut at the bound and whatever is left of it becomes
//! the start of the next field; this is never an error. Stored text never
//! exceeds its bound in bytes, even after invalid UTF-8 is replaced.
//!
//! # Example
//!
//! ```
//! use burrow_core::{HttpVersion, Method, ParseLimits};
//! use burrow_http::{HeaderLine, RequestLine};
//!
//! let limits = ParseLimits::default();
//!
//! let line = RequestLine::parse(b"GET /items?id=3 HTTP/1.1", &limits).unwrap();
//! assert_eq!(line.method(), Method::Get);
//! assert_eq!(line.url(), "/items?id=3");
//! assert_eq!(line.version(), HttpVersion::Http11);
//!
//! let header = HeaderLine::parse(b"Host: example.com", &limits).unwrap();
//! assert_eq!(header.name(), "Host");
//! assert_eq!(header.value(), "example.com");
//! ```

use burrow_core::{HttpVersion, Method, ParseLimits};

use crate::decode::lossy_bounded;

/// HTTP parsing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Method token missing or not one of GET, POST, HEAD.
    InvalidMethod,
    /// Request line has a method but no URL.
    InvalidRequestLine,
    /// The request was rejected earlier and accepts no more input.
    Rejected,
    /// The request was already dispatched and accepts no more input.
    AlreadyDispatched,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMethod => write!(f, "invalid HTTP method"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::Rejected => write!(f, "request was rejected"),
            Self::AlreadyDispatched => write!(f, "request was already dispatched"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Fixed-width field scanner over one line.
///
/// Each field skips leading whitespace and then takes at most `max`
/// non-whitespace bytes. A field cut at its width leaves the rest of its
/// token in place, so the next field starts there.
struct Fields<'a> {
    remaining: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self { remaining: line }
    }

    fn next(&mut self, max: usize) -> Option<&'a [u8]> {
        let start = self
            .remaining
            .iter()
            .position(|b| !b.is_ascii_whitespace())?;
        let rest = &self.remaining[start..];
        let end = rest
            .iter()
            .take(max)
            .position(u8::is_ascii_whitespace)
            .unwrap_or(rest.len().min(max));
        self.remaining = &rest[end..];
        Some(&rest[..end])
    }
}

// ============================================================================
// Request Line
// ============================================================================

/// A parsed request line.
///
/// The URL is kept verbatim, query string included; splitting it is
/// deferred until the query is first needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    url: String,
    version: HttpVersion,
}

impl RequestLine {
    /// Parse a request line.
    ///
    /// Three fields are read: method, URL and version, each cut at its
    /// bound in `limits`. When a field is cut, the rest of its token is read
    /// as the next field, so an over-long URL spills into the version. The
    /// version is optional and anything other than exactly `HTTP/1.1` means
    /// HTTP/1.0.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidMethod` if the method is missing or not
    /// GET, POST or HEAD.
    /// Returns `ParseError::InvalidRequestLine` if the URL is missing.
    pub fn parse(line: &[u8], limits: &ParseLimits) -> Result<Self, ParseError> {
        let mut fields = Fields::new(line);

        let method = fields
            .next(limits.max_method_len)
            .and_then(Method::from_bytes)
            .ok_or(ParseError::InvalidMethod)?;

        let url = fields
            .next(limits.max_url_len)
            .ok_or(ParseError::InvalidRequestLine)?;
        let url = lossy_bounded(url, limits.max_url_len);

        let version = fields
            .next(limits.max_version_len)
            .map_or(HttpVersion::Http10, HttpVersion::from_token);

        Ok(Self {
            method,
            url,
            version,
        })
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the raw URL, query string included.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the protocol version.
    #[must_use]
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// Consumes the line, returning the owned URL.
    #[must_use]
    pub fn into_url(self) -> String {
        self.url
    }
}

// ============================================================================
// Header Line
// ============================================================================

/// A parsed `Name: Value` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    name: String,
    value: String,
}

impl HeaderLine {
    /// Parse a header line.
    ///
    /// Leading whitespace is skipped. The name is the token up to the next
    /// whitespace byte, cut at `max_header_name_len`, with one trailing `:`
    /// removed. The value starts one byte past the end of that cut token
    /// and runs to the end of the line, cut at `max_header_value_len`; it
    /// is not trimmed. For a name within its bound the skipped byte is the
    /// separator. For an over-long name it is a name byte, and the value
    /// begins with the rest of the name.
    ///
    /// A line whose token is not followed by whitespace (`Name:value`,
    /// `Name`) yields that token as the name and an empty value.
    ///
    /// Returns `None` for a line with no token or an empty name (`:`);
    /// such lines carry no header.
    #[must_use]
    pub fn parse(line: &[u8], limits: &ParseLimits) -> Option<Self> {
        let start = line.iter().position(|b| !b.is_ascii_whitespace())?;
        let rest = &line[start..];
        let token = Fields::new(rest).next(limits.max_header_name_len)?;
        let name = token.strip_suffix(b":").unwrap_or(token);
        if name.is_empty() {
            return None;
        }

        let value = rest.get(token.len() + 1..).unwrap_or_default();
        let value = &value[..value.len().min(limits.max_header_value_len)];

        Some(Self {
            name: lossy_bounded(name, limits.max_header_name_len),
            value: lossy_bounded(value, limits.max_header_value_len),
        })
    }

    /// Returns the header name (case-preserved).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the header value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consumes the line, returning `(name, value)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.name, self.value)
    }
}
