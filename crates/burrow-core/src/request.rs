//! Request line types.

use std::fmt;

/// HTTP method.
///
/// Only the methods the parser dispatches are representable; any other
/// token on the request line rejects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method.
    Get,
    /// POST method.
    Post,
    /// HEAD method.
    Head,
}

impl Method {
    /// Parse method from bytes (case-sensitive).
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Self::Get),
            b"POST" => Some(Self::Post),
            b"HEAD" => Some(Self::Head),
            _ => None,
        }
    }

    /// Return the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol version.
///
/// Only `HTTP/1.1` is recognized; every other version token, valid or not,
/// is treated as HTTP/1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpVersion {
    /// HTTP/1.0 (or anything that is not exactly `HTTP/1.1`).
    #[default]
    Http10,
    /// HTTP/1.1.
    Http11,
}

impl HttpVersion {
    /// Maps a version token to a version. Never fails.
    #[must_use]
    pub fn from_token(token: &[u8]) -> Self {
        if token == b"HTTP/1.1" {
            Self::Http11
        } else {
            Self::Http10
        }
    }

    /// Returns the version as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method and protocol version packed into one byte.
///
/// A fresh request has no bits set: method unset, HTTP/1.0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RequestFlags(u8);

impl RequestFlags {
    /// GET request.
    pub const GET: u8 = 0x01;
    /// POST request.
    pub const POST: u8 = 0x02;
    /// HEAD request.
    pub const HEAD: u8 = 0x04;
    /// Client spoke HTTP/1.1.
    pub const HTTP11: u8 = 0x10;

    const METHOD_MASK: u8 = Self::GET | Self::POST | Self::HEAD;

    /// Flags with nothing set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds flags from a parsed method and version.
    #[must_use]
    pub fn new(method: Method, version: HttpVersion) -> Self {
        let mut bits = match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Head => Self::HEAD,
        };
        if version == HttpVersion::Http11 {
            bits |= Self::HTTP11;
        }
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns the method, or `None` while the request line is unparsed.
    #[must_use]
    pub fn method(self) -> Option<Method> {
        match self.0 & Self::METHOD_MASK {
            Self::GET => Some(Method::Get),
            Self::POST => Some(Method::Post),
            Self::HEAD => Some(Method::Head),
            _ => None,
        }
    }

    /// Returns true if the HTTP/1.1 bit is set.
    #[must_use]
    pub const fn is_http11(self) -> bool {
        self.0 & Self::HTTP11 != 0
    }

    /// Returns the protocol version.
    #[must_use]
    pub fn version(self) -> HttpVersion {
        if self.is_http11() {
            HttpVersion::Http11
        } else {
            HttpVersion::Http10
        }
    }
}

impl fmt::Debug for RequestFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFlags")
            .field("method", &self.method())
            .field("version", &self.version())
            .finish()
    }
}
