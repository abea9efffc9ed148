//! Property-based testing helpers.
//!
//! Strategies for generating well-formed request heads, used to check that
//! parsing does not depend on how the input is chunked.
//!
//! # Example
//!
//! ```ignore
//! use burrow_core::proptest::*;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn parses(head in request_head()) {
//!         let bytes = head.to_wire();
//!         // feed `bytes` and compare against `head`
//!     }
//! }
//! ```

use proptest::prelude::*;

use crate::request::{HttpVersion, Method};

/// Strategy that generates any dispatchable method.
pub fn arbitrary_method() -> impl Strategy<Value = Method> {
    prop_oneof![Just(Method::Get), Just(Method::Post), Just(Method::Head)]
}

/// Strategy that generates either protocol version.
pub fn arbitrary_version() -> impl Strategy<Value = HttpVersion> {
    prop_oneof![Just(HttpVersion::Http10), Just(HttpVersion::Http11)]
}

/// Strategy that generates plain paths such as `/items/123`.
///
/// Paths contain no `%`, `+`, `?` or whitespace, so they decode to themselves.
pub fn valid_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_.-]{1,10}", 0..4).prop_map(|segments| {
        if segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", segments.join("/"))
        }
    })
}

/// Strategy that generates query pairs with plain keys and values.
pub fn query_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z][a-z0-9_]{0,8}", "[a-zA-Z0-9_.-]{0,12}"), 0..5)
}

/// Strategy that generates header pairs with token names and printable values.
pub fn header_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[A-Z][A-Za-z0-9-]{0,15}", "[!-~]{1,20}"), 0..8)
}

/// A generated request head and the parts it was built from.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Request method.
    pub method: Method,
    /// Protocol version.
    pub version: HttpVersion,
    /// Path without query string.
    pub path: String,
    /// Query pairs, in order.
    pub query: Vec<(String, String)>,
    /// Header pairs, in order.
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Returns the URL as it appears on the request line.
    #[must_use]
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", self.path, query.join("&"))
    }

    /// Serializes the head with CRLF line endings and the terminating blank line.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = format!("{} {} {}\r\n", self.method, self.url(), self.version);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// Strategy that generates complete request heads.
pub fn request_head() -> impl Strategy<Value = RequestHead> {
    (
        arbitrary_method(),
        arbitrary_version(),
        valid_path(),
        query_pairs(),
        header_pairs(),
    )
        .prop_map(|(method, version, path, query, headers)| RequestHead {
            method,
            version,
            path,
            query,
            headers,
        })
}

/// Strategy that generates sorted split points for a buffer of `len` bytes.
pub fn split_points(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..=len, 0..8).prop_map(|mut points| {
        points.sort_unstable();
        points.dedup();
        points
    })
}
