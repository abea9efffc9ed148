//! Query string splitting.
//!
//! A raw request URL is split at its first `?` into a clean, decoded path
//! and an ordered [`Dict`] of decoded query parameters.
//!
//! # Example
//!
//! ```
//! use burrow_core::ParseLimits;
//! use burrow_http::split_query;
//!
//! let (path, query) = split_query("/foo%20bar?a=1&b=2&a=3", &ParseLimits::default());
//!
//! assert_eq!(path, "/foo bar");
//! assert_eq!(query.get("a"), Some("1"));
//! assert_eq!(query.get_all("a").collect::<Vec<_>>(), vec!["1", "3"]);
//! ```

use burrow_core::{Dict, ParseLimits};
use memchr::memchr;

use crate::decode::{decode_bytes, percent_decode, truncate_to_boundary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairState {
    Key,
    Value,
}

/// Splits a raw URL into its decoded path and query parameters.
///
/// Pairs are separated by `&` and split at the first `=`. A `&` met while
/// reading a key is kept as part of the key, and a key without `=` at the
/// end of the string gets an empty value. Keys and values are cut at
/// `max_query_key_len` / `max_query_value_len` bytes, then percent-decoded
/// independently. Duplicate keys are all kept, in order.
///
/// Without a `?` the query map is empty.
#[must_use]
pub fn split_query(raw: &str, limits: &ParseLimits) -> (String, Dict) {
    let Some(pos) = memchr(b'?', raw.as_bytes()) else {
        return (percent_decode(raw).into_owned(), Dict::new());
    };

    let path = percent_decode(&raw[..pos]).into_owned();
    let query = parse_pairs(&raw.as_bytes()[pos + 1..], limits);
    (path, query)
}

fn parse_pairs(bytes: &[u8], limits: &ParseLimits) -> Dict {
    let mut dict = Dict::new();
    let mut key = Vec::new();
    let mut value = Vec::new();
    let mut state = PairState::Key;

    for &b in bytes {
        match state {
            PairState::Key if b == b'=' => state = PairState::Value,
            PairState::Key => push_bounded(&mut key, b, limits.max_query_key_len),
            PairState::Value if b == b'&' => {
                emit_pair(&mut dict, &mut key, &mut value, limits);
                state = PairState::Key;
            }
            PairState::Value => push_bounded(&mut value, b, limits.max_query_value_len),
        }
    }

    // End of input flushes the pair in progress.
    if state == PairState::Value || !key.is_empty() {
        emit_pair(&mut dict, &mut key, &mut value, limits);
    }

    dict
}

fn emit_pair(dict: &mut Dict, key: &mut Vec<u8>, value: &mut Vec<u8>, limits: &ParseLimits) {
    let mut key = decode_bytes(std::mem::take(key));
    truncate_to_boundary(&mut key, limits.max_query_key_len);
    let mut value = decode_bytes(std::mem::take(value));
    truncate_to_boundary(&mut value, limits.max_query_value_len);
    dict.add(key, value);
}

fn push_bounded(buf: &mut Vec<u8>, byte: u8, max: usize) {
    if buf.len() < max {
        buf.push(byte);
    }
}
