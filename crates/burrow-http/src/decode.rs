//! URL percent-decoding.
//!
//! Decoding is a single left-to-right pass over a byte buffer with a read
//! cursor and a write cursor. Every input byte produces at most one output
//! byte and an escape consumes three, so the write cursor never passes the
//! read cursor and the buffer is decoded in place.

use std::borrow::Cow;

/// Decodes `buf` in place.
///
/// - `%XX` with two hex digits becomes the byte `0xXX`
/// - `+` becomes a space
/// - every other byte is copied unchanged
///
/// A `%` that is not followed by two hex digits, including one too close to
/// the end of the buffer, is copied through literally and decoding resumes
/// at the next byte. Nothing past the end of `buf` is read.
///
/// The buffer is truncated to the decoded length, which is never greater
/// than the original length.
///
/// # Example
///
/// ```
/// use burrow_http::decode_in_place;
///
/// let mut buf = b"a%20b+c".to_vec();
/// decode_in_place(&mut buf);
/// assert_eq!(buf, b"a b c");
/// ```
pub fn decode_in_place(buf: &mut Vec<u8>) {
    let len = buf.len();
    let mut read = 0;
    let mut write = 0;

    while read < len {
        let byte = match buf[read] {
            b'%' => match escaped_byte(buf, read) {
                Some(decoded) => {
                    read += 2;
                    decoded
                }
                None => b'%',
            },
            b'+' => b' ',
            b => b,
        };
        buf[write] = byte;
        write += 1;
        read += 1;
    }

    buf.truncate(write);
}

/// Returns the byte encoded by the escape starting at `pos`, if it is a
/// complete `%XX` sequence.
fn escaped_byte(buf: &[u8], pos: usize) -> Option<u8> {
    let hi = hex_digit(*buf.get(pos + 1)?)?;
    let lo = hex_digit(*buf.get(pos + 2)?)?;
    Some((hi << 4) | lo)
}

/// Percent-decode a string.
///
/// Returns a `Cow::Borrowed` if no decoding was needed (most common case),
/// or `Cow::Owned` otherwise. Decoded bytes that do not form valid UTF-8
/// are replaced with U+FFFD.
///
/// # Example
///
/// ```
/// use burrow_http::percent_decode;
///
/// // No decoding needed - returns borrowed
/// let simple = percent_decode("hello");
/// assert!(matches!(simple, std::borrow::Cow::Borrowed(_)));
///
/// assert_eq!(&*percent_decode("hello%20world"), "hello world");
/// assert_eq!(&*percent_decode("hello+world"), "hello world");
/// ```
#[must_use]
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    // Fast path: no encoding
    if !s.contains(['%', '+']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(decode_bytes(s.as_bytes().to_vec()))
}

/// Decodes an owned byte buffer into a `String`.
pub(crate) fn decode_bytes(mut buf: Vec<u8>) -> String {
    decode_in_place(&mut buf);
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Converts `bytes` to a `String`, replacing invalid UTF-8 with U+FFFD, and
/// cuts the result to at most `max` bytes.
pub(crate) fn lossy_bounded(bytes: &[u8], max: usize) -> String {
    let mut s = String::from_utf8_lossy(bytes).into_owned();
    truncate_to_boundary(&mut s, max);
    s
}

/// Truncates `s` to at most `max` bytes without splitting a character.
///
/// Each replacement character is three bytes wide, so a lossy conversion
/// can grow a bounded byte slice; this puts the bound back.
pub(crate) fn truncate_to_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

/// Convert a hex digit to its numeric value.
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
