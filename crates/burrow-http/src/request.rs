//! The request aggregate.
//!
//! A [`Request`] is fed raw bytes over any number of calls. It accumulates
//! lines, parses the request line and headers as they complete, and calls
//! its handler exactly once when the blank line ending the header section
//! arrives.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use burrow_core::{HttpVersion, Method, ParseLimits};
//! use burrow_http::{ConnectionId, NotFound, ParseStatus, Request, SocketHandle};
//!
//! let mut req = Request::new(
//!     ConnectionId::new(1),
//!     SocketHandle::new(3),
//!     Arc::new(NotFound),
//!     ParseLimits::default(),
//! );
//!
//! assert!(matches!(req.feed(b"GET /search?q=rust HT").unwrap(), ParseStatus::Incomplete));
//! let status = req.feed(b"TP/1.1\r\nHost: x\r\n\r\n").unwrap();
//! assert!(matches!(status, ParseStatus::Dispatched { consumed: 19, .. }));
//!
//! assert_eq!(req.method(), Some(Method::Get));
//! assert_eq!(req.version(), HttpVersion::Http11);
//! assert_eq!(req.header("Host"), Some("x"));
//! assert_eq!(req.query_value("q"), Some("rust"));
//! assert_eq!(req.path(), Some("/search"));
//! ```

use std::fmt;
use std::sync::Arc;

use burrow_core::logging::{LogLevel, level_enabled};
use burrow_core::{Dict, HttpVersion, Method, ParseLimits, RequestFlags, log_debug, log_info, log_warn};

use crate::accumulator::{AccumulatorStatus, Flow, Line, LineAccumulator};
use crate::handler::{Handler, HandlerOutcome};
use crate::parser::{HeaderLine, ParseError, RequestLine};
use crate::query::split_query;
use crate::server::{ConnectionId, SocketHandle};

/// Maximum bytes of an offending line copied into a diagnostic.
const LOG_PREVIEW_LEN: usize = 32;

/// Result of feeding bytes to a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// All bytes were consumed; the header section is not complete yet.
    Incomplete,
    /// The header section ended and the handler ran.
    ///
    /// `consumed` is the number of input bytes used by this call, up to and
    /// including the terminating blank line. Bytes after it belong to the
    /// next request on the connection.
    Dispatched {
        /// Bytes consumed from the input.
        consumed: usize,
        /// What the handler returned.
        outcome: HandlerOutcome,
    },
}

/// Error from [`Request::advance_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// No request line has been parsed yet.
    NoPath,
    /// The offset runs past the end of the current path view.
    OutOfBounds {
        /// Requested offset.
        offset: usize,
        /// Bytes left in the current view.
        remaining: usize,
    },
    /// The offset would split a UTF-8 character.
    NotCharBoundary {
        /// Requested offset.
        offset: usize,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPath => write!(f, "request has no path yet"),
            Self::OutOfBounds { offset, remaining } => write!(
                f,
                "path offset {offset} out of bounds ({remaining} bytes remaining)"
            ),
            Self::NotCharBoundary { offset } => {
                write!(f, "path offset {offset} is not on a character boundary")
            }
        }
    }
}

impl std::error::Error for PathError {}

// ============================================================================
// Path view
// ============================================================================

/// Owned path plus the start of the current view into it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestPath {
    full: String,
    offset: usize,
}

impl RequestPath {
    fn new(full: String) -> Self {
        Self { full, offset: 0 }
    }

    fn view(&self) -> &str {
        &self.full[self.offset..]
    }

    fn advance(&mut self, by: usize) -> Result<(), PathError> {
        let remaining = self.full.len() - self.offset;
        if by > remaining {
            return Err(PathError::OutOfBounds {
                offset: by,
                remaining,
            });
        }
        let next = self.offset + by;
        if !self.full.is_char_boundary(next) {
            return Err(PathError::NotCharBoundary { offset: by });
        }
        self.offset = next;
        Ok(())
    }
}

// ============================================================================
// Parsed head
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    RequestLine,
    Headers,
    Dispatched,
    Rejected,
}

/// Everything the line callback writes while the header section is read.
#[derive(Debug)]
struct Head {
    phase: Phase,
    flags: RequestFlags,
    path: Option<RequestPath>,
    headers: Dict,
}

impl Head {
    fn new() -> Self {
        Self {
            phase: Phase::RequestLine,
            flags: RequestFlags::empty(),
            path: None,
            headers: Dict::new(),
        }
    }

    fn on_line(
        &mut self,
        line: Line<'_>,
        limits: &ParseLimits,
        connection: ConnectionId,
    ) -> Result<Flow, ParseError> {
        match (self.phase, line) {
            // Stray blank lines before the request line are skipped.
            (Phase::RequestLine, Line::Blank) => Ok(Flow::Continue),
            (Phase::RequestLine, Line::Text(text)) => {
                self.request_line(text, limits, connection)?;
                Ok(Flow::Continue)
            }
            (Phase::Headers, Line::Blank) => Ok(Flow::EndOfHeaders),
            (Phase::Headers, Line::Text(text)) => {
                self.header_line(text, limits, connection);
                Ok(Flow::Continue)
            }
            (Phase::Dispatched, _) => Err(ParseError::AlreadyDispatched),
            (Phase::Rejected, _) => Err(ParseError::Rejected),
        }
    }

    fn request_line(
        &mut self,
        text: &[u8],
        limits: &ParseLimits,
        connection: ConnectionId,
    ) -> Result<(), ParseError> {
        match RequestLine::parse(text, limits) {
            Ok(line) => {
                self.flags = RequestFlags::new(line.method(), line.version());
                self.path = Some(RequestPath::new(line.into_url()));
                self.phase = Phase::Headers;
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Rejected;
                log_warn!(
                    "rejected request line",
                    error => err,
                    line => preview(text),
                )
                .connection(connection.get())
                .emit();
                Err(err)
            }
        }
    }

    fn header_line(&mut self, text: &[u8], limits: &ParseLimits, connection: ConnectionId) {
        if let Some(header) = HeaderLine::parse(text, limits) {
            let (name, value) = header.into_parts();
            self.headers.add(name, value);
        } else if level_enabled(LogLevel::Debug) {
            log_debug!("ignored header line", line => preview(text))
                .connection(connection.get())
                .emit();
        }
    }
}

fn preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(LOG_PREVIEW_LEN)]).into_owned()
}

// ============================================================================
// Request
// ============================================================================

/// An HTTP request being parsed, then handled.
///
/// Created per connection (or per pipelined request) and fed bytes with
/// [`feed`](Self::feed). Input slices are never retained; every extracted
/// value is copied.
///
/// The query string is left in the path until it is first asked for.
/// [`ensure_query_parsed`](Self::ensure_query_parsed) then splits it off
/// once, replaces the path with the clean decoded one and builds the query
/// map.
pub struct Request {
    connection: ConnectionId,
    socket: SocketHandle,
    handler: Arc<dyn Handler>,
    limits: ParseLimits,
    accumulator: LineAccumulator,
    head: Head,
    query: Option<Dict>,
}

impl Request {
    /// Creates an empty request.
    #[must_use]
    pub fn new(
        connection: ConnectionId,
        socket: SocketHandle,
        handler: Arc<dyn Handler>,
        limits: ParseLimits,
    ) -> Self {
        let accumulator = LineAccumulator::new(limits.max_line_len).for_connection(connection.get());
        Self {
            connection,
            socket,
            handler,
            limits,
            accumulator,
            head: Head::new(),
            query: None,
        }
    }

    /// Feeds bytes to the request.
    ///
    /// Consumes input until the header section ends or the input runs out.
    /// When the blank line ending the headers is read the handler is called
    /// and the call returns immediately; any bytes after that line are left
    /// untouched and reported through `consumed`.
    ///
    /// # Errors
    ///
    /// - `ParseError::InvalidMethod` / `ParseError::InvalidRequestLine` if
    ///   the request line is malformed. The request is rejected and the
    ///   handler is never called.
    /// - `ParseError::Rejected` if the request was rejected before.
    /// - `ParseError::AlreadyDispatched` if the request was already handled.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<ParseStatus, ParseError> {
        match self.head.phase {
            Phase::Dispatched => return Err(ParseError::AlreadyDispatched),
            Phase::Rejected => return Err(ParseError::Rejected),
            Phase::RequestLine | Phase::Headers => {}
        }

        let head = &mut self.head;
        let limits = &self.limits;
        let connection = self.connection;
        let status = self
            .accumulator
            .feed(bytes, |line| head.on_line(line, limits, connection))?;

        match status {
            AccumulatorStatus::NeedMore => Ok(ParseStatus::Incomplete),
            AccumulatorStatus::EndOfHeaders { consumed } => {
                let outcome = self.dispatch();
                Ok(ParseStatus::Dispatched { consumed, outcome })
            }
        }
    }

    fn dispatch(&mut self) -> HandlerOutcome {
        self.head.phase = Phase::Dispatched;
        self.accumulator.reset();

        if level_enabled(LogLevel::Info) {
            let method = self.method().map_or("-", Method::as_str);
            log_info!(
                "dispatch",
                method => method,
                path => self.path().unwrap_or_default(),
            )
            .connection(self.connection.get())
            .emit();
        }

        let handler = Arc::clone(&self.handler);
        handler.handle(self)
    }

    /// Returns the current path view.
    ///
    /// `None` until the request line has been parsed. Before the query is
    /// parsed this is the raw URL, query string included.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.head.path.as_ref().map(RequestPath::view)
    }

    /// Returns the whole path, ignoring any [`advance_path`](Self::advance_path).
    #[must_use]
    pub fn full_path(&self) -> Option<&str> {
        self.head.path.as_ref().map(|p| p.full.as_str())
    }

    /// Moves the start of the path view forward by `offset` bytes.
    ///
    /// Advances compound: the offset is relative to the current view.
    ///
    /// # Errors
    ///
    /// Fails, leaving the view unchanged, if there is no path yet, if the
    /// offset is past the end of the view, or if it would split a character.
    pub fn advance_path(&mut self, offset: usize) -> Result<(), PathError> {
        self.head
            .path
            .as_mut()
            .ok_or(PathError::NoPath)?
            .advance(offset)
    }

    pub(crate) fn path_offset(&self) -> usize {
        self.head.path.as_ref().map_or(0, |p| p.offset)
    }

    pub(crate) fn restore_path_offset(&mut self, offset: usize) {
        if let Some(path) = self.head.path.as_mut() {
            if offset <= path.full.len() && path.full.is_char_boundary(offset) {
                path.offset = offset;
            }
        }
    }

    /// Returns the first value of a header, matched case-sensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }

    /// Returns every header in arrival order.
    #[must_use]
    pub fn headers(&self) -> &Dict {
        &self.head.headers
    }

    /// Splits the query string off the path, once.
    ///
    /// Returns false if there is no request line yet. Later calls return
    /// true without doing anything.
    pub fn ensure_query_parsed(&mut self) -> bool {
        if self.query.is_some() {
            return true;
        }
        let Some(path) = self.head.path.as_mut() else {
            return false;
        };

        let (clean, query) = split_query(&path.full, &self.limits);
        *path = RequestPath::new(clean);
        self.query = Some(query);
        true
    }

    /// Returns the query map if it has been parsed.
    #[must_use]
    pub fn query(&self) -> Option<&Dict> {
        self.query.as_ref()
    }

    /// Returns the first value of a query parameter, parsing the query on
    /// first use.
    pub fn query_value(&mut self, key: &str) -> Option<&str> {
        self.ensure_query_parsed();
        self.query.as_ref()?.get(key)
    }

    /// Returns the method, or `None` before the request line is parsed.
    #[must_use]
    pub fn method(&self) -> Option<Method> {
        self.head.flags.method()
    }

    /// Returns the protocol version. HTTP/1.0 until proven otherwise.
    #[must_use]
    pub fn version(&self) -> HttpVersion {
        self.head.flags.version()
    }

    /// Returns the raw method/version flags.
    #[must_use]
    pub fn flags(&self) -> RequestFlags {
        self.head.flags
    }

    /// Returns the connection this request arrived on.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Returns the socket handle passed through to handlers.
    #[must_use]
    pub fn socket(&self) -> SocketHandle {
        self.socket
    }

    /// Returns the limits this request parses with.
    #[must_use]
    pub fn limits(&self) -> &ParseLimits {
        &self.limits
    }

    /// Returns true once the handler has been called.
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        self.head.phase == Phase::Dispatched
    }

    /// Returns true if the request line was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.head.phase == Phase::Rejected
    }

    /// Drops everything parsed so far, so the request can take the next
    /// request on the same connection.
    pub fn clear(&mut self) {
        self.head = Head::new();
        self.query = None;
        self.accumulator.reset();
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("connection", &self.connection)
            .field("socket", &self.socket)
            .field("phase", &self.head.phase)
            .field("flags", &self.head.flags)
            .field("path", &self.path())
            .field("headers", &self.head.headers)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NotFound;
    use parking_lot::Mutex;

    fn request() -> Request {
        request_with(Arc::new(NotFound))
    }

    fn request_with(handler: Arc<dyn Handler>) -> Request {
        Request::new(
            ConnectionId::new(9),
            SocketHandle::new(4),
            handler,
            ParseLimits::default(),
        )
    }

    fn dispatched(status: ParseStatus) -> usize {
        match status {
            ParseStatus::Dispatched { consumed, .. } => consumed,
            ParseStatus::Incomplete => panic!("expected dispatch"),
        }
    }

    #[test]
    fn end_to_end_single_call() {
        let mut req = request();
        let input = b"GET /search?q=rust HTTP/1.1\r\nHost: x\r\n\r\n";
        let consumed = dispatched(req.feed(input).unwrap());

        assert_eq!(consumed, input.len());
        assert!(req.is_dispatched());
        assert_eq!(req.method(), Some(Method::Get));
        assert_eq!(req.version(), HttpVersion::Http11);
        assert_eq!(req.header("Host"), Some("x"));
        assert_eq!(req.headers().len(), 1);

        assert!(req.ensure_query_parsed());
        assert_eq!(req.path(), Some("/search"));
        assert_eq!(req.query().unwrap().get("q"), Some("rust"));
    }

    #[test]
    fn handler_called_once_with_populated_request() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut req = request_with(Arc::new(move |r: &mut Request| {
            sink.lock().push((
                r.method(),
                r.path().map(str::to_string),
                r.header("Accept").map(str::to_string),
            ));
            HandlerOutcome::Processed
        }));

        let status = req
            .feed(b"POST /form HTTP/1.0\r\nAccept: */*\r\n\r\n")
            .unwrap();
        assert!(matches!(
            status,
            ParseStatus::Dispatched {
                outcome: HandlerOutcome::Processed,
                ..
            }
        ));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            (
                Some(Method::Post),
                Some("/form".to_string()),
                Some("*/*".to_string())
            )
        );
    }

    #[test]
    fn no_dispatch_before_blank_line() {
        let mut req = request();
        assert_eq!(
            req.feed(b"GET / HTTP/1.1\r\nHost: x\r\n").unwrap(),
            ParseStatus::Incomplete
        );
        assert!(!req.is_dispatched());
        assert_eq!(req.header("Host"), Some("x"));
    }

    #[test]
    fn byte_at_a_time() {
        let mut req = request();
        let input = b"HEAD /a%20b HTTP/1.1\r\nX-One: 1\r\nX-Two: 2\r\n\r\n";
        for (i, byte) in input.iter().enumerate() {
            let status = req.feed(std::slice::from_ref(byte)).unwrap();
            if i + 1 < input.len() {
                assert_eq!(status, ParseStatus::Incomplete);
            } else {
                assert_eq!(dispatched(status), 1);
            }
        }
        assert_eq!(req.method(), Some(Method::Head));
        assert_eq!(req.header("X-Two"), Some("2"));
        assert!(req.ensure_query_parsed());
        assert_eq!(req.path(), Some("/a b"));
    }

    #[test]
    fn bare_lf_input() {
        let mut req = request();
        dispatched(req.feed(b"GET /lf HTTP/1.1\nA: b\n\n").unwrap());
        assert_eq!(req.path(), Some("/lf"));
        assert_eq!(req.header("A"), Some("b"));
    }

    #[test]
    fn leading_blank_lines_ignored() {
        let mut req = request();
        let input = b"\r\n\r\nGET / HTTP/1.1\r\n\r\n";
        assert_eq!(dispatched(req.feed(input).unwrap()), input.len());
        assert_eq!(req.method(), Some(Method::Get));
    }

    #[test]
    fn missing_header_is_none() {
        let mut req = request();
        req.feed(b"GET / HTTP/1.1\r\nX-Test: value\r\n\r\n").unwrap();
        assert_eq!(req.header("X-Test"), Some("value"));
        assert_eq!(req.header("x-test"), None);
        assert_eq!(req.header("Missing"), None);
    }

    #[test]
    fn duplicate_headers_kept_in_order() {
        let mut req = request();
        req.feed(b"GET / HTTP/1.1\r\nSet: a\r\nSet: b\r\n\r\n").unwrap();
        assert_eq!(req.header("Set"), Some("a"));
        assert_eq!(req.headers().get_all("Set").collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn invalid_method_rejects() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut req = request_with(Arc::new(move |_: &mut Request| {
            *counter.lock() += 1;
            HandlerOutcome::Processed
        }));

        assert_eq!(
            req.feed(b"FOO /x HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidMethod)
        );
        assert!(req.is_rejected());
        assert!(!req.is_dispatched());
        assert_eq!(req.method(), None);
        assert_eq!(req.path(), None);
        assert_eq!(req.feed(b"\r\n"), Err(ParseError::Rejected));
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn missing_url_rejects() {
        let mut req = request();
        assert_eq!(req.feed(b"GET\r\n"), Err(ParseError::InvalidRequestLine));
        assert!(req.is_rejected());
    }

    #[test]
    fn feed_after_dispatch_fails() {
        let mut req = request();
        req.feed(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.feed(b"GET"), Err(ParseError::AlreadyDispatched));
    }

    #[test]
    fn one_dispatch_per_call() {
        let mut req = request();
        let first = b"GET /one HTTP/1.1\r\n\r\n";
        let mut input = first.to_vec();
        input.extend_from_slice(b"GET /two HTTP/1.1\r\n\r\n");

        assert_eq!(dispatched(req.feed(&input).unwrap()), first.len());
        assert_eq!(req.path(), Some("/one"));
    }

    #[test]
    fn overlong_header_line_does_not_corrupt_next() {
        let limits = ParseLimits::new().with_max_line_len(32);
        let mut req = Request::new(
            ConnectionId::new(1),
            SocketHandle::new(0),
            Arc::new(NotFound),
            limits,
        );
        let long = format!("X-Long: {}\r\n", "z".repeat(100));
        req.feed(b"GET / HTTP/1.1\r\n").unwrap();
        req.feed(long.as_bytes()).unwrap();
        req.feed(b"X-Next: ok\r\n\r\n").unwrap();

        let value = req.header("X-Long").unwrap();
        assert_eq!(value.len(), 32 - "X-Long: ".len());
        assert_eq!(req.header("X-Next"), Some("ok"));
    }

    #[test]
    fn advance_path_compounds() {
        let mut req = request();
        req.feed(b"GET /api/v1/items HTTP/1.1\r\n").unwrap();

        req.advance_path(4).unwrap();
        assert_eq!(req.path(), Some("/v1/items"));
        req.advance_path(3).unwrap();
        assert_eq!(req.path(), Some("/items"));
        assert_eq!(req.full_path(), Some("/api/v1/items"));
    }

    #[test]
    fn advance_path_checked() {
        let mut req = request();
        assert_eq!(req.advance_path(1), Err(PathError::NoPath));

        req.feed("GET /é HTTP/1.1\r\n".as_bytes()).unwrap();
        assert_eq!(
            req.advance_path(10),
            Err(PathError::OutOfBounds {
                offset: 10,
                remaining: 3
            })
        );
        assert_eq!(
            req.advance_path(2),
            Err(PathError::NotCharBoundary { offset: 2 })
        );
        assert_eq!(req.path(), Some("/é"));

        req.advance_path(3).unwrap();
        assert_eq!(req.path(), Some(""));
    }

    #[test]
    fn query_parsed_once_and_resets_offset() {
        let mut req = request();
        req.feed(b"GET /api/x?a=1&a=2 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.query(), None);

        req.advance_path(4).unwrap();
        assert!(req.ensure_query_parsed());
        assert_eq!(req.path(), Some("/api/x"));
        assert_eq!(req.full_path(), Some("/api/x"));
        assert_eq!(
            req.query().unwrap().get_all("a").collect::<Vec<_>>(),
            vec!["1", "2"]
        );

        req.advance_path(4).unwrap();
        assert!(req.ensure_query_parsed());
        assert_eq!(req.path(), Some("/x"));
    }

    #[test]
    fn no_query_string_gives_empty_map() {
        let mut req = request();
        req.feed(b"GET /plain HTTP/1.1\r\n").unwrap();
        assert!(req.ensure_query_parsed());
        assert!(req.query().unwrap().is_empty());
        assert_eq!(req.query_value("a"), None);
    }

    #[test]
    fn query_before_request_line() {
        let mut req = request();
        assert!(!req.ensure_query_parsed());
        assert_eq!(req.query(), None);
        assert_eq!(req.query_value("a"), None);
    }

    #[test]
    fn clear_returns_to_fresh_state() {
        let mut req = request();
        req.feed(b"GET /x?y=1 HTTP/1.1\r\nA: b\r\n\r\n").unwrap();
        req.ensure_query_parsed();
        req.clear();

        assert!(!req.is_dispatched());
        assert_eq!(req.method(), None);
        assert_eq!(req.path(), None);
        assert!(req.headers().is_empty());
        assert_eq!(req.query(), None);
        assert_eq!(req.connection(), ConnectionId::new(9));
        assert_eq!(req.socket(), SocketHandle::new(4));

        dispatched(req.feed(b"POST /z HTTP/1.1\r\n\r\n").unwrap());
        assert_eq!(req.method(), Some(Method::Post));
    }

    #[test]
    fn flags_reflect_request_line() {
        let mut req = request();
        assert_eq!(req.flags(), RequestFlags::empty());
        req.feed(b"POST / HTTP/1.1\r\n").unwrap();
        assert_eq!(req.flags().bits(), RequestFlags::POST | RequestFlags::HTTP11);
    }

    #[test]
    fn path_error_display() {
        assert_eq!(
            PathError::OutOfBounds {
                offset: 5,
                remaining: 2
            }
            .to_string(),
            "path offset 5 out of bounds (2 bytes remaining)"
        );
    }
}
