//! Per-connection driver.
//!
//! A [`Connection`] turns a stream of reads into a sequence of requests.
//! [`Request::feed`] stops at the end of each header section, so the
//! connection re-feeds whatever follows into a cleared request until the
//! input runs out. Keep-alive and pipelined requests are handled one at a
//! time, in order.

use burrow_core::logging::{LogLevel, level_enabled};
use burrow_core::log_debug;

use crate::parser::ParseError;
use crate::request::{ParseStatus, Request};
use crate::server::{ConnectionId, Server, SocketHandle};

/// Drives the requests of one connection.
///
/// ```
/// use burrow_http::{Connection, NotFound, Server, SocketHandle};
///
/// let server = Server::new(NotFound);
/// let mut conn = Connection::new(&server, SocketHandle::new(7));
///
/// let pipelined = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\nGET /c";
/// assert_eq!(conn.receive(pipelined).unwrap(), 2);
/// assert_eq!(conn.receive(b" HTTP/1.1\r\n\r\n").unwrap(), 1);
/// assert_eq!(conn.requests_dispatched(), 3);
/// ```
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    request: Request,
    dispatched: u64,
}

impl Connection {
    /// Opens a connection on `server` with a fresh id.
    #[must_use]
    pub fn new(server: &Server, socket: SocketHandle) -> Self {
        let id = server.next_connection_id();
        Self {
            id,
            request: server.request_for(id, socket),
            dispatched: 0,
        }
    }

    /// Returns the connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the socket handle.
    #[must_use]
    pub fn socket(&self) -> SocketHandle {
        self.request.socket()
    }

    /// Returns the request currently being read.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns how many requests have been dispatched so far.
    #[must_use]
    pub fn requests_dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Feeds one read worth of bytes.
    ///
    /// Returns the number of requests dispatched by this call. A request
    /// cut off at the end of `bytes` stays buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns the `ParseError` of a rejected request line. The connection
    /// is unusable afterwards; later calls return `ParseError::Rejected`.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<usize, ParseError> {
        let mut rest = bytes;
        let mut count = 0;

        while !rest.is_empty() {
            match self.request.feed(rest)? {
                ParseStatus::Incomplete => break,
                ParseStatus::Dispatched { consumed, outcome } => {
                    count += 1;
                    self.dispatched += 1;
                    if level_enabled(LogLevel::Debug) {
                        log_debug!(
                            "request complete",
                            outcome => outcome,
                            remaining => rest.len() - consumed,
                        )
                        .connection(self.id.get())
                        .emit();
                    }
                    self.request.clear();
                    rest = &rest[consumed..];
                }
            }
        }

        if self.request.is_rejected() {
            return Err(ParseError::Rejected);
        }
        Ok(count)
    }
}
