//! Server context.
//!
//! The [`Server`] owns the root handler and the parse limits, and hands out
//! connection ids. It does no I/O: accepting sockets and reading from them
//! is up to the embedding program, which feeds what it reads to a
//! [`Connection`](crate::Connection).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use burrow_core::ParseLimits;

use crate::handler::Handler;
use crate::request::Request;

/// Identifies the connection a request arrived on.
///
/// A plain number; it owns nothing and keeps nothing alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opaque handle to the socket a request arrived on.
///
/// Passed through to handlers untouched; the parser never reads from or
/// writes to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(u64);

impl SocketHandle {
    /// Wraps a raw handle, such as a file descriptor.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Shared server state.
///
/// ```
/// use burrow_core::ParseLimits;
/// use burrow_http::{HandlerOutcome, Request, Server, SocketHandle};
///
/// let server = Server::new(|_: &mut Request| HandlerOutcome::Processed)
///     .with_limits(ParseLimits::new().with_max_line_len(4096));
///
/// let req = server.new_request(SocketHandle::new(5));
/// assert_eq!(req.limits().max_line_len, 4096);
/// ```
pub struct Server {
    root: Arc<dyn Handler>,
    limits: ParseLimits,
    next_connection: AtomicU64,
}

impl Server {
    /// Creates a server around a root handler, with default limits.
    pub fn new(root: impl Handler + 'static) -> Self {
        Self {
            root: Arc::new(root),
            limits: ParseLimits::default(),
            next_connection: AtomicU64::new(1),
        }
    }

    /// Sets the parse limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the parse limits.
    #[must_use]
    pub fn limits(&self) -> &ParseLimits {
        &self.limits
    }

    /// Returns the root handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.root
    }

    /// Allocates a fresh connection id. Ids start at 1 and only grow.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a request on a new connection id.
    #[must_use]
    pub fn new_request(&self, socket: SocketHandle) -> Request {
        self.request_for(self.next_connection_id(), socket)
    }

    /// Creates a request on an existing connection.
    #[must_use]
    pub fn request_for(&self, connection: ConnectionId, socket: SocketHandle) -> Request {
        Request::new(
            connection,
            socket,
            Arc::clone(&self.root),
            self.limits.clone(),
        )
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("limits", &self.limits)
            .field("next_connection", &self.next_connection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerOutcome, NotFound};
    use crate::request::ParseStatus;

    #[test]
    fn connection_ids_increase() {
        let server = Server::new(NotFound);
        let a = server.next_connection_id();
        let b = server.next_connection_id();
        assert_eq!(a.get(), 1);
        assert!(b > a);
    }

    #[test]
    fn new_request_uses_root_handler() {
        let server = Server::new(|req: &mut Request| {
            if req.path() == Some("/") {
                HandlerOutcome::Processed
            } else {
                HandlerOutcome::NotProcessed
            }
        });

        let mut req = server.new_request(SocketHandle::new(11));
        assert_eq!(req.socket().raw(), 11);
        let status = req.feed(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(matches!(
            status,
            ParseStatus::Dispatched {
                outcome: HandlerOutcome::Processed,
                ..
            }
        ));
    }

    #[test]
    fn each_new_request_gets_its_own_connection() {
        let server = Server::new(NotFound);
        let a = server.new_request(SocketHandle::new(1));
        let b = server.new_request(SocketHandle::new(2));
        assert_ne!(a.connection(), b.connection());

        let c = server.request_for(a.connection(), SocketHandle::new(1));
        assert_eq!(c.connection(), a.connection());
    }

    #[test]
    fn limits_propagate() {
        let limits = ParseLimits::new().with_max_url_len(8);
        let server = Server::new(NotFound).with_limits(limits.clone());
        assert_eq!(server.limits(), &limits);
        assert_eq!(server.new_request(SocketHandle::new(0)).limits(), &limits);
    }

    #[test]
    fn connection_id_display() {
        assert_eq!(ConnectionId::new(42).to_string(), "conn-42");
    }
}
