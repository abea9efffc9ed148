//! Incremental HTTP/1.x request parsing and dispatch.
//!
//! burrow reads HTTP/1.x request heads from arbitrarily chunked input with
//! bounded buffers, and hands each completed request to a handler exactly
//! once.
//!
//! # Quick Start
//!
//! ```
//! use burrow::prelude::*;
//!
//! let app = HandlerChain::new()
//!     .with(PathPrefix::new("/api", |req: &mut Request| {
//!         match req.method() {
//!             Some(Method::Get) => HandlerOutcome::Processed,
//!             _ => HandlerOutcome::NotProcessed,
//!         }
//!     }))
//!     .with(NotFound);
//!
//! let server = Server::new(app).with_limits(ParseLimits::new().with_max_line_len(2048));
//! let mut conn = Connection::new(&server, SocketHandle::new(4));
//!
//! assert_eq!(conn.receive(b"GET /api/items HTTP/1.1\r\nHost: h\r\n\r\n").unwrap(), 1);
//! ```
//!
//! # Crate Structure
//!
//! - [`burrow_core`]: methods, flags, `Dict`, `ParseLimits`, logging
//! - [`burrow_http`]: decoding, line parsing, `Request`, handlers, `Server`

#![forbid(unsafe_code)]

// Re-export crates
pub use burrow_core as core;
pub use burrow_http as http;

// Re-export commonly used types
pub use burrow_core::logging::{self, LogConfig, LogLevel};
pub use burrow_core::{Dict, HttpVersion, Method, ParseLimits, RequestFlags};
pub use burrow_http::{
    Connection, ConnectionId, Handler, HandlerChain, HandlerOutcome, NotFound, ParseError,
    ParseStatus, PathError, PathPrefix, Request, Server, SocketHandle,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Connection, ConnectionId, Dict, Handler, HandlerChain, HandlerOutcome, HttpVersion,
        Method, NotFound, ParseError, ParseLimits, ParseStatus, PathPrefix, Request, Server,
        SocketHandle,
    };
}
