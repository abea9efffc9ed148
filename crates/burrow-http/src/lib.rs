//! Incremental HTTP/1.x request parser and dispatcher.
//!
//! Bytes from a connection arrive in chunks of any size. They are
//! collected into lines by a bounded [`LineAccumulator`]; the first line is
//! parsed as the [`RequestLine`], the following ones as [`HeaderLine`]s, and
//! the blank line ending the header section dispatches the [`Request`] to
//! its [`Handler`]. The query string is split off the path only when a
//! handler asks for it.
//!
//! # Features
//!
//! - Chunk-boundary independent parsing: the same request is produced
//!   however the input is split
//! - Bounded buffers; oversized tokens and lines are truncated, never
//!   rejected
//! - In-place percent-decoding of paths and query parameters
//! - One dispatch per [`Request::feed`] call, with the unconsumed remainder
//!   reported so a [`Connection`] can pipeline requests
//!
//! # Example
//!
//! ```
//! use burrow_http::{Connection, HandlerOutcome, Request, Server, SocketHandle};
//!
//! let server = Server::new(|req: &mut Request| {
//!     if req.query_value("name") == Some("burrow") {
//!         HandlerOutcome::Processed
//!     } else {
//!         HandlerOutcome::NotProcessed
//!     }
//! });
//!
//! let mut conn = Connection::new(&server, SocketHandle::new(3));
//! let n = conn.receive(b"GET /hello?name=burrow HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
//! assert_eq!(n, 1);
//! # Ok::<(), burrow_http::ParseError>(())
//! ```

#![deny(unsafe_code)]

mod accumulator;
mod connection;
mod decode;
mod handler;
mod parser;
mod query;
mod request;
mod server;

pub use accumulator::{AccumulatorStatus, Flow, Line, LineAccumulator};
pub use connection::Connection;
pub use decode::{decode_in_place, percent_decode};
pub use handler::{Handler, HandlerChain, HandlerOutcome, NotFound, PathPrefix};
pub use parser::{HeaderLine, ParseError, RequestLine};
pub use query::split_query;
pub use request::{ParseStatus, PathError, Request};
pub use server::{ConnectionId, Server, SocketHandle};
