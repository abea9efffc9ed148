//! Core types for burrow.
//!
//! This crate provides the building blocks shared by the parser and the
//! server layer:
//! - [`Method`], [`HttpVersion`] and the [`RequestFlags`] bitset
//! - [`Dict`], the ordered key/value store behind headers and query params
//! - [`ParseLimits`], the bounds applied to every parsed token
//! - Structured [`logging`]
//!
//! # Design Principles
//!
//! - Every buffer the parser writes to is bounded by a [`ParseLimits`] value
//! - Extracted data is always owned; nothing borrows the caller's input
//! - All types support `Send + Sync`

#![forbid(unsafe_code)]

mod dict;
mod limits;
pub mod logging;
#[cfg(feature = "proptest")]
pub mod proptest;
mod request;

pub use dict::Dict;
pub use limits::ParseLimits;
pub use logging::{LogConfig, LogEntry, LogLevel, LogSink};
pub use request::{HttpVersion, Method, RequestFlags};
