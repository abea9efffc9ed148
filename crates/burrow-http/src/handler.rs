//! Request handlers.
//!
//! A [`Handler`] is called exactly once per request, synchronously, as soon
//! as the blank line ending the header section has been read. Method, path
//! and headers are populated at that point; the query map is parsed on
//! demand by the handler.

use std::fmt;
use std::sync::Arc;

use crate::request::Request;

/// Result of handling a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler took care of the request.
    Processed,
    /// The handler did not recognize the request.
    NotProcessed,
}

impl HandlerOutcome {
    /// Returns true if the request was handled.
    #[must_use]
    pub const fn is_processed(self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns the outcome as a lowercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::NotProcessed => "not_processed",
        }
    }
}

impl fmt::Display for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can handle a dispatched request.
///
/// Implemented for any `Fn(&mut Request) -> HandlerOutcome` closure.
///
/// # Example
///
/// ```
/// use burrow_http::{HandlerOutcome, Request};
///
/// let handler = |req: &mut Request| {
///     if req.path() == Some("/health") {
///         HandlerOutcome::Processed
///     } else {
///         HandlerOutcome::NotProcessed
///     }
/// };
/// # let _ = handler;
/// ```
pub trait Handler: Send + Sync {
    /// Handles the request.
    fn handle(&self, request: &mut Request) -> HandlerOutcome;
}

impl<F> Handler for F
where
    F: Fn(&mut Request) -> HandlerOutcome + Send + Sync,
{
    fn handle(&self, request: &mut Request) -> HandlerOutcome {
        self(request)
    }
}

// ============================================================================
// Stock handlers
// ============================================================================

/// Fallback that never handles anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

impl Handler for NotFound {
    fn handle(&self, _request: &mut Request) -> HandlerOutcome {
        HandlerOutcome::NotProcessed
    }
}

/// Delegates requests whose path starts with a prefix.
///
/// On a match the request path is advanced past the prefix before the inner
/// handler runs, so nested prefixes compose. If the inner handler declines,
/// the path is put back as it was.
///
/// ```
/// use burrow_http::{HandlerOutcome, PathPrefix, Request};
///
/// let api = PathPrefix::new("/api", |req: &mut Request| {
///     assert_eq!(req.path(), Some("/users"));
///     HandlerOutcome::Processed
/// });
/// # let _ = api;
/// ```
pub struct PathPrefix {
    prefix: String,
    inner: Arc<dyn Handler>,
}

impl PathPrefix {
    /// Creates a prefix handler.
    pub fn new(prefix: impl Into<String>, inner: impl Handler + 'static) -> Self {
        Self {
            prefix: prefix.into(),
            inner: Arc::new(inner),
        }
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Debug for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPrefix")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Handler for PathPrefix {
    fn handle(&self, request: &mut Request) -> HandlerOutcome {
        if !request.path().is_some_and(|p| p.starts_with(&self.prefix)) {
            return HandlerOutcome::NotProcessed;
        }

        let saved = request.path_offset();
        let query_parsed = request.query().is_some();
        if request.advance_path(self.prefix.len()).is_err() {
            return HandlerOutcome::NotProcessed;
        }

        let outcome = self.inner.handle(request);
        // Parsing the query replaces the path with its decoded form from
        // offset zero; `saved` indexes the old string and is dropped.
        if outcome == HandlerOutcome::NotProcessed && request.query().is_some() == query_parsed {
            request.restore_path_offset(saved);
        }
        outcome
    }
}

/// Tries handlers in order until one processes the request.
#[derive(Default, Clone)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    #[must_use]
    pub fn with(mut self, handler: impl Handler + 'static) -> Self {
        self.push(handler);
        self
    }

    /// Appends a handler.
    pub fn push(&mut self, handler: impl Handler + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    /// Returns the number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if the chain has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Handler for HandlerChain {
    fn handle(&self, request: &mut Request) -> HandlerOutcome {
        for handler in &self.handlers {
            if handler.handle(request).is_processed() {
                return HandlerOutcome::Processed;
            }
        }
        HandlerOutcome::NotProcessed
    }
}
