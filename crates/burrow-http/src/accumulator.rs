//! Line accumulation for the header section.
//!
//! Raw bytes are collected into logical lines in a buffer of fixed
//! capacity. `\r` is dropped wherever it appears and `\n` ends a line, so
//! CRLF and bare LF input produce the same lines.
//!
//! A line longer than the capacity is cut at the capacity; the excess is
//! dropped and parsing picks up again at the next `\n`. The first cut in a
//! request logs one warning, later ones are silent. This bounds the memory
//! a client can pin with a single endless header line.

use burrow_core::log_warn;
use memchr::memchr2;

/// A complete logical line handed to the line callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// A non-empty line, without CR or LF.
    Text(&'a [u8]),
    /// An empty line.
    Blank,
}

/// What the callback wants after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep consuming input.
    Continue,
    /// The header section is over; stop consuming input.
    EndOfHeaders,
}

/// Result of feeding bytes to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorStatus {
    /// Every byte was consumed without reaching the end of the headers.
    NeedMore,
    /// The callback ended the header section. `consumed` counts the bytes
    /// used, up to and including the `\n` of the terminating line; bytes
    /// after it were not looked at.
    EndOfHeaders {
        /// Bytes consumed from the input.
        consumed: usize,
    },
}

/// Bounded line buffer.
#[derive(Debug)]
pub struct LineAccumulator {
    buffer: Vec<u8>,
    capacity: usize,
    connection_id: Option<u64>,
    overflow_reported: bool,
    dropped: usize,
}

impl LineAccumulator {
    /// Creates an accumulator holding lines of at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::new(),
            capacity,
            connection_id: None,
            overflow_reported: false,
            dropped: 0,
        }
    }

    /// Tags overflow diagnostics with a connection id.
    #[must_use]
    pub fn for_connection(mut self, id: u64) -> Self {
        self.connection_id = Some(id);
        self
    }

    /// Returns the line capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes buffered for the current line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no partial line is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the number of bytes dropped because lines were too long.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Returns true once an overflow has been reported.
    #[must_use]
    pub fn overflow_reported(&self) -> bool {
        self.overflow_reported
    }

    /// Discards the partial line and overflow state.
    pub fn reset(&mut self) {
        self.buffer = Vec::new();
        self.overflow_reported = false;
        self.dropped = 0;
    }

    /// Feeds bytes, calling `on_line` for every completed line.
    ///
    /// Stops right after the line for which `on_line` returns
    /// [`Flow::EndOfHeaders`]. If `on_line` fails, the failing line is
    /// discarded and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns whatever error `on_line` returns.
    pub fn feed<F, E>(&mut self, bytes: &[u8], mut on_line: F) -> Result<AccumulatorStatus, E>
    where
        F: FnMut(Line<'_>) -> Result<Flow, E>,
    {
        let mut pos = 0;

        while let Some(offset) = memchr2(b'\r', b'\n', &bytes[pos..]) {
            let at = pos + offset;
            self.append(&bytes[pos..at]);
            pos = at + 1;

            if bytes[at] == b'\r' {
                continue;
            }

            let flow = if self.buffer.is_empty() {
                on_line(Line::Blank)
            } else {
                let flow = on_line(Line::Text(&self.buffer));
                self.buffer.clear();
                flow
            };

            if flow? == Flow::EndOfHeaders {
                return Ok(AccumulatorStatus::EndOfHeaders { consumed: pos });
            }
        }

        self.append(&bytes[pos..]);
        Ok(AccumulatorStatus::NeedMore)
    }

    fn append(&mut self, bytes: &[u8]) {
        let room = self.capacity.saturating_sub(self.buffer.len());
        let take = bytes.len().min(room);
        self.buffer.extend_from_slice(&bytes[..take]);

        if take < bytes.len() {
            self.dropped += bytes.len() - take;
            self.report_overflow();
        }
    }

    fn report_overflow(&mut self) {
        if self.overflow_reported {
            return;
        }
        self.overflow_reported = true;

        let prefix = &self.buffer[..self.buffer.len().min(16)];
        let mut entry = log_warn!(
            "header line too long",
            limit => self.capacity,
            prefix => String::from_utf8_lossy(prefix),
        );
        if let Some(id) = self.connection_id {
            entry = entry.connection(id);
        }
        entry.emit();
    }
}
