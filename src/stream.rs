//! Streaming chunk outcomes and wire framing decoders
//!
//! Two framings exist in the wild: Server-Sent Events (`data: ` prefixed
//! payloads separated by blank lines, terminated by a `[DONE]` sentinel for
//! the OpenAI family) and newline-delimited JSON objects (no prefix, an
//! explicit `done`/`finishReason` field instead of a sentinel). The decoders
//! here split arbitrary network reads into framing units without losing or
//! duplicating objects; translators then parse one unit at a time.
//!
//! Every `parse_stream_response` call resolves to exactly one of three
//! disjoint outcomes per chunk:
//!
//! 1. [`StreamEvent::Content`] - incremental text and/or a tool-call
//!    fragment.
//! 2. [`StreamEvent::Skip`] - nothing user-visible (role-only delta,
//!    keep-alive, malformed line that must not abort the stream). Callers
//!    keep reading.
//! 3. [`StreamEvent::Done`] - the vendor's explicit termination marker,
//!    optionally carrying final aggregate usage. Some vendors (Gemini)
//!    place the last content fragment in the same frame as the marker, so
//!    the terminal event can also carry a final partial response.
//!
//! Conflating skip with done causes premature termination or infinite
//! "nothing happened" loops, so the two are separate variants rather than
//! error values.

use crate::response::{Response, Usage};

/// Outcome of parsing one streaming chunk
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A partial response carrying incremental content
    Content(Response),
    /// This chunk carries nothing user-visible; continue reading
    Skip,
    /// The stream is complete; no further chunks will follow
    Done {
        /// Final aggregate usage, when the terminal chunk reported it
        usage: Option<Usage>,
        /// Content delivered on the terminal chunk itself, for vendors
        /// that bundle the last fragment with the termination marker
        content: Option<Response>,
    },
}

impl StreamEvent {
    /// Terminal event without usage or trailing content
    pub fn done() -> Self {
        StreamEvent::Done {
            usage: None,
            content: None,
        }
    }

    /// Terminal event carrying final usage
    pub fn done_with_usage(usage: Option<Usage>) -> Self {
        StreamEvent::Done {
            usage,
            content: None,
        }
    }

    /// Whether this event ends the stream
    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done { .. })
    }
}

/// Incremental Server-Sent-Events decoder.
///
/// Feed it network reads as they arrive; it yields the payload of each
/// complete `data:` line. Event-name lines, comments and keep-alive blank
/// lines are consumed silently. Safe to drop at any point between chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network read and collect every complete `data:` payload it
    /// completes, in arrival order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // event:/id:/retry: lines and comments select no payload
        }
        payloads
    }
}

/// Incremental newline-delimited-JSON decoder.
///
/// Ollama's native API streams one JSON object per line with no framing
/// prefix. A single network read may carry several objects or a fraction of
/// one; buffering on line boundaries keeps each object intact.
#[derive(Debug, Default)]
pub struct JsonLinesDecoder {
    buffer: String,
}

impl JsonLinesDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network read and collect every complete line it completes,
    /// in arrival order. Blank lines are dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// The OpenAI-family SSE termination sentinel
pub(crate) const SSE_DONE_SENTINEL: &str = "[DONE]";

/// Whether an SSE payload is the `[DONE]` sentinel
pub(crate) fn is_done_sentinel(payload: &str) -> bool {
    payload.trim() == SSE_DONE_SENTINEL
}
