//! Unit Tests for Stream Framing Decoders
//!
//! UNIT UNDER TEST: stream.rs
//!
//! BUSINESS RESPONSIBILITY:
//!   - Split arbitrary network reads into SSE payloads / NDJSON lines
//!     without losing, duplicating, or splitting a framing unit
//!   - Classify a chunk outcome as exactly one of content, skip, or done
//!
//! TEST COVERAGE:
//!   - payloads split across reads, multiple payloads per read
//!   - CRLF tolerance, event-name and comment lines, keep-alive blanks
//!   - NDJSON line reassembly
//!   - StreamEvent terminal helpers

use crate::response::{Response, Usage};
use crate::stream::{JsonLinesDecoder, SseDecoder, StreamEvent};

#[test]
fn sse_payload_split_across_reads() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"data: {\"par").is_empty());
    assert!(decoder.feed(b"tial\":true").is_empty());
    let payloads = decoder.feed(b"}\n\n");
    assert_eq!(payloads, vec![r#"{"partial":true}"#]);
}

#[test]
fn sse_multiple_payloads_in_one_read() {
    let mut decoder = SseDecoder::new();
    let payloads = decoder.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n");
    assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#, "[DONE]"]);
}

#[test]
fn sse_tolerates_crlf_line_endings() {
    let mut decoder = SseDecoder::new();
    let payloads = decoder.feed(b"data: {\"a\":1}\r\n\r\ndata: {\"b\":2}\r\n");
    assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
}

#[test]
fn sse_skips_event_and_comment_lines() {
    let mut decoder = SseDecoder::new();
    let payloads = decoder.feed(b"event: message_start\n: keep-alive\ndata: {\"a\":1}\n\n");
    assert_eq!(payloads, vec![r#"{"a":1}"#]);
}

#[test]
fn sse_payload_without_space_after_colon() {
    let mut decoder = SseDecoder::new();
    let payloads = decoder.feed(b"data:{\"a\":1}\n");
    assert_eq!(payloads, vec![r#"{"a":1}"#]);
}

#[test]
fn json_lines_reassembles_partial_objects() {
    let mut decoder = JsonLinesDecoder::new();
    assert!(decoder.feed(b"{\"done\":fal").is_empty());
    let lines = decoder.feed(b"se}\n{\"done\":true}\n");
    assert_eq!(lines, vec![r#"{"done":false}"#, r#"{"done":true}"#]);
}

#[test]
fn json_lines_drops_blank_lines() {
    let mut decoder = JsonLinesDecoder::new();
    let lines = decoder.feed(b"\n\n{\"a\":1}\n\n");
    assert_eq!(lines, vec![r#"{"a":1}"#]);
}

#[test]
fn stream_event_terminal_classification() {
    assert!(StreamEvent::done().is_done());
    let usage = Usage { input_tokens: 1, output_tokens: 2, ..Usage::default() };
    assert!(StreamEvent::done_with_usage(Some(usage)).is_done());
    assert!(!StreamEvent::Skip.is_done());
    assert!(!StreamEvent::Content(Response::text("hi")).is_done());
}
