//! Unit Tests for Anthropic Response and Stream Parsing
//!
//! UNIT UNDER TEST: AnthropicTranslator::parse_response / parse_stream_response
//!
//! BUSINESS RESPONSIBILITY:
//!   - Fold content blocks into unified text + tool calls
//!   - Unwrap the forced structured_response tool back into text
//!   - Reconcile cache-aware usage into the unified Usage shape
//!   - Classify SSE events as content, skip, or terminal
//!
//! TEST COVERAGE:
//!   - text response with usage
//!   - tool_use block -> ToolCall, tool-calls-only rendering
//!   - structured_response unwrapping
//!   - vendor error body -> ApiError
//!   - stream: text deltas, skip frames, message_delta terminal with usage

use super::super::AnthropicTranslator;
use crate::capability::CapabilityRegistry;
use crate::error::LlmError;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::stream::StreamEvent;
use crate::translator::Translator;
use std::sync::Arc;

fn translator() -> AnthropicTranslator {
    let capabilities = Arc::new(CapabilityRegistry::with_defaults());
    AnthropicTranslator::new(
        ProviderParams::new(Some("test-key"), "claude-sonnet-4-20250514"),
        &ProviderConfig::default(),
        &capabilities,
    )
    .unwrap()
}

#[test]
fn text_response_with_cache_usage() {
    let body = br#"{
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Paris"}],
        "usage": {
            "input_tokens": 10,
            "output_tokens": 3,
            "cache_read_input_tokens": 90,
            "cache_creation_input_tokens": 5
        }
    }"#;
    let response = translator().parse_response(body).unwrap();
    assert_eq!(response.as_text(), "Paris");

    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 105);
    assert_eq!(usage.cached_input_tokens, 90);
    assert_eq!(usage.total(), 18);
}

#[test]
fn text_block_with_cache_control_parses() {
    // Inbound blocks can echo the cache_control marker with a ttl.
    let body = br#"{
        "type": "message",
        "content": [{
            "type": "text",
            "text": "cached answer",
            "cache_control": {"type": "ephemeral", "ttl": "1h"}
        }],
        "usage": {"input_tokens": 4, "output_tokens": 2}
    }"#;
    let response = translator().parse_response(body).unwrap();
    assert_eq!(response.as_text(), "cached answer");
}

#[test]
fn tool_use_only_response_renders_calls() {
    let body = br#"{
        "type": "message",
        "content": [{
            "type": "tool_use",
            "id": "toolu_1",
            "name": "get_weather",
            "input": {"city": "Oslo"}
        }]
    }"#;
    let response = translator().parse_response(body).unwrap();
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].function.name, "get_weather");
    assert_eq!(
        response.as_text(),
        r#"Tool call: get_weather with args: {"city":"Oslo"}"#
    );
}

#[test]
fn structured_response_tool_unwraps_to_text() {
    let body = br#"{
        "type": "message",
        "content": [{
            "type": "tool_use",
            "id": "toolu_1",
            "name": "structured_response",
            "input": {"city": "Paris"}
        }]
    }"#;
    let response = translator().parse_response(body).unwrap();
    assert!(response.tool_calls.is_empty());
    assert_eq!(response.as_text(), r#"{"city":"Paris"}"#);
}

#[test]
fn vendor_error_is_api_error() {
    let body = br#"{"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
    let err = translator().parse_response(body).unwrap_err();
    assert!(matches!(err, LlmError::ApiError { provider: "anthropic", .. }));
    assert!(err.is_retryable());
}

#[test]
fn garbage_body_is_a_parse_error() {
    let err = translator().parse_response(b"<html>502</html>").unwrap_err();
    assert!(matches!(err, LlmError::ResponseParsingError { .. }));
}

#[test]
fn stream_text_delta_is_content() {
    let chunk = br#"{"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Par"}}"#;
    match translator().parse_stream_response(chunk).unwrap() {
        StreamEvent::Content(response) => assert_eq!(response.as_text(), "Par"),
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn stream_bookkeeping_frames_are_skipped() {
    let translator = translator();
    for frame in [
        br#"{"type": "message_start", "message": {"usage": {"input_tokens": 10}}}"# as &[u8],
        br#"{"type": "ping"}"#,
        br#"{"type": "content_block_stop", "index": 0}"#,
    ] {
        assert!(matches!(
            translator.parse_stream_response(frame).unwrap(),
            StreamEvent::Skip
        ));
    }
}

#[test]
fn stream_message_delta_terminates_with_usage() {
    let chunk = br#"{"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 42}}"#;
    match translator().parse_stream_response(chunk).unwrap() {
        StreamEvent::Done { usage, .. } => {
            assert_eq!(usage.unwrap().output_tokens, 42);
        }
        other => panic!("expected terminal, got {other:?}"),
    }
}

#[test]
fn stream_tool_use_start_carries_id_and_name() {
    let chunk = br#"{"type": "content_block_start", "index": 1, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "lookup", "input": {}}}"#;
    match translator().parse_stream_response(chunk).unwrap() {
        StreamEvent::Content(response) => {
            assert_eq!(response.tool_calls[0].id, "toolu_1");
            assert_eq!(response.tool_calls[0].function.name, "lookup");
        }
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn stream_error_event_aborts() {
    let chunk = br#"{"type": "error", "error": {"type": "api_error", "message": "boom"}}"#;
    assert!(translator().parse_stream_response(chunk).is_err());
}
