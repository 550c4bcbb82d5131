//! Unit Tests for Request Option Layering
//!
//! UNIT UNDER TEST: options.rs
//!
//! BUSINESS RESPONSIBILITY:
//!   - Fold call-time options over persisted defaults so a caller can
//!     override any single parameter without losing the rest
//!   - Merge vendor passthrough extras key-wise, call-time winning
//!
//! TEST COVERAGE:
//!   - typed-field precedence and fallthrough
//!   - extras merge semantics
//!   - tool list replacement (never a union)

use crate::options::{RequestOptions, ToolChoice, ToolDefinition};
use serde_json::json;

fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather".to_string(),
        description: "Current weather for a city".to_string(),
        parameters: json!({ "type": "object", "properties": { "city": { "type": "string" } } }),
    }
}

#[test]
fn call_time_values_win() {
    let defaults = RequestOptions::default()
        .with_temperature(0.2)
        .with_max_tokens(100);
    let call = RequestOptions::default().with_temperature(0.9);

    let layered = RequestOptions::layered(&call, &defaults);
    assert_eq!(layered.temperature, Some(0.9));
    assert_eq!(layered.max_tokens, Some(100));
}

#[test]
fn unset_fields_fall_through_to_defaults() {
    let mut defaults = RequestOptions::default().with_top_p(0.8);
    defaults.seed = Some(7);
    defaults.stop = Some(vec!["END".to_string()]);

    let layered = RequestOptions::layered(&RequestOptions::default(), &defaults);
    assert_eq!(layered.top_p, Some(0.8));
    assert_eq!(layered.seed, Some(7));
    assert_eq!(layered.stop, Some(vec!["END".to_string()]));
    assert_eq!(layered.temperature, None);
}

#[test]
fn extras_merge_with_call_winning() {
    let defaults = RequestOptions::default()
        .with_extra("logprobs", json!(true))
        .with_extra("user", json!("default-user"));
    let call = RequestOptions::default().with_extra("user", json!("call-user"));

    let layered = RequestOptions::layered(&call, &defaults);
    assert_eq!(layered.extra["logprobs"], json!(true));
    assert_eq!(layered.extra["user"], json!("call-user"));
}

#[test]
fn call_tools_replace_defaults_entirely() {
    let defaults = RequestOptions::default().with_tools(vec![weather_tool()]);
    let other = ToolDefinition {
        name: "get_time".to_string(),
        description: "Current time".to_string(),
        parameters: json!({ "type": "object" }),
    };
    let call = RequestOptions::default().with_tools(vec![other]);

    let layered = RequestOptions::layered(&call, &defaults);
    assert_eq!(layered.tools.len(), 1);
    assert_eq!(layered.tools[0].name, "get_time");
}

#[test]
fn default_tools_survive_an_empty_call() {
    let defaults = RequestOptions::default().with_tools(vec![weather_tool()]);
    let layered = RequestOptions::layered(&RequestOptions::default(), &defaults);
    assert_eq!(layered.tools.len(), 1);
    assert_eq!(layered.tools[0].name, "get_weather");
}

#[test]
fn tool_choice_falls_through() {
    let mut defaults = RequestOptions::default();
    defaults.tool_choice = Some(ToolChoice::Required);
    let layered = RequestOptions::layered(&RequestOptions::default(), &defaults);
    assert_eq!(layered.tool_choice, Some(ToolChoice::Required));

    let mut call = RequestOptions::default();
    call.tool_choice = Some(ToolChoice::Specific("get_weather".to_string()));
    let layered = RequestOptions::layered(&call, &defaults);
    assert_eq!(layered.tool_choice, Some(ToolChoice::Specific("get_weather".to_string())));
}

#[test]
fn unset_options_serialize_to_an_empty_object() {
    let body = serde_json::to_value(RequestOptions::default()).unwrap();
    assert_eq!(body, json!({}));
}
