//! Detection of non-standard textual tool-call formats
//!
//! Open models served through OpenAI-compatible endpoints often emit tool
//! calls as plain text instead of the structured `tool_calls` array. This
//! module recognizes the common shapes and lifts them into proper tool
//! calls, returning the surrounding prose with the matched span removed.

use crate::logging::log_debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Formats recognized by [`parse`], in detection order
static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let mut patterns = Vec::new();
    let specs: &[(&str, &str)] = &[
        // Qwen-style XML wrapper, closing tag optional on truncated output
        ("xml_tool_call", r"(?s)<tool_call>\s*(\{.*?\})\s*(?:</tool_call>|$)"),
        // DeepSeek bracketed request block
        (
            "tool_request_block",
            r"(?s)\[TOOL_REQUEST\](.*?)\[END_TOOL_REQUEST\]",
        ),
        // Our own rendered form fed back through a model
        (
            "tool_call_with_args",
            r"(?s)Tool call:\s+(\w+)\s+with args:\s+(\{.*\})",
        ),
        // A bare JSON object that is the whole message. Arguments may be
        // nested objects, so the brace walk in parse_json_blob trims the
        // greedy capture back to the balanced object.
        (
            "json_only",
            r#"(?s)^\s*(\{.*"name".*"arguments".*\})\s*$"#,
        ),
    ];
    for (name, source) in specs {
        match Regex::new(source) {
            Ok(regex) => patterns.push((*name, regex)),
            Err(err) => {
                crate::logging::log_error!(format = %name, error = %err, "Tool format pattern failed to compile");
            }
        }
    }
    patterns
});

/// A tool call recovered from message text
#[derive(Debug)]
pub struct ToolFormatMatch {
    pub function_name: String,
    pub arguments: Value,
    /// Message text with the matched span removed and trimmed
    pub cleaned_content: String,
}

/// Cheap pre-check so ordinary prose never pays the regex cost
pub fn looks_like_tool_call(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with('{')
        || content.contains("<tool_call>")
        || content.contains("[TOOL_REQUEST]")
        || content.contains("Tool call:")
}

/// Try each known format against `content`
pub fn parse(content: &str) -> Option<ToolFormatMatch> {
    for (format_name, pattern) in PATTERNS.iter() {
        let Some(captures) = pattern.captures(content) else {
            continue;
        };
        let parsed = match *format_name {
            "tool_call_with_args" => parse_name_and_args(&captures),
            _ => parse_json_blob(&captures),
        };
        if let Some((function_name, arguments)) = parsed {
            let full_match = captures.get(0).map_or("", |m| m.as_str());
            let cleaned_content = content.replace(full_match, "").trim().to_string();
            log_debug!(
                format = %format_name,
                function = %function_name,
                "Recovered tool call from message text"
            );
            return Some(ToolFormatMatch {
                function_name,
                arguments,
                cleaned_content,
            });
        }
    }
    None
}

/// Formats where capture 1 is a `{"name": .., "arguments": ..}` object
fn parse_json_blob(captures: &regex::Captures<'_>) -> Option<(String, Value)> {
    let captured = captures.get(1)?.as_str().trim();
    let json_text = extract_balanced_json(captured).unwrap_or_else(|| captured.to_string());
    let object: Value = serde_json::from_str(&json_text).ok()?;
    let name = object.get("name")?.as_str()?.to_string();
    let arguments = object.get("arguments")?.clone();
    Some((name, arguments))
}

/// `Tool call: NAME with args: {..}` - name and arguments captured apart
fn parse_name_and_args(captures: &regex::Captures<'_>) -> Option<(String, Value)> {
    let name = captures.get(1)?.as_str().to_string();
    let args_text = captures.get(2)?.as_str();
    let json_text = extract_balanced_json(args_text).unwrap_or_else(|| args_text.to_string());
    let arguments: Value = serde_json::from_str(&json_text).ok()?;
    Some((name, arguments))
}

/// Extract the first balanced JSON object, respecting string literals.
///
/// Greedy regex captures can overshoot past the object when prose follows
/// it; this walks braces to find the real end.
fn extract_balanced_json(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '"' if !escaped => in_string = !in_string,
            '\\' if in_string && !escaped => {
                escaped = true;
                continue;
            }
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(trimmed[..=idx].to_string());
                }
            }
            _ => {}
        }
        escaped = false;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn xml_tool_call_with_surrounding_prose() {
        let content = r#"Let me check that.
<tool_call>{"name": "get_weather", "arguments": {"city": "Oslo"}}</tool_call>"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.function_name, "get_weather");
        assert_eq!(parsed.arguments, json!({"city": "Oslo"}));
        assert_eq!(parsed.cleaned_content, "Let me check that.");
    }

    #[test]
    fn xml_tool_call_missing_closing_tag() {
        let content = r#"<tool_call>{"name": "search", "arguments": {"q": "rust"}}"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.function_name, "search");
    }

    #[test]
    fn tool_request_block() {
        let content =
            r#"[TOOL_REQUEST]{"name": "lookup", "arguments": {"id": 7}}[END_TOOL_REQUEST]"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.function_name, "lookup");
        assert_eq!(parsed.arguments, json!({"id": 7}));
    }

    #[test]
    fn rendered_tool_call_round_trips() {
        let content = r#"Tool call: get_time with args: {"zone": "UTC"}"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.function_name, "get_time");
        assert_eq!(parsed.arguments, json!({"zone": "UTC"}));
        assert!(parsed.cleaned_content.is_empty());
    }

    #[test]
    fn bare_json_object() {
        let content = r#"{"name": "ping", "arguments": {}}"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.function_name, "ping");
        assert_eq!(parsed.arguments, json!({}));

        let content = r#"{"name": "lookup", "arguments": {"filters": {"max": 3}}}"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.function_name, "lookup");
        assert_eq!(parsed.arguments["filters"]["max"], json!(3));
    }

    #[test]
    fn plain_prose_is_not_a_tool_call() {
        assert!(!looks_like_tool_call("The weather in Oslo is mild."));
        assert!(parse("The weather in Oslo is mild.").is_none());
    }

    #[test]
    fn balanced_extraction_stops_at_object_end() {
        let text = r#"{"a": {"b": "}"}} trailing prose"#;
        let json = extract_balanced_json(text).unwrap();
        assert_eq!(json, r#"{"a": {"b": "}"}}"#);
    }

    #[test]
    fn nested_arguments_survive_extraction() {
        let content = r#"<tool_call>{"name": "plan", "arguments": {"steps": [{"n": 1}, {"n": 2}]}}</tool_call>"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.arguments["steps"][1]["n"], json!(2));
    }
}
