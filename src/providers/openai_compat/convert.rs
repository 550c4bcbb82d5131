//! Conversions between the unified model and the chat-completions dialect

use super::types::{ChatMessage, WireFunction, WireTool, WireToolCall, WireToolSpec};
use crate::message::{Message, Role, ToolCall};
use crate::options::{ToolChoice, ToolDefinition};
use serde_json::{json, Value};

/// Keys a translator emits from typed fields; passthrough extras under
/// these names are dropped rather than letting them clobber typed output
pub(super) const RESERVED_KEYS: &[&str] = &[
    "model",
    "messages",
    "temperature",
    "max_tokens",
    "max_completion_tokens",
    "top_p",
    "top_k",
    "presence_penalty",
    "frequency_penalty",
    "stop",
    "seed",
    "stream",
    "stream_options",
    "tools",
    "tool_choice",
    "response_format",
];

/// Model families that reject `max_tokens` in favor of
/// `max_completion_tokens`
pub(super) fn uses_completion_token_budget(model: &str) -> bool {
    model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
        || model.starts_with("gpt-5")
}

/// Convert one unified message to the wire shape
pub(super) fn wire_message(message: &Message) -> ChatMessage {
    let tool_calls = message.tool_calls.as_ref().map(|calls| {
        calls
            .iter()
            .map(|call| WireToolCall {
                id: call.id.clone(),
                call_type: "function".to_string(),
                function: WireFunction {
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                },
            })
            .collect()
    });

    // Assistant turns that are pure tool calls have no content field
    let content = if message.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(message.content.clone())
    };

    ChatMessage {
        role: message.role.to_string(),
        content,
        name: message.name.clone(),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls,
    }
}

/// System prompt as the leading `system` message
pub(super) fn system_message(prompt: &str) -> ChatMessage {
    ChatMessage {
        role: Role::System.to_string(),
        content: Some(prompt.to_string()),
        name: None,
        tool_call_id: None,
        tool_calls: None,
    }
}

pub(super) fn wire_tool(tool: &ToolDefinition, parameters: Value) -> WireTool {
    WireTool {
        tool_type: "function",
        function: WireToolSpec {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters,
        },
    }
}

pub(super) fn wire_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Specific(name) => json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}

pub(super) fn tool_call_from_wire(wire: WireToolCall) -> ToolCall {
    ToolCall::function(wire.id, wire.function.name, wire.function.arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_budget_field_by_model_family() {
        assert!(uses_completion_token_budget("o1-preview"));
        assert!(uses_completion_token_budget("o3-mini"));
        assert!(uses_completion_token_budget("gpt-5"));
        assert!(!uses_completion_token_budget("gpt-4o"));
        assert!(!uses_completion_token_budget("gpt-4.1-mini"));
    }

    #[test]
    fn tool_result_message_keeps_call_id() {
        let message = Message::tool_result("call_1", "42");
        let wire = wire_message(&message);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire.content.as_deref(), Some("42"));
    }

    #[test]
    fn assistant_tool_call_turn_drops_empty_content() {
        let message = Message::assistant_tool_calls(vec![ToolCall::function(
            "call_1",
            "get_weather",
            r#"{"city":"Oslo"}"#,
        )]);
        let wire = wire_message(&message);
        assert!(wire.content.is_none());
        assert_eq!(wire.tool_calls.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn specific_tool_choice_is_an_object() {
        let value = wire_tool_choice(&ToolChoice::Specific("lookup".into()));
        assert_eq!(value["function"]["name"], "lookup");
    }
}
