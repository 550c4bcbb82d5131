//! Conversions between the unified model and the messages API
//!
//! Role remaps: `system` messages are lifted out of the conversation and
//! joined into the `system` field; `tool` results become `user` messages
//! carrying a `tool_result` block, since the messages API has no tool
//! role. Consecutive same-role turns are merged because the API requires
//! strict user/assistant alternation.

use super::types::{CacheControl, ContentBlock, MessageContent, WireMessage, WireTool, WireUsage};
use crate::error::{LlmError, LlmResult};
use crate::message::{CacheHint, Message, Request, Role, ToolCall};
use crate::options::{ToolChoice, ToolDefinition};
use crate::response::Usage;
use serde_json::{json, Value};

/// Pull the system text out of a request: the explicit system prompt
/// first, then any system-role messages in conversation order.
pub(super) fn collect_system_text(request: &Request) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(prompt) = &request.system_prompt {
        parts.push(prompt);
    }
    parts.extend(
        request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str()),
    );
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Convert the conversation (system messages excluded) to wire messages,
/// merging consecutive same-role turns.
pub(super) fn wire_messages(
    messages: &[Message],
    enable_caching: bool,
) -> LlmResult<Vec<WireMessage>> {
    let mut wire: Vec<WireMessage> = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == Role::System {
            continue;
        }
        let role = match message.role {
            Role::Assistant => "assistant",
            // Tool results ride inside a user turn
            Role::User | Role::Tool => "user",
            Role::System => unreachable!("system messages filtered above"),
        };
        let blocks = message_blocks(message, enable_caching)?;
        if blocks.is_empty() {
            continue;
        }

        match wire.last_mut() {
            Some(previous) if previous.role == role => {
                merge_blocks(&mut previous.content, blocks);
            }
            _ => wire.push(WireMessage {
                role: role.to_string(),
                content: MessageContent::Blocks(blocks),
            }),
        }
    }
    Ok(wire)
}

fn message_blocks(message: &Message, enable_caching: bool) -> LlmResult<Vec<ContentBlock>> {
    let mut blocks = Vec::new();

    if message.role == Role::Tool {
        let tool_use_id = message.tool_call_id.clone().ok_or_else(|| {
            LlmError::malformed_request("tool result message is missing tool_call_id")
        })?;
        blocks.push(ContentBlock::ToolResult {
            tool_use_id,
            content: message.content.clone(),
        });
        return Ok(blocks);
    }

    if !message.content.is_empty() {
        blocks.push(ContentBlock::Text {
            text: message.content.clone(),
            cache_control: cache_control_for(message, enable_caching),
        });
    }
    for call in message.tool_calls.iter().flatten() {
        blocks.push(tool_use_block(call)?);
    }
    Ok(blocks)
}

fn cache_control_for(message: &Message, enable_caching: bool) -> Option<CacheControl> {
    if !enable_caching {
        return None;
    }
    message.cache_hint.map(|hint| match hint {
        CacheHint::Ephemeral => CacheControl::ephemeral(),
        CacheHint::Extended => CacheControl::with_ttl(hint.ttl()),
    })
}

fn tool_use_block(call: &ToolCall) -> LlmResult<ContentBlock> {
    let input: Value = serde_json::from_str(&call.function.arguments).map_err(|err| {
        LlmError::malformed_request(format!(
            "tool call '{}' has non-JSON arguments: {err}",
            call.function.name
        ))
    })?;
    Ok(ContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.function.name.clone(),
        input,
    })
}

fn merge_blocks(existing: &mut MessageContent, mut incoming: Vec<ContentBlock>) {
    match existing {
        MessageContent::Blocks(blocks) => blocks.append(&mut incoming),
        MessageContent::Text(text) => {
            let mut blocks = vec![ContentBlock::Text {
                text: std::mem::take(text),
                cache_control: None,
            }];
            blocks.append(&mut incoming);
            *existing = MessageContent::Blocks(blocks);
        }
    }
}

pub(super) fn wire_tool(tool: &ToolDefinition, input_schema: Value) -> WireTool {
    WireTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema,
    }
}

pub(super) fn tool_choice_value(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!({"type": "auto"}),
        ToolChoice::None => json!({"type": "none"}),
        ToolChoice::Required => json!({"type": "any"}),
        ToolChoice::Specific(name) => json!({"type": "tool", "name": name}),
    }
}

/// Cache-creation tokens buy future reads, so they count as input; reads
/// are the cached share of input.
pub(super) fn usage_from_wire(wire: &WireUsage) -> Usage {
    Usage {
        input_tokens: wire.input_tokens
            + wire.cache_creation_input_tokens
            + wire.cache_read_input_tokens,
        cached_input_tokens: wire.cache_read_input_tokens,
        output_tokens: wire.output_tokens,
        cached_output_tokens: 0,
        reasoning_tokens: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_and_system_messages_join_in_order() {
        let request = Request::new(vec![
            Message::system("Also: answer in French."),
            Message::user("hi"),
        ])
        .with_system_prompt("Be terse.");
        let system = collect_system_text(&request).unwrap();
        assert_eq!(system, "Be terse.\n\nAlso: answer in French.");
    }

    #[test]
    fn tool_result_becomes_user_turn_with_block() {
        let messages = [Message::tool_result("toolu_1", "sunny, 18C")];
        let wire = wire_messages(&messages, true).unwrap();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
        match &wire[0].content {
            MessageContent::Blocks(blocks) => match &blocks[0] {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                } => {
                    assert_eq!(tool_use_id, "toolu_1");
                    assert_eq!(content, "sunny, 18C");
                }
                other => panic!("expected tool_result block, got {other:?}"),
            },
            MessageContent::Text(_) => panic!("expected block content"),
        }
    }

    #[test]
    fn consecutive_user_turns_merge() {
        let messages = [
            Message::user("first"),
            Message::tool_result("toolu_1", "result"),
        ];
        let wire = wire_messages(&messages, true).unwrap();
        assert_eq!(wire.len(), 1);
        match &wire[0].content {
            MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            MessageContent::Text(_) => panic!("expected block content"),
        }
    }

    #[test]
    fn tool_result_without_call_id_is_rejected() {
        let mut message = Message::new(Role::Tool, "orphaned");
        message.tool_call_id = None;
        let err = wire_messages(&[message], true).unwrap_err();
        assert!(matches!(err, LlmError::MalformedRequest { .. }));
    }

    #[test]
    fn extended_cache_hint_carries_ttl() {
        let messages = [Message::user("context...").with_extended_cache()];
        let wire = wire_messages(&messages, true).unwrap();
        match &wire[0].content {
            MessageContent::Blocks(blocks) => match &blocks[0] {
                ContentBlock::Text { cache_control, .. } => {
                    assert_eq!(cache_control.as_ref().unwrap().ttl.as_deref(), Some("1h"));
                }
                other => panic!("expected text block, got {other:?}"),
            },
            MessageContent::Text(_) => panic!("expected block content"),
        }
    }

    #[test]
    fn usage_folds_cache_tokens_into_input() {
        let wire = WireUsage {
            input_tokens: 100,
            output_tokens: 40,
            cache_creation_input_tokens: 30,
            cache_read_input_tokens: 200,
        };
        let usage = usage_from_wire(&wire);
        assert_eq!(usage.input_tokens, 330);
        assert_eq!(usage.cached_input_tokens, 200);
        // Billed total excludes the cached share
        assert_eq!(usage.total(), 170);
    }
}
