//! Anthropic messages API wire structures

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Prompt-caching marker attached to a content block or system segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub cache_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl CacheControl {
    pub fn ephemeral() -> Self {
        CacheControl {
            cache_type: "ephemeral".to_string(),
            ttl: None,
        }
    }

    pub fn with_ttl(ttl: impl Into<String>) -> Self {
        CacheControl {
            cache_type: "ephemeral".to_string(),
            ttl: Some(ttl.into()),
        }
    }
}

/// One segment of the system prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSegment {
    #[serde(rename = "type")]
    pub segment_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl SystemSegment {
    pub fn text(text: impl Into<String>) -> Self {
        SystemSegment {
            segment_type: "text".to_string(),
            text: text.into(),
            cache_control: None,
        }
    }
}

/// Message content: a bare string or a block list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Content block, outbound and inbound
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    /// Extended-thinking block in responses; carried but not surfaced
    #[serde(rename = "thinking")]
    Thinking { thinking: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Tool definition in Anthropic's shape
#[derive(Debug, Clone, Serialize)]
pub struct WireTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Request body. Field order follows the caching hierarchy the API
/// documents: tools before system before messages.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemSegment>>,
    pub messages: Vec<WireMessage>,
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Response body; failures arrive as `{"type": "error", "error": {..}}`
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default, rename = "type")]
    pub response_type: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// One SSE stream event, discriminated by `type`
#[derive(Debug, Clone, Deserialize)]
pub struct StreamFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub delta: Option<FrameDelta>,
    #[serde(default)]
    pub content_block: Option<ContentBlock>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// Delta payload of `content_block_delta` / `message_delta` frames
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameDelta {
    #[serde(default, rename = "type")]
    pub delta_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub partial_json: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}
