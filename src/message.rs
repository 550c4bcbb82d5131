//! Unified message architecture for LLM interactions
//!
//! Provider-agnostic request/message types. Translators map these onto each
//! vendor's wire format; fields a vendor cannot express are dropped there,
//! never forwarded.

use serde::{Deserialize, Serialize};

/// Message roles for LLM interactions
///
/// This is a closed enumeration: translators map each role to the vendor's
/// role token (e.g. `Assistant` becomes `"model"` for Gemini) and drop
/// messages whose role the vendor cannot express. They never invent a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// Cache hint for prompt caching
///
/// Anthropic honors both TTL classes; vendors without prompt caching ignore
/// the hint entirely. The hint only selects a message-encoding strategy and
/// never appears as a key in outbound JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CacheHint {
    /// Ephemeral cache (5-minute TTL)
    #[default]
    Ephemeral,
    /// Extended cache (1-hour TTL)
    Extended,
}

impl CacheHint {
    /// The TTL token Anthropic's `cache_control` block expects.
    pub fn ttl(self) -> &'static str {
        match self {
            CacheHint::Ephemeral => "5m",
            CacheHint::Extended => "1h",
        }
    }
}

/// Type discriminator for tool calls
///
/// Currently only function calls exist; the enum keeps the wire field
/// forward-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallKind {
    #[default]
    Function,
}

/// A function invocation requested by the model
///
/// Arguments are kept as raw JSON text end-to-end to avoid lossy
/// re-encoding between vendors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call
    pub name: String,
    /// Raw, un-decoded JSON arguments
    pub arguments: String,
}

/// A structured tool invocation carried on an assistant message or response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Type discriminator (currently always `function`)
    #[serde(rename = "type", default)]
    pub kind: ToolCallKind,
    /// The function being invoked
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ToolCallKind::Function,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Deterministic text rendering used when a response carries only tool
    /// calls and a vendor needs a textual stand-in.
    pub fn render(&self) -> String {
        format!(
            "Tool call: {} with args: {}",
            self.function.name, self.function.arguments
        )
    }
}

/// Universal message for LLM interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,
    /// Text content
    pub content: String,
    /// Optional participant name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identifier of the tool call this message answers (tool-result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Optional prompt-caching hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hint: Option<CacheHint>,
    /// Tool calls requested by an assistant message, in call order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// Create a message with the given role and text content
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            cache_hint: None,
            tool_calls: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool-result message answering a prior tool call
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Create an assistant message that requested tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::new(Role::Assistant, "")
        }
    }

    /// Mark this message for ephemeral caching (5-minute TTL)
    pub fn with_ephemeral_cache(mut self) -> Self {
        self.cache_hint = Some(CacheHint::Ephemeral);
        self
    }

    /// Mark this message for extended caching (1-hour TTL)
    pub fn with_extended_cache(mut self) -> Self {
        self.cache_hint = Some(CacheHint::Extended);
        self
    }
}

/// One outbound conversation turn set
///
/// Built once per call and immutable from the translator's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Request {
    /// Ordered conversation messages
    pub messages: Vec<Message>,
    /// Optional system prompt, lifted into the vendor's system slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Optional JSON Schema for structured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    /// Call-time options, folded over the translator's persisted defaults
    #[serde(default)]
    pub options: crate::options::RequestOptions,
}

impl Request {
    /// Create a new request with messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the structured-output schema
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Set call-time options
    pub fn with_options(mut self, options: crate::options::RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether any message carries tool calls or tool results
    pub fn uses_tools(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.tool_calls.is_some() || m.tool_call_id.is_some())
    }
}
