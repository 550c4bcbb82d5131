//! Unified response and usage accounting types

use crate::message::{CacheHint, Role, ToolCall};
use serde::{Deserialize, Serialize};

/// Response content kinds
///
/// Declared as a closed polymorphic set so additional kinds can be added
/// without breaking callers who match on it today.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Content {
    /// Plain text content
    Text(String),
}

impl Content {
    /// Extract the text value, if this content is textual
    pub fn as_text(&self) -> &str {
        match self {
            Content::Text(text) => text,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

/// Token usage accounting, reconciled across vendor formats
///
/// Vendors report prompt/cache/reasoning breakdowns under different JSON
/// paths and names; translators map them all into this one shape. The total
/// is derived by [`Usage::total`] rather than stored, so cached content can
/// never be double-counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    /// Prompt tokens, including any cache reads
    pub input_tokens: u64,
    /// Prompt tokens served from the vendor's prompt cache
    pub cached_input_tokens: u64,
    /// Completion tokens, including any cached completion tokens
    pub output_tokens: u64,
    /// Completion tokens served from cache (rare; most vendors report 0)
    pub cached_output_tokens: u64,
    /// Hidden reasoning tokens, where the vendor reports them
    pub reasoning_tokens: u64,
}

impl Usage {
    /// Billable total: `(input - cached_input) + (output - cached_output)`.
    ///
    /// Never the raw prompt+completion sum - that would double-count cache
    /// hits in downstream cost accounting.
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_sub(self.cached_input_tokens)
            + self.output_tokens.saturating_sub(self.cached_output_tokens)
    }

    /// Merge a later usage report into this one, field-wise max.
    ///
    /// Streaming vendors emit cumulative usage; taking the max keeps the
    /// final aggregate correct regardless of how many chunks carried it.
    pub fn merge_max(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.cached_input_tokens = self.cached_input_tokens.max(other.cached_input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
        self.cached_output_tokens = self.cached_output_tokens.max(other.cached_output_tokens);
        self.reasoning_tokens = self.reasoning_tokens.max(other.reasoning_tokens);
    }
}

/// Response from one exchange, or one chunk of a streaming exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Role of the responder (always `assistant` for today's vendors)
    pub role: Role,
    /// Response content
    pub content: Content,
    /// Token usage, when the vendor reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Tool calls requested by the model, in call order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Cache hint echoed back by vendors that report cache participation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hint: Option<CacheHint>,
}

impl Response {
    /// Create an assistant text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(content.into()),
            usage: None,
            tool_calls: Vec::new(),
            cache_hint: None,
        }
    }

    /// An empty-but-valid response (vendor answered with no content)
    pub fn empty() -> Self {
        Self::text("")
    }

    /// Extract the text content
    pub fn as_text(&self) -> &str {
        self.content.as_text()
    }

    /// Attach usage accounting
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Attach tool calls
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty()
    }
}
