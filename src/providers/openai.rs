//! OpenAI translator
//!
//! Baseline of the chat-completions dialect. Quirks handled here: the
//! reasoning-era models (o-series, gpt-5) take `max_completion_tokens`
//! instead of `max_tokens`, and structured output uses the strict
//! `json_schema` response format.

use super::openai_compat::{ChatCompletionsCore, Dialect, StructuredOutput};
use crate::capability::CapabilityRegistry;
use crate::error::LlmResult;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::translator::Translator;
use std::sync::Arc;

fn dialect() -> Dialect {
    Dialect {
        name: "openai",
        default_base_url: "https://api.openai.com/v1",
        requires_api_key: true,
        structured: StructuredOutput::JsonSchema,
        schema_extra_keys: &["description", "enum", "additionalProperties"],
        model_dependent_token_field: true,
        send_stream_usage: true,
        supports_top_k: false,
    }
}

/// Build an OpenAI translator
pub fn translator(
    params: ProviderParams,
    config: &ProviderConfig,
    capabilities: &Arc<CapabilityRegistry>,
) -> LlmResult<ChatCompletionsCore> {
    ChatCompletionsCore::new(dialect(), params, config, capabilities)
}

pub(crate) fn construct(
    params: ProviderParams,
    config: &ProviderConfig,
    capabilities: &Arc<CapabilityRegistry>,
) -> LlmResult<Box<dyn Translator>> {
    Ok(Box::new(translator(params, config, capabilities)?))
}
