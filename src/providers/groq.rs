//! Groq translator
//!
//! Chat-completions dialect behind Groq's OpenAI compatibility layer.
//! Groq does not honor `stream_options`, so streams end on the finish
//! marker and per-stream usage is unavailable.

use super::openai_compat::{ChatCompletionsCore, Dialect, StructuredOutput};
use crate::capability::CapabilityRegistry;
use crate::error::LlmResult;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::translator::Translator;
use std::sync::Arc;

fn dialect() -> Dialect {
    Dialect {
        name: "groq",
        default_base_url: "https://api.groq.com/openai/v1",
        requires_api_key: true,
        structured: StructuredOutput::JsonSchema,
        schema_extra_keys: &["description", "enum"],
        model_dependent_token_field: false,
        send_stream_usage: false,
        supports_top_k: false,
    }
}

/// Build a Groq translator
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
