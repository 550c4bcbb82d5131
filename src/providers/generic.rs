//! Generic OpenAI-compatible translator
//!
//! Escape hatch for llama.cpp servers, LM Studio, proxies and anything
//! else speaking the chat-completions dialect. There is no public
//! endpoint, so a base URL must be configured before [`construct`] can
//! succeed. Capability defaults are conservative (streaming only); widen
//! them per model when the backend supports more.

use super::openai_compat::{ChatCompletionsCore, Dialect, StructuredOutput};
use crate::capability::CapabilityRegistry;
use crate::error::LlmResult;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::translator::Translator;
use std::sync::Arc;

fn dialect() -> Dialect {
    Dialect {
        name: "generic",
        default_base_url: "",
        requires_api_key: false,
        structured: StructuredOutput::JsonSchema,
        schema_extra_keys: &["description", "enum"],
        model_dependent_token_field: false,
        send_stream_usage: false,
        supports_top_k: true,
    }
}

/// Build a generic OpenAI-compatible translator
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
