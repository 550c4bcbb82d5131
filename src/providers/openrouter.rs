//! OpenRouter translator
//!
//! Aggregator speaking the chat-completions dialect. Accepts `top_k` and
//! forwards it to backends that understand it. Attribution headers
//! (`HTTP-Referer`, `X-Title`) go through the extra-headers hook.

use super::openai_compat::{ChatCompletionsCore, Dialect, StructuredOutput};
use crate::capability::CapabilityRegistry;
use crate::error::LlmResult;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::translator::Translator;
use std::sync::Arc;

fn dialect() -> Dialect {
    Dialect {
        name: "openrouter",
        default_base_url: "https://openrouter.ai/api/v1",
        requires_api_key: true,
        structured: StructuredOutput::JsonSchema,
        schema_extra_keys: &["description", "enum", "additionalProperties"],
        model_dependent_token_field: false,
        send_stream_usage: true,
        supports_top_k: true,
    }
}

/// Build an OpenRouter translator
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
