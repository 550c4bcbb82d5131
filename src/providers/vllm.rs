//! vLLM translator
//!
//! Self-hosted OpenAI-compatible server. No API key required; the default
//! base URL targets a local deployment and is normally overridden via
//! provider configuration. Open models served this way are the main source
//! of textual tool-call formats, which the shared parser recovers.

use super::openai_compat::{ChatCompletionsCore, Dialect, StructuredOutput};
use crate::capability::CapabilityRegistry;
use crate::error::LlmResult;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::translator::Translator;
use std::sync::Arc;

fn dialect() -> Dialect {
    Dialect {
        name: "vllm",
        default_base_url: "http://localhost:8000/v1",
        requires_api_key: false,
        structured: StructuredOutput::JsonSchema,
        schema_extra_keys: &["description", "enum"],
        model_dependent_token_field: false,
        send_stream_usage: false,
        supports_top_k: true,
    }
}

/// Build a vLLM translator
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
