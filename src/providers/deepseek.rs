//! DeepSeek translator
//!
//! Chat-completions dialect with one structural difference: structured
//! output is requested as `{"type": "json_object"}` and the schema never
//! rides in the request, so the caller's prompt must describe the shape.

use super::openai_compat::{ChatCompletionsCore, Dialect, StructuredOutput};
use crate::capability::CapabilityRegistry;
use crate::error::LlmResult;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::translator::Translator;
use std::sync::Arc;

fn dialect() -> Dialect {
    Dialect {
        name: "deepseek",
        default_base_url: "https://api.deepseek.com/v1",
        requires_api_key: true,
        structured: StructuredOutput::JsonObject,
        schema_extra_keys: &["description", "enum"],
        model_dependent_token_field: false,
        send_stream_usage: true,
        supports_top_k: false,
    }
}

/// Build a DeepSeek translator
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
