//! Anthropic translator (messages API)
//!
//! Quirks handled here: the system prompt is lifted out of the message
//! list into the `system` field and segmented for prompt caching; tool
//! results travel as `tool_result` blocks inside user turns; structured
//! output is a forced `structured_response` tool rather than a response
//! format; `max_tokens` is mandatory on the wire so a default applies
//! when the caller sets none.

mod caching;
mod convert;
pub mod types;

#[cfg(test)]
mod tests;

use crate::capability::{Capability, CapabilityRegistry};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use crate::message::{Request, ToolCall};
use crate::options::RequestOptions;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::response::Response;
use crate::schema::SchemaSanitizer;
use crate::stream::StreamEvent;
use crate::translator::Translator;
use serde_json::json;
use std::sync::Arc;
use types::{ContentBlock, MessagesRequest, MessagesResponse, StreamFrame};

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_API_VERSION: &str = "2023-06-01";
/// The wire requires max_tokens; applied when no layer sets one
const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Name of the synthetic tool that carries structured output
const STRUCTURED_TOOL: &str = "structured_response";

/// Passthrough keys that either shadow typed fields or are internal
/// toggles; never forwarded
const RESERVED_KEYS: &[&str] = &[
    "model",
    "messages",
    "system",
    "max_tokens",
    "temperature",
    "top_p",
    "top_k",
    "stop_sequences",
    "stream",
    "tools",
    "tool_choice",
    "enable_prompt_caching",
];

/// Translator for Anthropic's messages API
pub struct AnthropicTranslator {
    api_key: String,
    base_url: String,
    api_version: String,
    model: String,
    extra_headers: Vec<(String, String)>,
    defaults: RequestOptions,
    capabilities: Arc<CapabilityRegistry>,
    sanitizer: SchemaSanitizer,
}

impl AnthropicTranslator {
    pub fn new(
        params: ProviderParams,
        config: &ProviderConfig,
        capabilities: &Arc<CapabilityRegistry>,
    ) -> LlmResult<Self> {
        if params.model.is_empty() {
            return Err(LlmError::configuration_error(
                "anthropic translator requires a model identifier",
            ));
        }
        let api_key = params
            .api_key
            .ok_or_else(|| LlmError::configuration_error("anthropic translator requires an API key"))?;

        Ok(AnthropicTranslator {
            api_key,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_version: config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model: params.model,
            extra_headers: params.extra_headers,
            defaults: config.defaults.clone(),
            capabilities: Arc::clone(capabilities),
            sanitizer: SchemaSanitizer::with_extra_keys(&["description", "enum"]),
        })
    }

    fn require(&self, capability: Capability) -> LlmResult<()> {
        if self
            .capabilities
            .has_capability(PROVIDER, &self.model, capability)
        {
            Ok(())
        } else {
            Err(LlmError::unsupported_capability(
                PROVIDER,
                self.model.clone(),
                capability,
            ))
        }
    }

    fn build_request(&self, request: &Request, stream: bool) -> LlmResult<Vec<u8>> {
        let opts = RequestOptions::layered(&request.options, &self.defaults);

        if stream {
            self.require(Capability::Streaming)?;
        }
        if !opts.tools.is_empty() {
            self.require(Capability::FunctionCalling)?;
        }
        if request.response_schema.is_some() {
            self.require(Capability::StructuredResponse)?;
        }

        let enable_caching = opts
            .extra
            .get("enable_prompt_caching")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);

        let system = convert::collect_system_text(request)
            .map(|text| caching::segment_system_prompt(&text, enable_caching));
        let messages = convert::wire_messages(&request.messages, enable_caching)?;
        if messages.is_empty() {
            return Err(LlmError::malformed_request(
                "anthropic request has no user or assistant messages",
            ));
        }

        let mut tools: Vec<types::WireTool> = opts
            .tools
            .iter()
            .map(|tool| convert::wire_tool(tool, self.sanitizer.sanitize(&tool.parameters)))
            .collect();
        let mut tool_choice = opts.tool_choice.as_ref().map(convert::tool_choice_value);

        // Structured output rides as a forced tool; the model must call it,
        // and the parser lifts its input back out as the response text.
        if let Some(schema) = &request.response_schema {
            tools.push(types::WireTool {
                name: STRUCTURED_TOOL.to_string(),
                description: "Produce the final answer in the required structure".to_string(),
                input_schema: self.sanitizer.sanitize(schema),
            });
            tool_choice = Some(json!({"type": "tool", "name": STRUCTURED_TOOL}));
        }

        let mut body = MessagesRequest {
            tools: (!tools.is_empty()).then_some(tools),
            tool_choice,
            system,
            messages,
            model: self.model.clone(),
            max_tokens: opts.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: opts.temperature,
            top_p: opts.top_p,
            top_k: opts.top_k,
            stop_sequences: opts.stop.clone(),
            stream: stream.then_some(true),
            extra: Default::default(),
        };
        for (key, value) in &opts.extra {
            if RESERVED_KEYS.contains(&key.as_str()) {
                if key != "enable_prompt_caching" {
                    log_warn!(
                        provider = PROVIDER,
                        key = %key,
                        "Dropping passthrough option that shadows a typed field"
                    );
                }
                continue;
            }
            body.extra.insert(key.clone(), value.clone());
        }

        log_debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = body.messages.len(),
            system_segments = body.system.as_ref().map_or(0, Vec::len),
            stream = stream,
            "Encoded messages-API request"
        );
        serde_json::to_vec(&body)
            .map_err(|err| LlmError::malformed_request(format!("request encoding failed: {err}")))
    }

    /// Fold response content blocks into text plus tool calls. The forced
    /// structured-output tool is unwrapped back into plain response text.
    fn response_from_blocks(blocks: Vec<ContentBlock>) -> Response {
        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        for block in blocks {
            match block {
                ContentBlock::Text { text, .. } => text_parts.push(text),
                ContentBlock::ToolUse { id, name, input } => {
                    if name == STRUCTURED_TOOL {
                        text_parts.push(input.to_string());
                    } else {
                        tool_calls.push(ToolCall::function(id, name, input.to_string()));
                    }
                }
                ContentBlock::ToolResult { .. } | ContentBlock::Thinking { .. } => {}
            }
        }

        let text = if text_parts.is_empty() && !tool_calls.is_empty() {
            tool_calls
                .iter()
                .map(ToolCall::render)
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            text_parts.join("")
        };

        let mut response = Response::text(text);
        if !tool_calls.is_empty() {
            response = response.with_tool_calls(tool_calls);
        }
        response
    }
}

impl Translator for AnthropicTranslator {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url)
    }

    fn headers(&self) -> LlmResult<Vec<(String, String)>> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("x-api-key".to_string(), self.api_key.clone()),
            ("anthropic-version".to_string(), self.api_version.clone()),
        ];
        headers.extend(self.extra_headers.iter().cloned());
        Ok(headers)
    }

    fn prepare_request(&self, request: &Request) -> LlmResult<Vec<u8>> {
        self.build_request(request, false)
    }

    fn prepare_stream_request(&self, request: &Request) -> LlmResult<Vec<u8>> {
        self.build_request(request, true)
    }

    fn parse_response(&self, body: &[u8]) -> LlmResult<Response> {
        let parsed: MessagesResponse = serde_json::from_slice(body).map_err(|err| {
            LlmError::response_parsing_error(format!(
                "anthropic response is not valid JSON: {err}"
            ))
        })?;

        if let Some(error) = parsed.error {
            return Err(LlmError::api_error(PROVIDER, error.message));
        }
        if parsed.response_type.as_deref() == Some("error") {
            return Err(LlmError::api_error(PROVIDER, "unspecified vendor error"));
        }

        let mut response = Self::response_from_blocks(parsed.content);
        if let Some(usage) = parsed.usage.as_ref() {
            response = response.with_usage(convert::usage_from_wire(usage));
        }
        Ok(response)
    }

    /// Classify one SSE event payload.
    ///
    /// `content_block_delta` text and tool-argument fragments are content;
    /// `message_delta` (carrying `stop_reason` and final usage) and
    /// `message_stop` are terminal; `message_start`, `ping` and block
    /// boundary events are skipped.
    fn parse_stream_response(&self, chunk: &[u8]) -> LlmResult<StreamEvent> {
        let payload = std::str::from_utf8(chunk)
            .map_err(|_| LlmError::response_parsing_error("stream chunk is not valid UTF-8"))?
            .trim();
        let payload = payload
            .strip_prefix("data:")
            .map(str::trim_start)
            .unwrap_or(payload);
        if payload.is_empty() {
            return Ok(StreamEvent::Skip);
        }

        let frame: StreamFrame = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!(provider = PROVIDER, error = %err, "Skipping malformed stream frame");
                return Ok(StreamEvent::Skip);
            }
        };

        match frame.frame_type.as_str() {
            "content_block_delta" => {
                let delta = frame.delta.unwrap_or_default();
                if let Some(text) = delta.text {
                    if !text.is_empty() {
                        return Ok(StreamEvent::Content(Response::text(text)));
                    }
                }
                if let Some(partial) = delta.partial_json {
                    // Tool-argument fragment; id and name arrived on the
                    // opening content_block_start frame.
                    let fragment = ToolCall::function("", "", partial);
                    return Ok(StreamEvent::Content(
                        Response::text("").with_tool_calls(vec![fragment]),
                    ));
                }
                Ok(StreamEvent::Skip)
            }
            "content_block_start" => match frame.content_block {
                Some(ContentBlock::ToolUse { id, name, .. }) => {
                    let fragment = ToolCall::function(id, name, "");
                    Ok(StreamEvent::Content(
                        Response::text("").with_tool_calls(vec![fragment]),
                    ))
                }
                _ => Ok(StreamEvent::Skip),
            },
            "message_delta" => {
                let stop_reason = frame.delta.and_then(|d| d.stop_reason);
                if stop_reason.is_some() {
                    Ok(StreamEvent::done_with_usage(
                        frame.usage.as_ref().map(convert::usage_from_wire),
                    ))
                } else {
                    Ok(StreamEvent::Skip)
                }
            }
            "message_stop" => Ok(StreamEvent::done()),
            "error" => Err(LlmError::api_error(
                PROVIDER,
                frame.error.map(|e| e.message).unwrap_or_default(),
            )),
            // message_start, ping, content_block_stop
            _ => Ok(StreamEvent::Skip),
        }
    }

    fn set_default_options(&mut self, options: RequestOptions) {
        self.defaults = options;
    }
}

pub(crate) fn construct(
    params: ProviderParams,
    config: &ProviderConfig,
    capabilities: &Arc<CapabilityRegistry>,
) -> LlmResult<Box<dyn Translator>> {
    Ok(Box::new(AnthropicTranslator::new(
        params,
        config,
        capabilities,
    )?))
}
