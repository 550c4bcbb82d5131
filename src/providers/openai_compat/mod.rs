//! Shared translator core for OpenAI-compatible vendors
//!
//! OpenAI, DeepSeek, Groq, OpenRouter, vLLM and self-hosted generic
//! endpoints all speak the chat-completions dialect with small deviations.
//! [`ChatCompletionsCore`] implements the dialect once; each vendor module
//! supplies a [`Dialect`] describing its deviations.

pub mod convert;
pub mod toolfmt;
pub mod types;

use crate::capability::{Capability, CapabilityRegistry};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use crate::message::{Request, ToolCall};
use crate::options::RequestOptions;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::response::Response;
use crate::schema::SchemaSanitizer;
use crate::stream::{is_done_sentinel, StreamEvent};
use crate::translator::Translator;
use std::sync::Arc;
use types::{
    ChatChunk, ChatRequest, ChatResponse, JsonSchemaFormat, ResponseFormat, StreamOptions,
};
use uuid::Uuid;

/// How a vendor spells structured output in `response_format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredOutput {
    /// Full schema transmission: `{"type": "json_schema", "json_schema": ..}`
    JsonSchema,
    /// Mode flag only: `{"type": "json_object"}`; the schema shapes the
    /// prompt contract but never rides in the request
    JsonObject,
}

/// Per-vendor deviations from the baseline chat-completions dialect
#[derive(Debug, Clone)]
pub struct Dialect {
    /// Vendor name, also the capability-registry vendor key
    pub name: &'static str,
    /// Public endpoint; empty when the vendor has none (self-hosted)
    pub default_base_url: &'static str,
    /// Whether construction fails without an API key
    pub requires_api_key: bool,
    pub structured: StructuredOutput,
    /// Schema keys the vendor accepts beyond the portable core
    pub schema_extra_keys: &'static [&'static str],
    /// Whether the token budget field depends on the model family
    /// (`max_completion_tokens` for reasoning-era OpenAI models)
    pub model_dependent_token_field: bool,
    /// Whether to request a final usage frame via `stream_options`
    pub send_stream_usage: bool,
    /// Whether the vendor accepts `top_k`
    pub supports_top_k: bool,
}

/// Translator for the chat-completions dialect, parameterized by [`Dialect`]
pub struct ChatCompletionsCore {
    dialect: Dialect,
    api_key: Option<String>,
    base_url: String,
    model: String,
    extra_headers: Vec<(String, String)>,
    defaults: RequestOptions,
    capabilities: Arc<CapabilityRegistry>,
    sanitizer: SchemaSanitizer,
}

impl ChatCompletionsCore {
    pub fn new(
        dialect: Dialect,
        params: ProviderParams,
        config: &ProviderConfig,
        capabilities: &Arc<CapabilityRegistry>,
    ) -> LlmResult<Self> {
        if params.model.is_empty() {
            return Err(LlmError::configuration_error(format!(
                "{} translator requires a model identifier",
                dialect.name
            )));
        }
        if dialect.requires_api_key && params.api_key.is_none() {
            return Err(LlmError::configuration_error(format!(
                "{} translator requires an API key",
                dialect.name
            )));
        }

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(dialect.default_base_url)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(LlmError::configuration_error(format!(
                "{} translator requires a base URL",
                dialect.name
            )));
        }

        let sanitizer = SchemaSanitizer::with_extra_keys(dialect.schema_extra_keys);
        Ok(ChatCompletionsCore {
            api_key: params.api_key,
            base_url,
            model: params.model,
            extra_headers: params.extra_headers,
            defaults: config.defaults.clone(),
            capabilities: Arc::clone(capabilities),
            sanitizer,
            dialect,
        })
    }

    /// The model this translator was built for
    pub fn model(&self) -> &str {
        &self.model
    }

    fn require(&self, capability: Capability) -> LlmResult<()> {
        if self
            .capabilities
            .has_capability(self.dialect.name, &self.model, capability)
        {
            Ok(())
        } else {
            Err(LlmError::unsupported_capability(
                self.dialect.name,
                self.model.clone(),
                capability,
            ))
        }
    }

    fn response_format(&self, schema: &serde_json::Value) -> ResponseFormat {
        match self.dialect.structured {
            StructuredOutput::JsonSchema => ResponseFormat {
                format_type: "json_schema",
                json_schema: Some(JsonSchemaFormat {
                    name: "structured_response",
                    schema: self.sanitizer.sanitize(schema),
                    strict: true,
                }),
            },
            StructuredOutput::JsonObject => ResponseFormat {
                format_type: "json_object",
                json_schema: None,
            },
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

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(prompt) = &request.system_prompt {
            messages.push(convert::system_message(prompt));
        }
        messages.extend(request.messages.iter().map(convert::wire_message));
        if messages.is_empty() {
            return Err(LlmError::malformed_request(format!(
                "{} request has no messages",
                self.dialect.name
            )));
        }

        // Reasoning-era OpenAI models take max_completion_tokens; sending
        // both fields is rejected, so exactly one is ever set.
        let (max_tokens, max_completion_tokens) = if self.dialect.model_dependent_token_field
            && convert::uses_completion_token_budget(&self.model)
        {
            (None, opts.max_tokens)
        } else {
            (opts.max_tokens, None)
        };

        let tools = if opts.tools.is_empty() {
            None
        } else {
            Some(
                opts.tools
                    .iter()
                    .map(|tool| convert::wire_tool(tool, self.sanitizer.sanitize(&tool.parameters)))
                    .collect(),
            )
        };

        let mut body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: opts.temperature,
            max_tokens,
            max_completion_tokens,
            top_p: opts.top_p,
            top_k: self.dialect.supports_top_k.then_some(opts.top_k).flatten(),
            presence_penalty: opts.presence_penalty,
            frequency_penalty: opts.frequency_penalty,
            stop: opts.stop.clone(),
            seed: opts.seed,
            stream: stream.then_some(true),
            stream_options: (stream && self.dialect.send_stream_usage)
                .then_some(StreamOptions { include_usage: true }),
            tools,
            tool_choice: opts.tool_choice.as_ref().map(convert::wire_tool_choice),
            response_format: request
                .response_schema
                .as_ref()
                .map(|schema| self.response_format(schema)),
            extra: Default::default(),
        };

        for (key, value) in &opts.extra {
            if convert::RESERVED_KEYS.contains(&key.as_str()) {
                log_warn!(
                    provider = self.dialect.name,
                    key = %key,
                    "Dropping passthrough option that shadows a typed field"
                );
                continue;
            }
            body.extra.insert(key.clone(), value.clone());
        }

        log_debug!(
            provider = self.dialect.name,
            model = %self.model,
            message_count = body.messages.len(),
            stream = stream,
            "Encoded chat-completions request"
        );
        serde_json::to_vec(&body)
            .map_err(|err| LlmError::malformed_request(format!("request encoding failed: {err}")))
    }

    /// Lift a parsed choice message into the unified response.
    ///
    /// Tool calls arrive three ways: the structured `tool_calls` array, a
    /// recognized textual format inside `content`, or not at all. A
    /// tool-calls-only response still gets readable text via
    /// [`ToolCall::render`].
    fn response_from_message(&self, message: types::ResponseMessage) -> Response {
        let content = message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(convert::tool_call_from_wire)
            .collect();

        if tool_calls.is_empty() {
            if toolfmt::looks_like_tool_call(&content) {
                if let Some(found) = toolfmt::parse(&content) {
                    let call = ToolCall::function(
                        format!("call_{}", Uuid::new_v4().simple()),
                        found.function_name,
                        found.arguments.to_string(),
                    );
                    let text = if found.cleaned_content.is_empty() {
                        call.render()
                    } else {
                        found.cleaned_content
                    };
                    return Response::text(text).with_tool_calls(vec![call]);
                }
            }
            return Response::text(content);
        }

        let text = if content.is_empty() {
            tool_calls
                .iter()
                .map(ToolCall::render)
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            content
        };
        Response::text(text).with_tool_calls(tool_calls)
    }
}

impl Translator for ChatCompletionsCore {
    fn name(&self) -> &'static str {
        self.dialect.name
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn headers(&self) -> LlmResult<Vec<(String, String)>> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }
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
        let parsed: ChatResponse = serde_json::from_slice(body).map_err(|err| {
            LlmError::response_parsing_error(format!(
                "{} response is not valid JSON: {err}",
                self.dialect.name
            ))
        })?;

        if let Some(error) = parsed.error {
            return Err(LlmError::api_error(self.dialect.name, error.message));
        }

        let usage = parsed.usage.as_ref().map(Into::into);
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(LlmError::response_parsing_error(format!(
                "{} response carries zero choices",
                self.dialect.name
            )));
        };

        let mut response = if let Some(message) = choice.message {
            self.response_from_message(message)
        } else if let Some(text) = choice.text {
            // Legacy completions shape: choices[].text
            Response::text(text)
        } else {
            return Err(LlmError::response_parsing_error(format!(
                "{} choice matches neither the chat nor the legacy completion shape",
                self.dialect.name
            )));
        };

        if let Some(usage) = usage {
            response = response.with_usage(usage);
        }
        Ok(response)
    }

    /// Classify one SSE payload.
    ///
    /// `[DONE]` and the usage-only final frame are terminal; role-only
    /// deltas, keep-alives and finish markers with no payload are skipped;
    /// malformed frames are skipped rather than aborting the stream.
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
        if is_done_sentinel(payload) {
            return Ok(StreamEvent::done());
        }

        let frame: ChatChunk = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!(
                    provider = self.dialect.name,
                    error = %err,
                    "Skipping malformed stream frame"
                );
                return Ok(StreamEvent::Skip);
            }
        };

        if let Some(error) = frame.error {
            return Err(LlmError::api_error(self.dialect.name, error.message));
        }

        let usage = frame.usage.as_ref().map(Into::into);
        let Some(choice) = frame.choices.into_iter().next() else {
            // With stream_options.include_usage the final frame before
            // [DONE] has no choices and carries aggregate usage.
            return Ok(match usage {
                Some(usage) => StreamEvent::done_with_usage(Some(usage)),
                None => StreamEvent::Skip,
            });
        };

        let text = choice.delta.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|delta| {
                let function = delta.function.unwrap_or_default();
                ToolCall::function(
                    delta.id.unwrap_or_else(|| format!("call_{}", delta.index)),
                    function.name.unwrap_or_default(),
                    function.arguments.unwrap_or_default(),
                )
            })
            .collect();

        if !text.is_empty() || !tool_calls.is_empty() {
            let mut response = Response::text(text);
            if !tool_calls.is_empty() {
                response = response.with_tool_calls(tool_calls);
            }
            if let Some(usage) = usage {
                response = response.with_usage(usage);
            }
            return Ok(StreamEvent::Content(response));
        }

        if choice.finish_reason.is_some() && !self.dialect.send_stream_usage {
            // Dialects without a usage frame end on the finish marker;
            // the trailing [DONE], if any, is never read.
            return Ok(StreamEvent::done_with_usage(usage));
        }
        Ok(StreamEvent::Skip)
    }

    fn set_default_options(&mut self, options: RequestOptions) {
        self.defaults = options;
    }
}
