//! Ollama translator (native /api/chat)
//!
//! Local deployments, no API key. Quirks handled here: sampling
//! parameters nest under `options` with Ollama's own names
//! (`num_predict` for the token budget), structured output is the
//! `format` field carrying the sanitized schema verbatim, tool-call
//! arguments are JSON objects rather than encoded strings, and streaming
//! is newline-delimited JSON terminated by `done: true` instead of SSE.

use super::openai_compat::toolfmt;
use crate::capability::{Capability, CapabilityRegistry};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use crate::message::{Message, Request, ToolCall};
use crate::options::RequestOptions;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::response::{Response, Usage};
use crate::schema::SchemaSanitizer;
use crate::stream::StreamEvent;
use crate::translator::Translator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const PROVIDER: &str = "ollama";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const RESERVED_KEYS: &[&str] = &[
    "model",
    "messages",
    "stream",
    "tools",
    "format",
    "options",
    "enable_prompt_caching",
];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    /// Always explicit: the server defaults to streaming when omitted
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    options: Map<String, Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    function: WireFunction,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: String,
    /// Arrives as a JSON object, not an encoded string
    #[serde(default)]
    arguments: Value,
}

fn usage_from_counts(prompt_eval_count: u64, eval_count: u64) -> Usage {
    Usage {
        input_tokens: prompt_eval_count,
        cached_input_tokens: 0,
        output_tokens: eval_count,
        cached_output_tokens: 0,
        reasoning_tokens: 0,
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Translator for Ollama's native chat API
pub struct OllamaTranslator {
    base_url: String,
    model: String,
    extra_headers: Vec<(String, String)>,
    defaults: RequestOptions,
    capabilities: Arc<CapabilityRegistry>,
    sanitizer: SchemaSanitizer,
}

impl OllamaTranslator {
    pub fn new(
        params: ProviderParams,
        config: &ProviderConfig,
        capabilities: &Arc<CapabilityRegistry>,
    ) -> LlmResult<Self> {
        if params.model.is_empty() {
            return Err(LlmError::configuration_error(
                "ollama translator requires a model identifier",
            ));
        }
        Ok(OllamaTranslator {
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
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

    fn wire_message(message: &Message) -> LlmResult<Value> {
        let mut wire = json!({
            "role": message.role.to_string(),
            "content": message.content,
        });
        if let Some(calls) = &message.tool_calls {
            let mut wire_calls = Vec::with_capacity(calls.len());
            for call in calls {
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).map_err(|err| {
                        LlmError::malformed_request(format!(
                            "tool call '{}' has non-JSON arguments: {err}",
                            call.function.name
                        ))
                    })?;
                wire_calls.push(json!({
                    "function": {"name": call.function.name, "arguments": arguments},
                }));
            }
            wire["tool_calls"] = Value::Array(wire_calls);
        }
        Ok(wire)
    }

    fn model_options(opts: &RequestOptions) -> Map<String, Value> {
        let mut options = Map::new();
        if let Some(temperature) = opts.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = opts.max_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if let Some(top_p) = opts.top_p {
            options.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(top_k) = opts.top_k {
            options.insert("top_k".to_string(), json!(top_k));
        }
        if let Some(seed) = opts.seed {
            options.insert("seed".to_string(), json!(seed));
        }
        if let Some(stop) = &opts.stop {
            options.insert("stop".to_string(), json!(stop));
        }
        options
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
            messages.push(json!({"role": "system", "content": prompt}));
        }
        for message in &request.messages {
            messages.push(Self::wire_message(message)?);
        }
        if messages.is_empty() {
            return Err(LlmError::malformed_request("ollama request has no messages"));
        }

        let tools = if opts.tools.is_empty() {
            None
        } else {
            Some(
                opts.tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": self.sanitizer.sanitize(&tool.parameters),
                            },
                        })
                    })
                    .collect(),
            )
        };

        let mut body = ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            tools,
            format: request
                .response_schema
                .as_ref()
                .map(|schema| self.sanitizer.sanitize(schema)),
            options: Self::model_options(&opts),
            extra: Default::default(),
        };
        for (key, value) in &opts.extra {
            if RESERVED_KEYS.contains(&key.as_str()) {
                log_warn!(
                    provider = PROVIDER,
                    key = %key,
                    "Dropping passthrough option that shadows a typed field"
                );
                continue;
            }
            body.extra.insert(key.clone(), value.clone());
        }

        log_debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = body.messages.len(),
            stream = stream,
            "Encoded native chat request"
        );
        serde_json::to_vec(&body)
            .map_err(|err| LlmError::malformed_request(format!("request encoding failed: {err}")))
    }

    fn response_from_message(message: WireMessage) -> Response {
        let tool_calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                ToolCall::function(
                    format!("call_{}", Uuid::new_v4().simple()),
                    call.function.name,
                    call.function.arguments.to_string(),
                )
            })
            .collect();
        let content = message.content;

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

impl Translator for OllamaTranslator {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn headers(&self) -> LlmResult<Vec<(String, String)>> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
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
            LlmError::response_parsing_error(format!("ollama response is not valid JSON: {err}"))
        })?;

        if let Some(error) = parsed.error {
            return Err(LlmError::api_error(PROVIDER, error));
        }
        let Some(message) = parsed.message else {
            return Err(LlmError::response_parsing_error(
                "ollama response carries no message",
            ));
        };

        let mut response = Self::response_from_message(message);
        if parsed.prompt_eval_count > 0 || parsed.eval_count > 0 {
            response =
                response.with_usage(usage_from_counts(parsed.prompt_eval_count, parsed.eval_count));
        }
        Ok(response)
    }

    /// Classify one NDJSON line. `done: true` is the terminal and carries
    /// the eval counters; lines with message content are content; empty
    /// keep-alive lines are skipped.
    fn parse_stream_response(&self, chunk: &[u8]) -> LlmResult<StreamEvent> {
        let payload = std::str::from_utf8(chunk)
            .map_err(|_| LlmError::response_parsing_error("stream chunk is not valid UTF-8"))?
            .trim();
        if payload.is_empty() {
            return Ok(StreamEvent::Skip);
        }

        let frame: ChatResponse = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!(provider = PROVIDER, error = %err, "Skipping malformed stream line");
                return Ok(StreamEvent::Skip);
            }
        };

        if let Some(error) = frame.error {
            return Err(LlmError::api_error(PROVIDER, error));
        }
        if frame.done {
            return Ok(StreamEvent::done_with_usage(Some(usage_from_counts(
                frame.prompt_eval_count,
                frame.eval_count,
            ))));
        }

        match frame.message {
            Some(message) if !message.content.is_empty() || message.tool_calls.is_some() => {
                Ok(StreamEvent::Content(Self::response_from_message(message)))
            }
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
    Ok(Box::new(OllamaTranslator::new(params, config, capabilities)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn translator() -> OllamaTranslator {
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        OllamaTranslator::new(
            ProviderParams::new(None, "llama3.2"),
            &ProviderConfig::default(),
            &capabilities,
        )
        .unwrap()
    }

    fn body_of(bytes: Vec<u8>) -> Value {
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn stream_flag_is_always_explicit() {
        let request = Request::new(vec![Message::user("hi")]);
        let translator = translator();
        assert_eq!(
            body_of(translator.prepare_request(&request).unwrap())["stream"],
            json!(false)
        );
        assert_eq!(
            body_of(translator.prepare_stream_request(&request).unwrap())["stream"],
            json!(true)
        );
    }

    #[test]
    fn sampling_options_nest_with_native_names() {
        let options = RequestOptions::default()
            .with_temperature(0.1)
            .with_max_tokens(64);
        let request = Request::new(vec![Message::user("hi")]).with_options(options);
        let body = body_of(translator().prepare_request(&request).unwrap());
        assert_eq!(body["options"]["temperature"], json!(0.1));
        assert_eq!(body["options"]["num_predict"], json!(64));
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn schema_lands_in_format_field() {
        let request = Request::new(vec![Message::user("hi")])
            .with_schema(json!({"type": "object", "properties": {"x": {"type": "string"}}}));
        let body = body_of(translator().prepare_request(&request).unwrap());
        assert_eq!(body["format"]["type"], "object");
        assert_eq!(body["format"]["additionalProperties"], json!(false));
    }

    #[test]
    fn keep_alive_passes_through_at_top_level() {
        let options = RequestOptions::default().with_extra("keep_alive", json!("5m"));
        let request = Request::new(vec![Message::user("hi")]).with_options(options);
        let body = body_of(translator().prepare_request(&request).unwrap());
        assert_eq!(body["keep_alive"], json!("5m"));
    }

    #[test]
    fn object_arguments_become_encoded_strings() {
        let body = br#"{
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "get_weather", "arguments": {"city": "Oslo"}}}]
            },
            "done": true
        }"#;
        let response = translator().parse_response(body).unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(
            response.tool_calls[0].function.arguments,
            r#"{"city":"Oslo"}"#
        );
        assert_eq!(
            response.as_text(),
            r#"Tool call: get_weather with args: {"city":"Oslo"}"#
        );
    }

    #[test]
    fn eval_counts_map_to_usage() {
        let body = br#"{
            "message": {"role": "assistant", "content": "Paris"},
            "done": true,
            "prompt_eval_count": 15,
            "eval_count": 4
        }"#;
        let usage = translator().parse_response(body).unwrap().usage.unwrap();
        assert_eq!(usage.input_tokens, 15);
        assert_eq!(usage.output_tokens, 4);
        assert_eq!(usage.total(), 19);
    }

    #[test]
    fn ndjson_stream_lines_classify() {
        let translator = translator();

        let content = br#"{"model": "llama3.2", "message": {"role": "assistant", "content": "Par"}, "done": false}"#;
        match translator.parse_stream_response(content).unwrap() {
            StreamEvent::Content(response) => assert_eq!(response.as_text(), "Par"),
            other => panic!("expected content, got {other:?}"),
        }

        let empty = br#"{"model": "llama3.2", "message": {"role": "assistant", "content": ""}, "done": false}"#;
        assert!(matches!(
            translator.parse_stream_response(empty).unwrap(),
            StreamEvent::Skip
        ));

        let terminal = br#"{"model": "llama3.2", "done": true, "prompt_eval_count": 9, "eval_count": 3}"#;
        match translator.parse_stream_response(terminal).unwrap() {
            StreamEvent::Done { usage, .. } => assert_eq!(usage.unwrap().output_tokens, 3),
            other => panic!("expected terminal, got {other:?}"),
        }
    }

    #[test]
    fn error_line_aborts_the_stream() {
        let err = translator()
            .parse_stream_response(br#"{"error": "model not found"}"#)
            .unwrap_err();
        assert!(matches!(err, LlmError::ApiError { provider: "ollama", .. }));
    }

    #[test]
    fn textual_tool_call_is_recovered() {
        let body = br#"{
            "message": {
                "role": "assistant",
                "content": "<tool_call>{\"name\": \"search\", \"arguments\": {\"q\": \"rust\"}}</tool_call>"
            },
            "done": true
        }"#;
        let response = translator().parse_response(body).unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].function.name, "search");
    }
}
