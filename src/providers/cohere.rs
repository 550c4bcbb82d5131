//! Cohere translator (v2 chat API)
//!
//! All four unified roles map directly onto v2 roles. Quirks handled
//! here: nucleus and top-k sampling are spelled `p` and `k`, structured
//! output is `response_format: {"type": "json_object", "schema": ..}`,
//! and stream events are typed objects ending with `stream-end` instead
//! of a `[DONE]` sentinel.

use crate::capability::{Capability, CapabilityRegistry};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use crate::message::{Message, Request, ToolCall};
use crate::options::{RequestOptions, ToolChoice};
use crate::registry::{ProviderConfig, ProviderParams};
use crate::response::{Response, Usage};
use crate::schema::SchemaSanitizer;
use crate::stream::StreamEvent;
use crate::translator::Translator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const PROVIDER: &str = "cohere";
const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v2";

const RESERVED_KEYS: &[&str] = &[
    "model",
    "messages",
    "temperature",
    "max_tokens",
    "p",
    "k",
    "frequency_penalty",
    "presence_penalty",
    "stop_sequences",
    "seed",
    "stream",
    "tools",
    "tool_choice",
    "response_format",
    "enable_prompt_caching",
];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Success bodies carry `message` as an object; error bodies carry
/// `message` as a bare string. The untagged enum absorbs both.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MessageField {
    Assistant(AssistantMessage),
    Error(String),
}

#[derive(Debug, Clone, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<ContentItem>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentItem {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(default)]
    function: WireFunction,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<MessageField>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    tokens: Option<TokenCounts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TokenCounts {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamFrame {
    #[serde(rename = "type", default)]
    frame_type: String,
    #[serde(default)]
    delta: Option<Value>,
}

// The v2 API reports token counts as JSON numbers, which arrive as f64.
// Round to the nearest count and treat NaN or negative values as zero
// rather than letting a raw cast truncate them.
fn token_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn usage_from_wire(wire: &WireUsage) -> Usage {
    let tokens = wire.tokens.clone().unwrap_or_default();
    Usage {
        input_tokens: token_count(tokens.input_tokens),
        cached_input_tokens: 0,
        output_tokens: token_count(tokens.output_tokens),
        cached_output_tokens: 0,
        reasoning_tokens: 0,
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Translator for Cohere's v2 chat API
pub struct CohereTranslator {
    api_key: String,
    base_url: String,
    model: String,
    extra_headers: Vec<(String, String)>,
    defaults: RequestOptions,
    capabilities: Arc<CapabilityRegistry>,
    sanitizer: SchemaSanitizer,
}

impl CohereTranslator {
    pub fn new(
        params: ProviderParams,
        config: &ProviderConfig,
        capabilities: &Arc<CapabilityRegistry>,
    ) -> LlmResult<Self> {
        if params.model.is_empty() {
            return Err(LlmError::configuration_error(
                "cohere translator requires a model identifier",
            ));
        }
        let api_key = params
            .api_key
            .ok_or_else(|| LlmError::configuration_error("cohere translator requires an API key"))?;

        Ok(CohereTranslator {
            api_key,
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

    fn wire_message(message: &Message) -> WireMessage {
        let tool_calls = message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.function.name,
                            "arguments": call.function.arguments,
                        },
                    })
                })
                .collect()
        });
        WireMessage {
            role: message.role.to_string(),
            content: (!message.content.is_empty() || tool_calls.is_none())
                .then(|| message.content.clone()),
            tool_call_id: message.tool_call_id.clone(),
            tool_calls,
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
            messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(prompt.clone()),
                tool_call_id: None,
                tool_calls: None,
            });
        }
        messages.extend(request.messages.iter().map(Self::wire_message));
        if messages.is_empty() {
            return Err(LlmError::malformed_request("cohere request has no messages"));
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
        if let Some(choice) = &opts.tool_choice {
            // v2 only accepts REQUIRED/NONE; auto is the absent default
            if !matches!(choice, ToolChoice::Auto) {
                log_warn!(
                    provider = PROVIDER,
                    "Cohere v2 has no per-call tool_choice beyond the default; ignoring"
                );
            }
        }

        let response_format = request.response_schema.as_ref().map(|schema| {
            json!({
                "type": "json_object",
                "schema": self.sanitizer.sanitize(schema),
            })
        });

        let mut body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            p: opts.top_p,
            k: opts.top_k,
            frequency_penalty: opts.frequency_penalty,
            presence_penalty: opts.presence_penalty,
            stop_sequences: opts.stop.clone(),
            seed: opts.seed,
            stream: stream.then_some(true),
            tools,
            response_format,
            extra: Default::default(),
        };
        for (key, value) in &opts.extra {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            body.extra.insert(key.clone(), value.clone());
        }

        log_debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = body.messages.len(),
            stream = stream,
            "Encoded v2 chat request"
        );
        serde_json::to_vec(&body)
            .map_err(|err| LlmError::malformed_request(format!("request encoding failed: {err}")))
    }
}

impl Translator for CohereTranslator {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn endpoint(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    fn headers(&self) -> LlmResult<Vec<(String, String)>> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
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
        let parsed: ChatResponse = serde_json::from_slice(body).map_err(|err| {
            LlmError::response_parsing_error(format!("cohere response is not valid JSON: {err}"))
        })?;

        let message = match parsed.message {
            Some(MessageField::Error(message)) => {
                return Err(LlmError::api_error(PROVIDER, message));
            }
            Some(MessageField::Assistant(message)) => message,
            None => {
                return Err(LlmError::response_parsing_error(
                    "cohere response carries no message",
                ));
            }
        };

        let text: String = message
            .content
            .iter()
            .map(|item| item.text.as_str())
            .collect();
        let tool_calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall::function(call.id, call.function.name, call.function.arguments))
            .collect();

        let text = if text.is_empty() && !tool_calls.is_empty() {
            tool_calls
                .iter()
                .map(ToolCall::render)
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            text
        };

        let mut response = Response::text(text);
        if !tool_calls.is_empty() {
            response = response.with_tool_calls(tool_calls);
        }
        if let Some(usage) = parsed.usage.as_ref() {
            response = response.with_usage(usage_from_wire(usage));
        }
        Ok(response)
    }

    /// Classify one typed stream event. `content-delta` is content,
    /// `stream-end` is terminal (usage rides inside its delta), and the
    /// start/stop bookkeeping events are skipped.
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
        let delta = frame.delta.unwrap_or(Value::Null);

        match frame.frame_type.as_str() {
            "content-delta" => {
                let text = delta["message"]["content"]["text"]
                    .as_str()
                    .unwrap_or_default();
                if text.is_empty() {
                    Ok(StreamEvent::Skip)
                } else {
                    Ok(StreamEvent::Content(Response::text(text)))
                }
            }
            "tool-call-start" => {
                let call = &delta["message"]["tool_calls"];
                let fragment = ToolCall::function(
                    call["id"].as_str().unwrap_or_default(),
                    call["function"]["name"].as_str().unwrap_or_default(),
                    "",
                );
                Ok(StreamEvent::Content(
                    Response::text("").with_tool_calls(vec![fragment]),
                ))
            }
            "tool-call-delta" => {
                let arguments = delta["message"]["tool_calls"]["function"]["arguments"]
                    .as_str()
                    .unwrap_or_default();
                if arguments.is_empty() {
                    return Ok(StreamEvent::Skip);
                }
                let fragment = ToolCall::function("", "", arguments);
                Ok(StreamEvent::Content(
                    Response::text("").with_tool_calls(vec![fragment]),
                ))
            }
            "stream-end" => {
                let usage = serde_json::from_value::<WireUsage>(delta["usage"].clone())
                    .ok()
                    .map(|wire| usage_from_wire(&wire));
                Ok(StreamEvent::done_with_usage(usage))
            }
            // message-start, content-start, content-end, tool-plan-delta, ..
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
    Ok(Box::new(CohereTranslator::new(params, config, capabilities)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn translator() -> CohereTranslator {
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        CohereTranslator::new(
            ProviderParams::new(Some("test-key"), "command-r-plus"),
            &ProviderConfig::default(),
            &capabilities,
        )
        .unwrap()
    }

    #[test]
    fn sampling_params_use_cohere_spelling() {
        let options = RequestOptions::default().with_top_p(0.9);
        let request = Request::new(vec![Message::user("hi")]).with_options(options);
        let body: Value =
            serde_json::from_slice(&translator().prepare_request(&request).unwrap()).unwrap();
        assert_eq!(body["p"], json!(0.9));
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn all_four_roles_pass_through() {
        let request = Request::new(vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::tool_result("call_1", "42"),
        ]);
        let body: Value =
            serde_json::from_slice(&translator().prepare_request(&request).unwrap()).unwrap();
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
    }

    #[test]
    fn schema_rides_inside_json_object_format() {
        let request = Request::new(vec![Message::user("hi")])
            .with_schema(json!({"type": "object", "properties": {"x": {"type": "number"}}}));
        let body: Value =
            serde_json::from_slice(&translator().prepare_request(&request).unwrap()).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(
            body["response_format"]["schema"]["additionalProperties"],
            json!(false)
        );
    }

    #[test]
    fn usage_reads_nested_token_counts() {
        let body = br#"{
            "message": {"role": "assistant", "content": [{"type": "text", "text": "Paris"}]},
            "usage": {"tokens": {"input_tokens": 12.0, "output_tokens": 4.0}}
        }"#;
        let response = translator().parse_response(body).unwrap();
        assert_eq!(response.as_text(), "Paris");
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 4);
    }

    #[test]
    fn fractional_token_counts_round_instead_of_truncating() {
        let body = br#"{
            "message": {"role": "assistant", "content": [{"type": "text", "text": "ok"}]},
            "usage": {"tokens": {"input_tokens": 12.6, "output_tokens": -3.0}}
        }"#;
        let usage = translator().parse_response(body).unwrap().usage.unwrap();
        assert_eq!(usage.input_tokens, 13);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn string_message_body_is_a_vendor_error() {
        let body = br#"{"message": "invalid api token"}"#;
        let err = translator().parse_response(body).unwrap_err();
        assert!(matches!(err, LlmError::ApiError { provider: "cohere", .. }));
    }

    #[test]
    fn stream_end_carries_usage() {
        let chunk = br#"{"type": "stream-end", "delta": {"finish_reason": "COMPLETE", "usage": {"tokens": {"input_tokens": 10.0, "output_tokens": 2.0}}}}"#;
        match translator().parse_stream_response(chunk).unwrap() {
            StreamEvent::Done { usage, .. } => assert_eq!(usage.unwrap().input_tokens, 10),
            other => panic!("expected terminal, got {other:?}"),
        }
    }

    #[test]
    fn content_delta_is_content() {
        let chunk = br#"{"type": "content-delta", "index": 0, "delta": {"message": {"content": {"text": "Par"}}}}"#;
        match translator().parse_stream_response(chunk).unwrap() {
            StreamEvent::Content(response) => assert_eq!(response.as_text(), "Par"),
            other => panic!("expected content, got {other:?}"),
        }
    }
}
