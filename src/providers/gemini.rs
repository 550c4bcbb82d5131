//! Gemini translator (generateContent API)
//!
//! The furthest wire format from the chat-completions dialect. Quirks
//! handled here: `assistant` becomes role `model` and tool results ride
//! in role `function`; the system prompt is lifted to `systemInstruction`;
//! generation parameters nest under `generationConfig`; tool calls carry a
//! name but no id, so ids are synthesized from the name; streams have no
//! `[DONE]` sentinel and end on a frame bearing `finishReason`.

use crate::capability::{Capability, CapabilityRegistry};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use crate::message::{Message, Request, Role, ToolCall};
use crate::options::RequestOptions;
use crate::registry::{ProviderConfig, ProviderParams};
use crate::response::{Response, Usage};
use crate::schema::SchemaSanitizer;
use crate::stream::StreamEvent;
use crate::translator::Translator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Value>,
    contents: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<Value>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCallPart>,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionCallPart {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
}

impl From<&UsageMetadata> for Usage {
    fn from(meta: &UsageMetadata) -> Self {
        Usage {
            input_tokens: meta.prompt_token_count,
            cached_input_tokens: meta.cached_content_token_count,
            output_tokens: meta.candidates_token_count,
            cached_output_tokens: 0,
            reasoning_tokens: meta.thoughts_token_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Translator for Google's Gemini generateContent API
pub struct GeminiTranslator {
    api_key: String,
    base_url: String,
    model: String,
    extra_headers: Vec<(String, String)>,
    defaults: RequestOptions,
    capabilities: Arc<CapabilityRegistry>,
    sanitizer: SchemaSanitizer,
}

impl GeminiTranslator {
    pub fn new(
        params: ProviderParams,
        config: &ProviderConfig,
        capabilities: &Arc<CapabilityRegistry>,
    ) -> LlmResult<Self> {
        if params.model.is_empty() {
            return Err(LlmError::configuration_error(
                "gemini translator requires a model identifier",
            ));
        }
        let api_key = params
            .api_key
            .ok_or_else(|| LlmError::configuration_error("gemini translator requires an API key"))?;

        Ok(GeminiTranslator {
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
            sanitizer: SchemaSanitizer::with_extra_keys(&["description", "enum", "nullable"]),
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

    /// Role remap: assistant turns become `model`, tool results become
    /// `function` parts. System messages were lifted out before this runs.
    fn wire_content(message: &Message) -> LlmResult<Option<Value>> {
        match message.role {
            Role::System => Ok(None),
            Role::User => Ok(Some(json!({
                "role": "user",
                "parts": [{"text": message.content}],
            }))),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(json!({"text": message.content}));
                }
                for call in message.tool_calls.iter().flatten() {
                    let args: Value =
                        serde_json::from_str(&call.function.arguments).map_err(|err| {
                            LlmError::malformed_request(format!(
                                "tool call '{}' has non-JSON arguments: {err}",
                                call.function.name
                            ))
                        })?;
                    parts.push(json!({
                        "functionCall": {"name": call.function.name, "args": args},
                    }));
                }
                if parts.is_empty() {
                    return Ok(None);
                }
                Ok(Some(json!({"role": "model", "parts": parts})))
            }
            Role::Tool => {
                // Gemini addresses results by function name; our ids are
                // synthesized from the name on the way in, so the id maps
                // straight back.
                let name = message
                    .tool_call_id
                    .clone()
                    .ok_or_else(|| {
                        LlmError::malformed_request("tool result message is missing tool_call_id")
                    })?;
                Ok(Some(json!({
                    "role": "function",
                    "parts": [{
                        "functionResponse": {
                            "name": name,
                            "response": {"content": message.content},
                        },
                    }],
                })))
            }
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
        if !opts.extra.is_empty() {
            log_warn!(
                provider = PROVIDER,
                keys = ?opts.extra.keys().collect::<Vec<_>>(),
                "Gemini request body has no passthrough section; dropping extra options"
            );
        }

        let system_instruction = {
            let mut parts: Vec<&str> = Vec::new();
            if let Some(prompt) = &request.system_prompt {
                parts.push(prompt);
            }
            parts.extend(
                request
                    .messages
                    .iter()
                    .filter(|m| m.role == Role::System)
                    .map(|m| m.content.as_str()),
            );
            (!parts.is_empty()).then(|| json!({"parts": [{"text": parts.join("\n\n")}]}))
        };

        let mut contents = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            if let Some(content) = Self::wire_content(message)? {
                contents.push(content);
            }
        }
        if contents.is_empty() {
            return Err(LlmError::malformed_request("gemini request has no contents"));
        }

        let tools = (!opts.tools.is_empty()).then(|| {
            json!([{
                "functionDeclarations": opts.tools.iter().map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": self.sanitizer.sanitize(&tool.parameters),
                    })
                }).collect::<Vec<_>>(),
            }])
        });
        let tool_config = opts.tool_choice.as_ref().map(|choice| {
            let mode = match choice {
                crate::options::ToolChoice::Auto => json!({"mode": "AUTO"}),
                crate::options::ToolChoice::None => json!({"mode": "NONE"}),
                crate::options::ToolChoice::Required => json!({"mode": "ANY"}),
                crate::options::ToolChoice::Specific(name) => {
                    json!({"mode": "ANY", "allowedFunctionNames": [name]})
                }
            };
            json!({"functionCallingConfig": mode})
        });

        let (response_mime_type, response_schema) = match &request.response_schema {
            Some(schema) => (
                Some("application/json".to_string()),
                Some(self.sanitizer.sanitize(schema)),
            ),
            None => (None, None),
        };

        let body = GenerateRequest {
            system_instruction,
            contents,
            tools,
            tool_config,
            generation_config: GenerationConfig {
                temperature: opts.temperature,
                max_output_tokens: opts.max_tokens,
                top_p: opts.top_p,
                top_k: opts.top_k,
                stop_sequences: opts.stop.clone(),
                seed: opts.seed,
                response_mime_type,
                response_schema,
            },
        };

        log_debug!(
            provider = PROVIDER,
            model = %self.model,
            content_count = body.contents.len(),
            stream = stream,
            "Encoded generateContent request"
        );
        serde_json::to_vec(&body)
            .map_err(|err| LlmError::malformed_request(format!("request encoding failed: {err}")))
    }

    fn response_from_candidate(candidate: Candidate) -> Response {
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        for part in parts {
            if let Some(text) = part.text {
                text_parts.push(text);
            }
            if let Some(call) = part.function_call {
                // No id on the wire; the name doubles as the id
                tool_calls.push(ToolCall::function(
                    call.name.clone(),
                    call.name,
                    call.args.to_string(),
                ));
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

impl Translator for GeminiTranslator {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn stream_endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn headers(&self) -> LlmResult<Vec<(String, String)>> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("x-goog-api-key".to_string(), self.api_key.clone()),
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
        let parsed: GenerateResponse = serde_json::from_slice(body).map_err(|err| {
            LlmError::response_parsing_error(format!("gemini response is not valid JSON: {err}"))
        })?;

        if let Some(error) = parsed.error {
            return Err(LlmError::api_error(PROVIDER, error.message));
        }
        if let Some(feedback) = parsed.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                return Err(LlmError::api_error(
                    PROVIDER,
                    format!("prompt blocked: {reason}"),
                ));
            }
        }

        let usage = parsed.usage_metadata.as_ref().map(Into::into);
        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Err(LlmError::response_parsing_error(
                "gemini response carries zero candidates",
            ));
        };

        let mut response = Self::response_from_candidate(candidate);
        if let Some(usage) = usage {
            response = response.with_usage(usage);
        }
        Ok(response)
    }

    /// Classify one SSE payload. There is no `[DONE]` sentinel:
    /// `finishReason` on the candidate is the termination marker. The API
    /// bundles the last text fragment and final usage metadata into that
    /// same frame, so the terminal event carries both.
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

        let frame: GenerateResponse = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!(provider = PROVIDER, error = %err, "Skipping malformed stream frame");
                return Ok(StreamEvent::Skip);
            }
        };

        if let Some(error) = frame.error {
            return Err(LlmError::api_error(PROVIDER, error.message));
        }

        let usage = frame.usage_metadata.as_ref().map(Into::into);
        let Some(candidate) = frame.candidates.into_iter().next() else {
            return Ok(StreamEvent::Skip);
        };
        let finish_reason = candidate.finish_reason.clone();
        let response = Self::response_from_candidate(candidate);
        let has_content = !response.as_text().is_empty() || !response.tool_calls.is_empty();

        if finish_reason.is_some() {
            return Ok(StreamEvent::Done {
                usage,
                content: has_content.then_some(response),
            });
        }
        if has_content {
            let response = match usage {
                Some(usage) => response.with_usage(usage),
                None => response,
            };
            return Ok(StreamEvent::Content(response));
        }
        Ok(StreamEvent::Skip)
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
    Ok(Box::new(GeminiTranslator::new(params, config, capabilities)?))
}
