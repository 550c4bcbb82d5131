//! # llm-bridge
//!
//! Unified request/response model and wire-format translation layer for
//! OpenAI, Anthropic, Cohere, Gemini, DeepSeek, Groq, Ollama, OpenRouter,
//! vLLM and generic OpenAI-compatible APIs.
//!
//! ## Key Features
//!
//! - **One data model**: provider-agnostic [`Request`]/[`Response`] types with
//!   tool calling, caching hints and structured-output schemas
//! - **Bytes in, bytes out**: translators build vendor JSON and parse vendor
//!   responses; HTTP execution stays in your transport layer
//! - **Capability registry**: per (vendor, model) feature lookup so requests
//!   never carry fields a model rejects
//! - **Streaming**: SSE and newline-delimited JSON chunk parsing with a
//!   three-way content/skip/done outcome per chunk
//! - **Schema sanitizer**: makes caller JSON Schemas portable across each
//!   vendor's restricted structured-output dialect
//!
//! ## Example
//!
//! ```rust
//! use llm_bridge::{CapabilityRegistry, Message, ProviderRegistry, Request};
//!
//! # fn example() -> llm_bridge::LlmResult<()> {
//! let registry = ProviderRegistry::with_builtin_providers(CapabilityRegistry::with_defaults());
//! let translator = registry.get("openai", Some("sk-test"), "gpt-4o", &[])?;
//!
//! let request = Request::new(vec![Message::user("Hello, how are you?")])
//!     .with_system_prompt("Be terse");
//! let body = translator.prepare_request(&request)?;
//! // POST `body` to translator.endpoint() with translator.headers()?,
//! // then feed the response bytes to translator.parse_response(..).
//! # Ok(())
//! # }
//! ```

// Allow missing errors documentation - errors are self-documenting via type signatures
#![allow(clippy::missing_errors_doc)]

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub mod capability;
pub mod error;
pub mod message;
pub mod options;
pub mod providers;
pub mod registry;
pub mod response;
pub mod schema;
pub mod stream;
pub mod translator;

#[cfg(test)]
pub mod tests;

// Re-export main types
pub use capability::{Capability, CapabilityRegistry, CapabilitySet};
pub use error::{LlmError, LlmResult};
pub use message::{CacheHint, FunctionCall, Message, Request, Role, ToolCall, ToolCallKind};
pub use options::{RequestOptions, ToolChoice, ToolDefinition};
pub use registry::{ProviderConfig, ProviderParams, ProviderRegistry};
pub use response::{Content, Response, Usage};
pub use schema::{SchemaSanitizer, SchemaSource};
pub use stream::{JsonLinesDecoder, SseDecoder, StreamEvent};
pub use translator::Translator;
