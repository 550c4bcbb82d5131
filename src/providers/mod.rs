//! Vendor translator implementations
//!
//! One module per vendor. The OpenAI-compatible family (OpenAI, DeepSeek,
//! Groq, OpenRouter, vLLM, generic) shares the wire layer in
//! [`openai_compat`] and differs only in dialect knobs; Anthropic, Cohere,
//! Gemini and Ollama each speak their own native wire format.

pub mod anthropic;
pub mod cohere;
pub mod deepseek;
pub mod gemini;
pub mod generic;
pub mod groq;
pub mod ollama;
pub mod openai;
pub mod openai_compat;
pub mod openrouter;
pub mod vllm;
