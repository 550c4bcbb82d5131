//! Request options: typed common parameters plus a vendor passthrough bag
//!
//! Three layers fold together at request-build time: call-time options win
//! over the translator's persisted defaults, which win over built-in
//! defaults. [`RequestOptions::layered`] implements the fold.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name - must be unique within a request
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    pub parameters: serde_json::Value,
}

/// Tool choice strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ToolChoice {
    /// Let the model decide whether and which tools to use
    #[default]
    Auto,
    /// Don't use any tools
    None,
    /// Must use at least one tool
    Required,
    /// Use a specific tool by name
    Specific(String),
}

/// Generation parameters recognized across vendors
///
/// Common fields are typed; anything vendor-specific goes through `extra`
/// and is spliced into the outbound JSON verbatim by the translator that
/// owns it. `None` means "not set at this layer", letting lower layers
/// supply the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestOptions {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Top-p nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Presence penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Frequency penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Sampling seed, where the vendor supports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Tool choice strategy, only meaningful when `tools` is non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Vendor-specific extras, spliced into the outbound body verbatim.
    ///
    /// Keys here are the vendor's own field names. Translators skip keys
    /// they already emit from typed fields so the pair can never conflict.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RequestOptions {
    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set top-p
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the tools the model may call
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Add a vendor-specific passthrough option
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Fold call-time options over persisted defaults.
    ///
    /// Every typed field takes the call-time value when present, otherwise
    /// the default. Passthrough extras merge key-wise with call-time keys
    /// winning.
    pub fn layered(call: &RequestOptions, defaults: &RequestOptions) -> RequestOptions {
        let mut extra = defaults.extra.clone();
        extra.extend(call.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        RequestOptions {
            temperature: call.temperature.or(defaults.temperature),
            max_tokens: call.max_tokens.or(defaults.max_tokens),
            top_p: call.top_p.or(defaults.top_p),
            top_k: call.top_k.or(defaults.top_k),
            presence_penalty: call.presence_penalty.or(defaults.presence_penalty),
            frequency_penalty: call.frequency_penalty.or(defaults.frequency_penalty),
            stop: call.stop.clone().or_else(|| defaults.stop.clone()),
            seed: call.seed.or(defaults.seed),
            tools: if call.tools.is_empty() {
                defaults.tools.clone()
            } else {
                call.tools.clone()
            },
            tool_choice: call
                .tool_choice
                .clone()
                .or_else(|| defaults.tool_choice.clone()),
            extra,
        }
    }
}
