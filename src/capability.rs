//! Capability registry: which features a (vendor, model) pair supports
//!
//! Vendors gate features per model, not per vendor, and change them on their
//! own release schedules. The registry is therefore queryable by (vendor,
//! model): exact pattern match first, then glob-style wildcard patterns in
//! registration order, first match wins. No match yields the empty set -
//! fail-closed, so a translator never emits a `response_format` block or a
//! streaming flag for a model that would reject it.
//!
//! The registry is an explicit value: construct one (usually
//! [`CapabilityRegistry::with_defaults`]) and hand it to the provider
//! registry. There is no process-global instance.

use regex::Regex;
use std::collections::HashMap;

/// A named feature whose availability depends on vendor and model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Incremental response streaming
    Streaming,
    /// Schema-constrained structured output
    StructuredResponse,
    /// Function/tool calling
    FunctionCalling,
}

impl Capability {
    fn bit(self) -> u8 {
        match self {
            Capability::Streaming => 0b001,
            Capability::StructuredResponse => 0b010,
            Capability::FunctionCalling => 0b100,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Streaming => write!(f, "streaming"),
            Capability::StructuredResponse => write!(f, "structured response"),
            Capability::FunctionCalling => write!(f, "function calling"),
        }
    }
}

/// A set of capabilities, cheap to copy and compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set (the fail-closed default for unknown models)
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    /// All currently defined capabilities
    pub fn all() -> Self {
        [
            Capability::Streaming,
            Capability::StructuredResponse,
            Capability::FunctionCalling,
        ]
        .into_iter()
        .collect()
    }

    /// Whether the set contains `capability`
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Add a capability
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Whether no capability is present
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::EMPTY;
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl From<&[Capability]> for CapabilitySet {
    fn from(caps: &[Capability]) -> Self {
        caps.iter().copied().collect()
    }
}

/// One registered wildcard pattern and its feature set
#[derive(Debug, Clone)]
struct WildcardEntry {
    pattern: String,
    matcher: Regex,
    capabilities: CapabilitySet,
}

/// Per-vendor pattern tables
#[derive(Debug, Clone, Default)]
struct VendorTable {
    exact: HashMap<String, CapabilitySet>,
    // registration order is the match order
    wildcards: Vec<WildcardEntry>,
}

/// Declares, per vendor and model pattern, which features are supported
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    vendors: HashMap<String, VendorTable>,
}

impl CapabilityRegistry {
    /// An empty registry: every lookup yields the empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model pattern for a vendor.
    ///
    /// Patterns without `*` are exact: re-registering one replaces its
    /// feature set. Patterns containing `*` are wildcards and accumulate in
    /// registration order.
    pub fn register_model(
        &mut self,
        vendor: impl Into<String>,
        pattern: impl Into<String>,
        capabilities: impl Into<CapabilitySet>,
    ) {
        let vendor = vendor.into();
        let pattern = pattern.into();
        let capabilities = capabilities.into();
        let table = self.vendors.entry(vendor).or_default();

        if pattern.contains('*') {
            table.wildcards.push(WildcardEntry {
                matcher: compile_glob(&pattern),
                pattern,
                capabilities,
            });
        } else {
            table.exact.insert(pattern, capabilities);
        }
    }

    /// Look up the feature set for a (vendor, model) pair.
    ///
    /// Exact match first, then the first matching wildcard in registration
    /// order, else the empty set. An unregistered vendor or model silently
    /// yields the empty set; callers needing hard errors check explicitly.
    pub fn capabilities(&self, vendor: &str, model: &str) -> CapabilitySet {
        let Some(table) = self.vendors.get(vendor) else {
            return CapabilitySet::EMPTY;
        };
        if let Some(set) = table.exact.get(model) {
            return *set;
        }
        table
            .wildcards
            .iter()
            .find(|entry| entry.matcher.is_match(model))
            .map(|entry| entry.capabilities)
            .unwrap_or(CapabilitySet::EMPTY)
    }

    /// Whether the (vendor, model) pair supports `capability`
    pub fn has_capability(&self, vendor: &str, model: &str, capability: Capability) -> bool {
        self.capabilities(vendor, model).contains(capability)
    }

    /// Patterns registered for a vendor, exact entries first then wildcards
    /// in registration order. Useful for diagnostics.
    pub fn registered_patterns(&self, vendor: &str) -> Vec<String> {
        let Some(table) = self.vendors.get(vendor) else {
            return Vec::new();
        };
        let mut patterns: Vec<String> = table.exact.keys().cloned().collect();
        patterns.sort();
        patterns.extend(table.wildcards.iter().map(|e| e.pattern.clone()));
        patterns
    }

    /// The built-in capability table for all supported vendors.
    ///
    /// Wildcards are registered most-specific first since the first match
    /// wins.
    pub fn with_defaults() -> Self {
        use Capability::{FunctionCalling, Streaming, StructuredResponse};
        let full: &[Capability] = &[Streaming, StructuredResponse, FunctionCalling];
        let stream_only: &[Capability] = &[Streaming];

        let mut registry = Self::new();

        // OpenAI: structured output landed with gpt-4o; o-series models
        // stream and call tools but the reasoning tiers reject sampling-era
        // fields, handled in the translator.
        registry.register_model("openai", "gpt-4o*", full);
        registry.register_model("openai", "gpt-4.1*", full);
        registry.register_model("openai", "gpt-5*", full);
        registry.register_model("openai", "o1*", &[StructuredResponse, FunctionCalling][..]);
        registry.register_model("openai", "o3*", full);
        registry.register_model("openai", "o4*", full);
        registry.register_model("openai", "gpt-4*", &[Streaming, FunctionCalling][..]);
        registry.register_model("openai", "gpt-3.5*", &[Streaming, FunctionCalling][..]);

        registry.register_model("anthropic", "claude-*", full);

        registry.register_model("cohere", "command-r*", full);
        registry.register_model("cohere", "command-a*", full);
        registry.register_model("cohere", "command*", stream_only);

        registry.register_model("gemini", "gemini-1.5*", full);
        registry.register_model("gemini", "gemini-2*", full);
        registry.register_model("gemini", "gemini-*", stream_only);

        registry.register_model("deepseek", "deepseek-chat", full);
        registry.register_model(
            "deepseek",
            "deepseek-reasoner",
            &[Streaming, StructuredResponse][..],
        );
        registry.register_model("deepseek", "deepseek-*", stream_only);

        registry.register_model("groq", "*", full);
        registry.register_model("openrouter", "*", full);
        registry.register_model("vllm", "*", full);
        registry.register_model("ollama", "*", full);

        // Generic OpenAI-compatible endpoints vary too much to assume more
        // than streaming; callers register richer sets for known models.
        registry.register_model("generic", "*", stream_only);

        registry
    }
}

/// Compile a glob-style pattern into an anchored regex.
///
/// Only `*` is special (matches any run of characters, including empty);
/// everything else is matched literally.
fn compile_glob(pattern: &str) -> Regex {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for (i, segment) in pattern.split('*').enumerate() {
        if i > 0 {
            source.push_str(".*");
        }
        source.push_str(&regex::escape(segment));
    }
    source.push('$');
    // the escaped source is always a valid pattern
    Regex::new(&source).unwrap_or_else(|_| Regex::new("^$").unwrap())
}
