//! Provider registry: maps vendor names to translator constructors
//!
//! The registry holds constructor functions, not live translators. Every
//! [`ProviderRegistry::get`] call builds a fresh translator from the caller's
//! credentials plus whatever persisted [`ProviderConfig`] was registered for
//! that vendor, so concurrent callers never share mutable state.

use crate::capability::CapabilityRegistry;
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use crate::options::RequestOptions;
use crate::providers;
use crate::translator::Translator;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-call construction parameters for a translator
#[derive(Debug, Clone, Default)]
pub struct ProviderParams {
    /// API key, omitted for local deployments (Ollama, vLLM)
    pub api_key: Option<String>,
    /// Model identifier as the vendor spells it
    pub model: String,
    /// Extra headers appended after the vendor's own auth headers
    pub extra_headers: Vec<(String, String)>,
}

impl ProviderParams {
    pub fn new(api_key: Option<&str>, model: impl Into<String>) -> Self {
        ProviderParams {
            api_key: api_key.map(str::to_owned),
            model: model.into(),
            extra_headers: Vec::new(),
        }
    }
}

/// Persisted per-vendor configuration, applied to every translator built
/// for that vendor
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Base URL override; `None` uses the vendor's public endpoint
    pub base_url: Option<String>,
    /// API version header value, for vendors that require one
    pub api_version: Option<String>,
    /// Default generation options, overridable per request
    pub defaults: RequestOptions,
}

impl ProviderConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_defaults(mut self, defaults: RequestOptions) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Constructor signature registered per vendor name
pub type TranslatorConstructor =
    fn(ProviderParams, &ProviderConfig, &Arc<CapabilityRegistry>) -> LlmResult<Box<dyn Translator>>;

struct RegistryEntry {
    constructor: TranslatorConstructor,
    config: ProviderConfig,
}

/// Thread-safe registry of translator constructors
///
/// Lookups clone nothing heavier than the vendor's `ProviderConfig`; the
/// capability registry is shared behind an [`Arc`] by every translator
/// the registry builds.
pub struct ProviderRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
    capabilities: Arc<CapabilityRegistry>,
}

impl ProviderRegistry {
    /// Create an empty registry backed by the given capability table
    pub fn new(capabilities: CapabilityRegistry) -> Self {
        ProviderRegistry {
            entries: RwLock::new(HashMap::new()),
            capabilities: Arc::new(capabilities),
        }
    }

    /// Create a registry with every built-in vendor registered
    pub fn with_builtin_providers(capabilities: CapabilityRegistry) -> Self {
        let registry = Self::new(capabilities);
        registry.register("openai", providers::openai::construct);
        registry.register("anthropic", providers::anthropic::construct);
        registry.register("cohere", providers::cohere::construct);
        registry.register("gemini", providers::gemini::construct);
        registry.register("deepseek", providers::deepseek::construct);
        registry.register("groq", providers::groq::construct);
        registry.register("ollama", providers::ollama::construct);
        registry.register("openrouter", providers::openrouter::construct);
        registry.register("vllm", providers::vllm::construct);
        registry.register("generic", providers::generic::construct);
        registry
    }

    /// Register or replace a vendor constructor under `name`
    pub fn register(&self, name: impl Into<String>, constructor: TranslatorConstructor) {
        let name = name.into();
        log_debug!(provider = %name, "Registering provider constructor");
        self.entries.write().insert(
            name,
            RegistryEntry {
                constructor,
                config: ProviderConfig::default(),
            },
        );
    }

    /// Persist configuration for a registered vendor
    ///
    /// Applied to every translator subsequently built via [`get`](Self::get).
    /// Fails with [`LlmError::UnsupportedProvider`] when `name` is unknown.
    pub fn register_config(&self, name: &str, config: ProviderConfig) -> LlmResult<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(name) {
            Some(entry) => {
                entry.config = config;
                Ok(())
            }
            None => Err(LlmError::unsupported_provider(name)),
        }
    }

    /// Build a fresh translator for `name`
    ///
    /// `extra_headers` are appended to the vendor's own headers on every
    /// outbound request the translator describes.
    pub fn get(
        &self,
        name: &str,
        api_key: Option<&str>,
        model: &str,
        extra_headers: &[(String, String)],
    ) -> LlmResult<Box<dyn Translator>> {
        let entries = self.entries.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| LlmError::unsupported_provider(name))?;

        let mut params = ProviderParams::new(api_key, model);
        params.extra_headers = extra_headers.to_vec();
        (entry.constructor)(params, &entry.config, &self.capabilities)
    }

    /// Vendor names currently registered, unordered
    pub fn provider_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// The capability table shared by translators built here
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }
}
