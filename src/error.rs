//! Error types for translation operations.
//!
//! The taxonomy keeps four failure classes strictly apart so callers can
//! route them differently:
//!
//! - **Malformed input**: the caller's request or schema cannot be encoded;
//!   the call fails before any bytes are produced.
//! - **Vendor-reported API error**: the response body carries an explicit
//!   error object; surfaced as [`LlmError::ApiError`] with the vendor's
//!   message, never swallowed into an empty response.
//! - **Unsupported capability**: a feature (streaming, structured response,
//!   function calling) was requested against a model the capability registry
//!   marks as unsupported; reported before request construction instead of
//!   surfacing later as a vendor 4xx.
//! - **Partial/ambiguous response**: the body matches no recognized shape;
//!   reported as [`LlmError::ResponseParsingError`], distinct from a vendor
//!   error, so "the vendor said no" and "we don't understand the vendor"
//!   never blur together.
//!
//! Stream skip vs. stream end are deliberately not errors at all - see
//! [`crate::stream::StreamEvent`].
//!
//! # Result Type
//!
//! Use [`LlmResult<T>`] as a convenient alias for `Result<T, LlmError>`:
//!
//! ```rust
//! use llm_bridge::LlmResult;
//!
//! fn my_function() -> LlmResult<String> {
//!     Ok("Success".to_string())
//! }
//! ```

use crate::capability::Capability;
use crate::logging::{log_error, log_warn};
use thiserror::Error;

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller made a mistake it can fix (unknown provider, bad config,
    /// unencodable request, unsupported feature).
    Client,
    /// The vendor rejected the exchange or answered unintelligibly.
    External,
}

/// Convenient result type for translation operations.
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while building or parsing vendor exchanges.
///
/// Use the constructor methods which log the error as it is created:
///
/// ```rust
/// use llm_bridge::LlmError;
///
/// let err = LlmError::configuration_error("missing API key");
/// let err = LlmError::api_error("openai", "model overloaded");
/// ```
#[derive(Error, Debug)]
pub enum LlmError {
    /// The specified provider name is not registered.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider {
        /// The provider name that was requested.
        provider: String,
    },

    /// Provider configuration is invalid or incomplete (missing API key,
    /// malformed base URL, bad header value).
    #[error("Provider configuration error: {message}")]
    ConfigurationError { message: String },

    /// The caller's request cannot be encoded for the vendor at all.
    ///
    /// Reported before any bytes are produced.
    #[error("Malformed request: {message}")]
    MalformedRequest { message: String },

    /// The vendor's response body carries an explicit error object.
    #[error("{provider} API error: {message}")]
    ApiError {
        /// Which vendor reported the error.
        provider: &'static str,
        /// The vendor's own error message, verbatim.
        message: String,
    },

    /// The response matches neither the expected shape nor a recognized
    /// vendor error. Distinct from [`Self::ApiError`] by design.
    #[error("Response parsing failed: {message}")]
    ResponseParsingError { message: String },

    /// A feature was requested against a (vendor, model) pair whose
    /// capability set does not include it.
    #[error("{provider} model {model} does not support {capability}")]
    UnsupportedCapability {
        provider: &'static str,
        model: String,
        capability: Capability,
    },

    /// A caller-supplied response schema cannot be decoded into any
    /// recognized form.
    #[error("Schema error: {message}")]
    SchemaError { message: String },
}

impl LlmError {
    /// Get the error category for routing decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedProvider { .. }
            | Self::ConfigurationError { .. }
            | Self::MalformedRequest { .. }
            | Self::UnsupportedCapability { .. }
            | Self::SchemaError { .. } => ErrorCategory::Client,
            Self::ApiError { .. } | Self::ResponseParsingError { .. } => ErrorCategory::External,
        }
    }

    /// Whether retrying the same exchange could succeed.
    ///
    /// Only vendor-side failures are retryable; every client-category error
    /// will fail identically until the request is fixed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ApiError { .. })
    }

    /// Convert to a message suitable for display to end users.
    ///
    /// Vendor internals and schema details are generalized away.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedProvider { .. } => {
                "The requested AI provider is not supported".to_string()
            }
            Self::ConfigurationError { .. } => {
                "AI service configuration issue. Please check your settings".to_string()
            }
            Self::MalformedRequest { .. } => {
                "The request could not be encoded. Please check its contents".to_string()
            }
            Self::ApiError { provider, .. } => {
                format!("The {provider} service rejected the request")
            }
            Self::ResponseParsingError { .. } => {
                "Received an invalid response from the AI service".to_string()
            }
            Self::UnsupportedCapability { capability, .. } => {
                format!("The selected model does not support {capability}")
            }
            Self::SchemaError { .. } => "The response schema is invalid".to_string(),
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    /// Create an unsupported provider error (logs at ERROR level).
    pub fn unsupported_provider(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        log_error!(
            provider = %provider,
            error_type = "unsupported_provider",
            "Unsupported LLM provider requested"
        );
        Self::UnsupportedProvider { provider }
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Provider configuration validation failed"
        );
        Self::ConfigurationError { message }
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "malformed_request",
            message = %message,
            "Request cannot be encoded for the vendor"
        );
        Self::MalformedRequest { message }
    }

    pub fn api_error(provider: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            provider = provider,
            error_type = "api_error",
            message = %message,
            "Vendor reported an API error"
        );
        Self::ApiError { provider, message }
    }

    pub fn response_parsing_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "response_parsing_error",
            message = %message,
            "Vendor response format invalid"
        );
        Self::ResponseParsingError { message }
    }

    pub fn unsupported_capability(
        provider: &'static str,
        model: impl Into<String>,
        capability: Capability,
    ) -> Self {
        let model = model.into();
        log_warn!(
            provider = provider,
            model = %model,
            capability = %capability,
            error_type = "unsupported_capability",
            "Requested feature outside the model's capability set"
        );
        Self::UnsupportedCapability {
            provider,
            model,
            capability,
        }
    }

    pub fn schema_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "schema_error",
            message = %message,
            "Response schema could not be decoded"
        );
        Self::SchemaError { message }
    }
}
