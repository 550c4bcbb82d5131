//! JSON Schema sanitizer for portable structured output
//!
//! Vendors accept different restricted JSON-Schema dialects for structured
//! output, and the strict modes reject schemas carrying keys outside the
//! dialect. The sanitizer recursively reduces an arbitrary schema to a
//! vendor's allow list and closes every object node with
//! `additionalProperties: false`, which several strict modes require and
//! caller schemas commonly omit.
//!
//! The input is never mutated; a fresh tree is produced at every level, so
//! concurrent sanitize calls sharing an input schema are safe.

use crate::error::{LlmError, LlmResult};
use serde_json::{Map, Value};

/// Baseline keys every supported structured-output dialect accepts
pub const BASE_ALLOWED_KEYS: &[&str] = &["type", "properties", "required", "items"];

/// A schema provided in any of the accepted encodings
#[derive(Debug, Clone, Copy)]
pub enum SchemaSource<'a> {
    /// JSON text
    Text(&'a str),
    /// Raw JSON bytes
    Bytes(&'a [u8]),
    /// An already-decoded value
    Value(&'a Value),
}

/// Reduces schemas to the keys a target vendor accepts
#[derive(Debug, Clone)]
pub struct SchemaSanitizer {
    allowed: Vec<String>,
}

impl Default for SchemaSanitizer {
    fn default() -> Self {
        Self::new(BASE_ALLOWED_KEYS)
    }
}

impl SchemaSanitizer {
    /// Create a sanitizer with an explicit allow list
    pub fn new<S: AsRef<str>>(allowed_keys: &[S]) -> Self {
        Self {
            allowed: allowed_keys.iter().map(|k| k.as_ref().to_string()).collect(),
        }
    }

    /// The baseline allow list plus vendor-specific extra keys
    pub fn with_extra_keys<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut allowed: Vec<String> = BASE_ALLOWED_KEYS.iter().map(|k| k.to_string()).collect();
        allowed.extend(extra.iter().map(|k| k.as_ref().to_string()));
        Self { allowed }
    }

    /// Decode a schema from any accepted encoding, then sanitize it.
    ///
    /// Text or bytes that are not valid JSON are a schema error; schemas the
    /// sanitizer cannot process structurally (non-object top level) pass
    /// through unchanged - some vendors accept encodings the sanitizer is
    /// not meant to police.
    pub fn sanitize_source(&self, source: SchemaSource<'_>) -> LlmResult<Value> {
        let decoded: Value = match source {
            SchemaSource::Text(text) => serde_json::from_str(text)
                .map_err(|e| LlmError::schema_error(format!("invalid schema text: {e}")))?,
            SchemaSource::Bytes(bytes) => serde_json::from_slice(bytes)
                .map_err(|e| LlmError::schema_error(format!("invalid schema bytes: {e}")))?,
            SchemaSource::Value(value) => value.clone(),
        };
        Ok(self.sanitize(&decoded))
    }

    /// Sanitize a decoded schema.
    ///
    /// At each object node only allow-listed keys survive; `properties`
    /// values and `items` are sanitized as sub-schemas; object-typed nodes
    /// gain `additionalProperties: false` unconditionally. Non-object input
    /// is passed through unchanged.
    pub fn sanitize(&self, schema: &Value) -> Value {
        match schema {
            Value::Object(node) => Value::Object(self.sanitize_node(node)),
            other => other.clone(),
        }
    }

    fn sanitize_node(&self, node: &Map<String, Value>) -> Map<String, Value> {
        let mut sanitized = Map::new();

        for (key, value) in node {
            if !self.allowed.iter().any(|k| k == key) {
                continue;
            }
            let kept = match key.as_str() {
                "properties" => self.sanitize_properties(value),
                "items" => self.sanitize(value),
                _ => value.clone(),
            };
            sanitized.insert(key.clone(), kept);
        }

        // Strict-schema modes reject object nodes that do not close
        // themselves to extra keys.
        if node.get("type").and_then(Value::as_str) == Some("object") {
            sanitized.insert("additionalProperties".to_string(), Value::Bool(false));
        }

        sanitized
    }

    fn sanitize_properties(&self, properties: &Value) -> Value {
        match properties {
            Value::Object(props) => {
                let sanitized: Map<String, Value> = props
                    .iter()
                    .map(|(name, sub)| (name.clone(), self.sanitize(sub)))
                    .collect();
                Value::Object(sanitized)
            }
            other => other.clone(),
        }
    }
}
