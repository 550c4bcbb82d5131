//! The translator trait every vendor backend implements
//!
//! A translator converts between the unified [`Request`]/[`Response`] model
//! and one vendor's wire format. It holds only configuration (API key,
//! model, persisted default options) and is reused across calls; everything
//! it produces or consumes is a call-scoped value.
//!
//! The contract is bytes in, bytes out: `prepare_request` yields the body a
//! transport layer POSTs to [`Translator::endpoint`] with
//! [`Translator::headers`]; the response bytes come back through
//! `parse_response` or, chunk by chunk, `parse_stream_response`. HTTP verbs,
//! TLS, retries and timeouts live entirely in the caller's transport.
//!
//! A translator instance is safe to share for read-style calls, but
//! `set_default_options` must not race `prepare_request`; callers needing
//! concurrent mutation construct one instance per call via the provider
//! registry.

use crate::error::LlmResult;
use crate::message::Request;
use crate::options::RequestOptions;
use crate::response::Response;
use crate::stream::StreamEvent;

/// Converts between the unified model and one vendor's wire format
pub trait Translator: Send + Sync {
    /// Vendor name, for logging and registry lookups
    fn name(&self) -> &'static str;

    /// Full URL for non-streaming requests
    fn endpoint(&self) -> String;

    /// Full URL for streaming requests; most vendors reuse the endpoint and
    /// flag streaming in the body
    fn stream_endpoint(&self) -> String {
        self.endpoint()
    }

    /// HTTP headers for the exchange, including auth and any extra headers
    /// supplied at construction
    fn headers(&self) -> LlmResult<Vec<(String, String)>>;

    /// Build the vendor JSON body for a non-streaming exchange.
    ///
    /// Role mapping, option layering (call-time over persisted defaults over
    /// built-ins), capability checks and schema sanitizing all happen here;
    /// no invalid field ever reaches the wire.
    fn prepare_request(&self, request: &Request) -> LlmResult<Vec<u8>>;

    /// Build the vendor JSON body for a streaming exchange.
    ///
    /// Fails with [`crate::LlmError::UnsupportedCapability`] when the model
    /// cannot stream, rather than silently sending a non-streaming request.
    fn prepare_stream_request(&self, request: &Request) -> LlmResult<Vec<u8>>;

    /// Decode a complete vendor response body.
    ///
    /// Distinguishes a vendor-reported API error (an error) from an
    /// empty-but-valid response (an empty [`Response`]) from a response
    /// containing only tool calls (tool calls preserved in order, content
    /// rendered deterministically).
    fn parse_response(&self, body: &[u8]) -> LlmResult<Response>;

    /// Decode one framing unit of the vendor's streaming protocol.
    ///
    /// Chunks must be fed in arrival order. The three-way outcome contract
    /// is documented on [`StreamEvent`].
    fn parse_stream_response(&self, chunk: &[u8]) -> LlmResult<StreamEvent>;

    /// Replace the persisted default options folded under every call's
    /// options. Not safe to race with `prepare_request`.
    fn set_default_options(&mut self, options: RequestOptions);
}
