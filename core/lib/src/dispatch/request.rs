//! The transport-agnostic shape of one inbound HTTP call.
//!
//! Routing and body parsing belong to the embedding HTTP framework; this
//! engine only needs the already-split path/query/body plus the handful of
//! headers the security model reads. An adapter for a concrete framework
//! constructs a `RawHttpCall` from its own request type.

use serde_json::Value;

use crate::security::request::SecurityPropertiesOfHttpRequest;

/// One already-decoded multipart field, buffered here rather than streamed;
/// true lazy streaming is left to the socket/byte-stream parameter path, not
/// the argument-binding grammar.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MultipartPart {
    /// A text-like part (no `file_name`, no binary `content_type`) binds as
    /// a JSON string; anything else binds as a base64-encoded byte buffer
    /// so it still round-trips through the same `Value` pipeline as other
    /// argument sources.
    pub fn as_value(&self) -> Value {
        use base64::Engine;

        if self.file_name.is_none() {
            if let Ok(text) = std::str::from_utf8(&self.bytes) {
                return Value::String(text.to_owned());
            }
        }

        Value::String(base64::engine::general_purpose::STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    FormUrlEncoded(Vec<(String, String)>),
    PlainText(String),
    Octet(Vec<u8>),
    Multipart(Vec<MultipartPart>),
}

/// Everything `bind_arguments` and `CsrfGuard` need about one call, already
/// lifted out of the embedding framework's request type.
#[derive(Debug, Clone)]
pub struct RawHttpCall {
    pub method_name: String,
    /// Path segments after `<basePath>/<methodName>/`.
    pub path_args: Vec<String>,
    /// The raw query string, not yet parsed.
    pub query: String,
    pub body: Body,
    pub security: SecurityPropertiesOfHttpRequest,
    pub presented_csrf_token: Option<String>,
    pub presented_cors_read_token: Option<String>,
}

impl Default for RawHttpCall {
    fn default() -> Self {
        RawHttpCall {
            method_name: String::new(),
            path_args: Vec::new(),
            query: String::new(),
            body: Body::Empty,
            security: SecurityPropertiesOfHttpRequest::default(),
            presented_csrf_token: None,
            presented_cors_read_token: None,
        }
    }
}
