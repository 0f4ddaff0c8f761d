//! The socket wire envelope: `{type, payload}` where `type`
//! is one of `methodCall`, `methodCallResult`, `callbackCall`,
//! `callbackResult`, `getVersion`, `setHttpCookieSessionAndSecurityProperties`,
//! `downCallError`.

use serde::{Deserialize, Serialize};

use crate::codec::ExtValue;

pub type CallId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub call_id: CallId,
    pub server_session_class_id: String,
    pub method_name: String,
    pub args: Vec<ExtValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCallResult {
    pub call_id: CallId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
    pub http_status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackCall {
    pub call_id: CallId,
    pub callback_id: u64,
    pub args: Vec<ExtValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResult {
    pub call_id: CallId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// Errors crossing the socket carry `{message, name, stack?, cause?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    pub message: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetVersion {
    pub known_minor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetHttpCookieSessionAndSecurityProperties {
    /// A signed and encrypted token binding this socket to an HTTP-derived
    /// security context; opaque to the wire format.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownCallError {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Envelope {
    #[serde(rename = "methodCall")]
    MethodCall(MethodCall),
    #[serde(rename = "methodCallResult")]
    MethodCallResult(MethodCallResult),
    #[serde(rename = "callbackCall")]
    CallbackCall(CallbackCall),
    #[serde(rename = "callbackResult")]
    CallbackResult(CallbackResult),
    #[serde(rename = "getVersion")]
    GetVersion(GetVersion),
    #[serde(rename = "setHttpCookieSessionAndSecurityProperties")]
    SetHttpCookieSessionAndSecurityProperties(SetHttpCookieSessionAndSecurityProperties),
    #[serde(rename = "downCallError")]
    DownCallError(DownCallError),
}

/// A raw `"[Error] <message>"` control frame, distinct from the tagged JSON
/// [`Envelope`] frames.
pub const FATAL_FRAME_PREFIX: &str = "[Error] ";

pub fn fatal_frame(message: &str) -> String {
    format!("{FATAL_FRAME_PREFIX}{message}")
}

pub fn as_fatal_message(frame: &str) -> Option<&str> {
    frame.strip_prefix(FATAL_FRAME_PREFIX)
}
