//! SocketConnection: the bidirectional message multiplexer over one
//! persistent transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::RngCore;
use tokio::sync::mpsc;

use remotecore::call_context::{CallContext, Transport};
use remotecore::error::{Error, Result};
use remotecore::registry::RemoteMethodRegistry;
use remotecore::security::group::SecurityGroupRegistry;
use remotecore::security::guard::{self, MethodFacts};
use remotecore::security::request::SecurityPropertiesOfHttpRequest;
use remotecore::security::token_kind::TokenKindIssuer;
use remotecore::session::view::SessionView;
use remotecore::session::CookieSession;
use remotecore::token::TokenBox;

use crate::bridge::{AccessProofGranularity, BridgePayload, SocketId, TokenBridge};
use crate::callback::CallbackRegistry;
use crate::codec::ExtValue;
use crate::message::{CallbackCall, Envelope, MethodCall, MethodCallResult, RemoteError};
use crate::single_retry::SingleRetryableOperation;

fn fresh_socket_id() -> SocketId {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    SocketId(bytes)
}

/// Per-connection cached security context, refreshed via [`TokenBridge`]
/// and guarded by this mutex as the sole piece of shared mutable state a
/// connection owns besides its callback table.
struct SecurityContextCache {
    security: SecurityPropertiesOfHttpRequest,
    session: CookieSession,
}

/// One persistent bidirectional connection. Owns the socket's identity,
/// its cached security context, its callback table, and the
/// dedup primitives for its bootstrap fetches.
pub struct SocketConnection {
    pub id: SocketId,
    registry: Arc<RemoteMethodRegistry>,
    groups: Arc<SecurityGroupRegistry>,
    token_box: Arc<TokenBox>,
    context: Mutex<Option<SecurityContextCache>>,
    callbacks: Arc<CallbackRegistry>,
    next_call_id: AtomicU64,
    granularity: AccessProofGranularity,
    pub welcome_fetch: SingleRetryableOperation<()>,
    pub cors_read_token_fetch: SingleRetryableOperation<()>,
    outbound: mpsc::UnboundedSender<String>,
}

impl SocketConnection {
    pub fn new(
        registry: Arc<RemoteMethodRegistry>,
        groups: Arc<SecurityGroupRegistry>,
        token_box: Arc<TokenBox>,
        outbound: mpsc::UnboundedSender<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<crate::callback::CallbackFreed>, mpsc::UnboundedReceiver<CallbackCall>) {
        let (call_tx, call_rx) = mpsc::unbounded_channel();
        let (callbacks, freed_rx) = CallbackRegistry::new(call_tx);

        let connection = Arc::new(SocketConnection {
            id: fresh_socket_id(),
            registry,
            groups,
            token_box,
            context: Mutex::new(None),
            callbacks,
            next_call_id: AtomicU64::new(1),
            granularity: AccessProofGranularity::default(),
            welcome_fetch: SingleRetryableOperation::new(),
            cors_read_token_fetch: SingleRetryableOperation::new(),
            outbound,
        });

        (connection, freed_rx, call_rx)
    }

    pub fn next_call_id(&self) -> u64 {
        self.next_call_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Per-class vs per-group cache granularity currently in effect.
    pub fn access_proof_granularity(&self) -> AccessProofGranularity {
        self.granularity
    }

    /// Accepts a bridge token sent over this socket, installing its payload
    /// as the connection's security context.
    pub fn accept_bridge_token(&self, token: &remotecore::token::Token) -> Result<()> {
        let bridge = TokenBridge::new(&self.token_box);
        let BridgePayload { security, session, .. } = bridge.accept(token, self.id)?;
        *self.context.lock() = Some(SecurityContextCache { security, session });
        Ok(())
    }

    fn cached_context(&self) -> Result<(SecurityPropertiesOfHttpRequest, CookieSession)> {
        let guard = self.context.lock();
        let cache = guard.as_ref().ok_or(Error::TransportFatal(
            "no security context has been bridged onto this socket yet".into(),
        ))?;
        Ok((cache.security.clone(), cache.session.clone()))
    }

    fn send_frame(&self, frame: String) -> Result<()> {
        self.outbound.send(frame).map_err(|_| Error::TransportFatal("outbound channel closed".into()))
    }

    fn send_envelope(&self, envelope: Envelope) -> Result<()> {
        let frame = serde_json::to_string(&envelope)
            .map_err(|e| Error::TransportFatal(format!("failed to encode outbound frame: {e}")))?;
        self.send_frame(frame)
    }

    /// Sends the fatal `"[Error] <message>"` control frame and signals the
    /// caller to close the connection.
    pub fn fail_fatally(&self, message: &str) -> Result<()> {
        self.send_frame(crate::message::fatal_frame(message))
    }

    /// Handles one inbound `methodCall`: derives the effective session, runs
    /// the cross-origin decision procedure with the socket's cached security
    /// context, invokes the method, and replies with
    /// `{callId, result | error, httpStatusCode}`.
    pub async fn handle_method_call(&self, call: MethodCall) -> Result<()> {
        let method = match self.registry.resolve(&call.method_name) {
            Ok(m) => m,
            Err(e) => return self.reply_error(call.call_id, e.into()),
        };

        if method.has_byte_stream_param() {
            return self.reply_error(call.call_id, Error::TransportFatal(
                "byte-stream/buffer parameters cannot be bound over a socket".into(),
            ));
        }

        let (security, session_snapshot) = match self.cached_context() {
            Ok(v) => v,
            Err(e) => return self.reply_error(call.call_id, e),
        };

        // A GET to a non-safe method is never executed, regardless of
        // origin, mirroring the HTTP dispatcher's pre-invocation gate.
        if security.method.eq_ignore_ascii_case("GET") && !method.options.is_safe {
            return self.reply_error(call.call_id, Error::SecurityDenied {
                reason: "GET may only invoke a method marked safe",
            });
        }

        let options = match self.groups.get(method.security_group) {
            Some(o) => o,
            None => return self.reply_error(call.call_id, Error::SecurityDenied { reason: "unknown security group" }),
        };

        let view = SessionView::new(session_snapshot);
        let issuer = TokenKindIssuer::new(&self.token_box);
        let facts = MethodFacts { is_safe: method.options.is_safe, is_cors_read_token_bootstrap: false };

        let decision = guard::decide(&security, &view, method.security_group, &options, &issuer, None, None, &facts);
        if !decision.is_allowed() {
            return self.reply_error(call.call_id, Error::SecurityDenied { reason: "csrf guard denied socket call" });
        }

        let args: Vec<serde_json::Value> = call.args.iter().map(ext_to_json).collect();
        let ctx = CallContext::new(
            Transport::Socket { connection_id: u128::from_be_bytes(self.id.0) },
            security,
            view,
            method.security_group,
            method.name.clone(),
        );

        match (method.handler)(ctx, args).await {
            Ok(result) => self.send_envelope(Envelope::MethodCallResult(MethodCallResult {
                call_id: call.call_id,
                result: Some(ExtValue::from(result)),
                error: None,
                http_status_code: 200,
            })),
            Err(e) => self.reply_error(call.call_id, e),
        }
    }

    fn reply_error(&self, call_id: u64, error: Error) -> Result<()> {
        let status = error.status_code().as_u16();
        let remote_error = RemoteError {
            message: error.to_string(),
            name: "Error".into(),
            stack: None,
            cause: None,
        };

        self.send_envelope(Envelope::MethodCallResult(MethodCallResult {
            call_id,
            result: None,
            error: Some(remote_error),
            http_status_code: status,
        }))
    }
}

fn ext_to_json(value: &ExtValue) -> serde_json::Value {
    match value {
        ExtValue::Null | ExtValue::Undefined => serde_json::Value::Null,
        ExtValue::Bool(b) => serde_json::Value::Bool(*b),
        ExtValue::Number(n) => serde_json::Number::from_f64(*n).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
        ExtValue::String(s) | ExtValue::BigInt(s) | ExtValue::Date(s) => serde_json::Value::String(s.clone()),
        ExtValue::Array(items) => serde_json::Value::Array(items.iter().map(ext_to_json).collect()),
        ExtValue::Object(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), ext_to_json(v))).collect()),
    }
}
