//! Declarative markers for which methods are remotely callable.
//!
//! Dynamic method dispatch by name becomes an explicit registry keyed by
//! method name to a typed descriptor plus an invocation adaptor. The
//! reflective name-to-method resolver itself — actually calling into a
//! particular language-level method object — is out of scope; what's
//! registered here is a type-erased `Handler` closure the embedder
//! supplies, rather than reflecting into user code.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::security::group::SecurityGroupId;

/// Reserved identifiers that can never be dispatched as a remote method
/// name, regardless of registration.
pub const RESERVED_NAMES: &[&str] = &[
    "doCall", "validateCall", "req", "res", "session", "get", "set",
    "constructor", "prototype", "__proto__",
];

#[derive(Debug, thiserror::Error)]
pub enum MethodLookupError {
    #[error("no remote method named `{0}`")]
    NotFound(String),
    #[error("`{0}` is not marked as a remote method")]
    NotRemote(String),
    #[error("`{0}` is a reserved name and cannot be dispatched")]
    Reserved(String),
}

/// A single parameter of a remote method.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub variadic: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Date,
    BigInt,
    ByteStream,
    Callback,
    Any,
}

/// Per-method options. Options not explicitly set
/// at registration inherit from the declaring class's defaults only — they
/// never inherit across a subclass/superclass boundary, since this registry
/// has no inheritance mechanism at all: a method is remote iff it was
/// explicitly handed to a [`ClassBuilder`] (see module docs).
#[derive(Debug, Copy, Clone)]
pub struct MethodOptions {
    pub is_safe: bool,
    pub validate_arguments: bool,
    pub validate_result: bool,
    pub trim_arguments: bool,
    pub trim_result: bool,
    pub validate_callback_arguments: bool,
    pub validate_callback_result: bool,
}

impl Default for MethodOptions {
    fn default() -> Self {
        MethodOptions {
            is_safe: false,
            validate_arguments: true,
            validate_result: true,
            trim_arguments: false,
            trim_result: false,
            validate_callback_arguments: true,
            validate_callback_result: true,
        }
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = crate::error::Result<Value>> + Send>>;
pub type Handler = Arc<dyn Fn(crate::call_context::CallContext, Vec<Value>) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
pub struct RemoteMethod {
    pub class_name: String,
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    pub options: MethodOptions,
    pub security_group: SecurityGroupId,
    pub handler: Handler,
}

impl RemoteMethod {
    pub fn has_byte_stream_param(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::ByteStream)
    }
}

impl std::fmt::Debug for RemoteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMethod")
            .field("class_name", &self.class_name)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("options", &self.options)
            .field("security_group", &self.security_group)
            .finish()
    }
}

/// Builder for one service class's remote methods: a registration-as-builder
/// translation of decorator-driven configuration, where
/// `.method(name, params, handler)` is the moral equivalent of a `@remote`
/// decorator on a method declaration.
pub struct ClassBuilder<'r> {
    class_name: String,
    security_group: SecurityGroupId,
    default_options: MethodOptions,
    registry: &'r RemoteMethodRegistry,
}

impl<'r> ClassBuilder<'r> {
    pub fn defaults(mut self, options: MethodOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Registers a method. Panics at startup (registration time, not
    /// request time) if `name` is reserved — this is a configuration bug,
    /// not a runtime error.
    pub fn method(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        options: Option<MethodOptions>,
        handler: Handler,
    ) -> Self {
        if RESERVED_NAMES.contains(&name) {
            panic!("`{name}` is a reserved name and cannot be registered as a remote method");
        }

        let method = RemoteMethod {
            class_name: self.class_name.clone(),
            name: name.to_owned(),
            params,
            options: options.unwrap_or(self.default_options),
            security_group: self.security_group,
            handler,
        };

        self.registry.insert(method);
        self
    }
}

/// Declarative markers: which methods are callable, which are "safe"
/// (read-only), per-method validation options; reserved-name checks.
#[derive(Default)]
pub struct RemoteMethodRegistry {
    methods: parking_lot::RwLock<HashMap<String, RemoteMethod>>,
}

impl RemoteMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class<'r>(&'r self, class_name: &str, security_group: SecurityGroupId) -> ClassBuilder<'r> {
        ClassBuilder {
            class_name: class_name.to_owned(),
            security_group,
            default_options: MethodOptions::default(),
            registry: self,
        }
    }

    fn insert(&self, method: RemoteMethod) {
        self.methods.write().insert(method.name.clone(), method);
    }

    /// Resolves `name` to a registered, remotely-callable method.
    pub fn resolve(&self, name: &str) -> Result<RemoteMethod, MethodLookupError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(MethodLookupError::Reserved(name.to_owned()));
        }

        self.methods.read()
            .get(name)
            .cloned()
            .ok_or_else(|| MethodLookupError::NotFound(name.to_owned()))
    }

    pub fn method_count(&self) -> usize {
        self.methods.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::group::{SecurityGroupRegistry, SecurityGroupOptions};

    fn noop_handler() -> Handler {
        Arc::new(|_ctx, _args| Box::pin(async { Ok(Value::Null) }))
    }

    #[test]
    fn reserved_names_cannot_be_registered() {
        let groups = SecurityGroupRegistry::new();
        let gid = groups.register(SecurityGroupOptions::default());
        let registry = RemoteMethodRegistry::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.class("Books", gid).method("session", vec![], None, noop_handler());
        }));

        assert!(result.is_err());
    }

    #[test]
    fn resolves_registered_method() {
        let groups = SecurityGroupRegistry::new();
        let gid = groups.register(SecurityGroupOptions::default());
        let registry = RemoteMethodRegistry::new();
        registry.class("Books", gid).method("getBook", vec![], None, noop_handler());

        assert!(registry.resolve("getBook").is_ok());
        assert!(matches!(registry.resolve("doCall"), Err(MethodLookupError::Reserved(_))));
        assert!(matches!(registry.resolve("missing"), Err(MethodLookupError::NotFound(_))));
    }
}
