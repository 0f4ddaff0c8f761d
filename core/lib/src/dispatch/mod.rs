//! HttpDispatcher: resolves a call, runs it through [`crate::security::guard`],
//! invokes the method inside a scoped [`crate::call_context::CallContext`],
//! and shapes the result.

pub mod args;
pub mod multipart;
pub mod request;
pub mod response;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::call_context::{CallContext, Transport};
use crate::error::{Error, Result};
use crate::registry::RemoteMethodRegistry;
use crate::security::group::SecurityGroupRegistry;
use crate::security::guard::{self, MethodFacts};
use crate::security::mode::ProtectionMode;
use crate::security::token_kind::TokenKindIssuer;
use crate::session::store::SessionStore;
use crate::session::view::SessionView;
use crate::session::CookieSession;
use crate::token::TokenBox;

use request::RawHttpCall;
use response::OutgoingBody;

/// Outcome of one dispatched call: the shaped body plus whether the
/// session changed and must be committed to the store and reflected in a
/// `Set-Cookie`.
pub struct DispatchOutcome {
    pub body: OutgoingBody,
    pub session_committed: Option<CookieSession>,
}

pub struct HttpDispatcher {
    registry: Arc<RemoteMethodRegistry>,
    groups: Arc<SecurityGroupRegistry>,
    token_box: Arc<TokenBox>,
    store: Arc<dyn SessionStore>,
    next_request_id: AtomicU64,
}

impl HttpDispatcher {
    pub fn new(
        registry: Arc<RemoteMethodRegistry>,
        groups: Arc<SecurityGroupRegistry>,
        token_box: Arc<TokenBox>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        HttpDispatcher { registry, groups, token_box, store, next_request_id: AtomicU64::new(1) }
    }

    /// Loads the caller's session by id, falling back to the anonymous
    /// baseline.
    async fn load_session(&self, session_id: Option<&str>) -> Result<CookieSession> {
        match session_id {
            Some(id) => Ok(self.store.load(id).await?.unwrap_or_else(CookieSession::anonymous)),
            None => Ok(CookieSession::anonymous()),
        }
    }

    /// Dispatches one HTTP call end to end: resolves the method, binds
    /// arguments, runs `CsrfGuard`, invokes the method body, and commits
    /// any session change.
    pub async fn dispatch(&self, call: RawHttpCall, session_id: Option<&str>) -> Result<DispatchOutcome> {
        let method = self.registry.resolve(&call.method_name)?;

        // A GET to a non-safe method is never executed, regardless of
        // origin: the same-origin branch of the cross-origin decision
        // procedure would otherwise let it through.
        if call.security.method.eq_ignore_ascii_case("GET") && !method.options.is_safe {
            crate::warn!(method = %call.method_name, "GET to a non-safe method denied before invocation");
            return Err(Error::SecurityDenied { reason: "GET may only invoke a method marked safe" });
        }

        let (args, declared_mode_str) = args::bind_arguments(&call, &method.params, method.options.trim_arguments)?;

        let mut security = call.security.clone();
        security.declared_mode = declared_mode_str.as_deref().and_then(|s| s.parse().ok()).or(security.declared_mode);

        let baseline = self.load_session(session_id).await?;
        let mut view = SessionView::new(baseline.clone());

        let options = self.groups.get(method.security_group)
            .ok_or_else(|| Error::SecurityDenied { reason: "unknown security group" })?;

        let issuer = TokenKindIssuer::new(&self.token_box);
        let facts = MethodFacts { is_safe: method.options.is_safe, is_cors_read_token_bootstrap: false };

        let decision = guard::decide(
            &security,
            &view,
            method.security_group,
            &options,
            &issuer,
            call.presented_csrf_token.as_deref(),
            call.presented_cors_read_token.as_deref(),
            &facts,
        );

        if !decision.is_allowed() {
            let Some(reason) = (match decision { guard::Decision::Deny(r) => Some(r), _ => None }) else {
                unreachable!("decision was just checked to be a denial")
            };
            crate::warn!(method = %call.method_name, %reason, "csrf guard denied call");
            return Err(Error::SecurityDenied { reason });
        }

        view.set_protection_mode_if_absent(security.declared_mode.unwrap_or(ProtectionMode::DEFAULT));
        if security.read_was_proven {
            view.mark_read_proven();
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let ctx = CallContext::new(
            Transport::Http { request_id },
            security,
            view,
            method.security_group,
            method.name.clone(),
        );

        let result = (method.handler)(ctx.clone(), args).await?;

        let view = ctx.finish_session()?;
        let declared_content_type = ctx.take_content_type()?;
        let session_committed = view.commit();

        if let Some(ref committed) = session_committed {
            self.store.save(committed.clone()).await?;
        }

        let body = response::shape_result(result, declared_content_type.as_deref())?;
        Ok(DispatchOutcome { body, session_committed })
    }
}
