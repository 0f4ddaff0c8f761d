//! The per-invocation scope a remote method body runs inside.
//!
//! Exactly one of an HTTP request/response pair or a socket connection
//! handle is present. Context attributes are only reachable while the
//! method's work is synchronously in progress (or its lazy stream is still
//! active) — touching them from a continuation that outlived the call must
//! fail explicitly rather than silently reading torn-down state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::security::group::SecurityGroupId;
use crate::security::request::SecurityPropertiesOfHttpRequest;
use crate::session::view::SessionView;

/// Which plane a call arrived on.
#[derive(Debug, Clone)]
pub enum Transport {
    Http { request_id: u64 },
    Socket { connection_id: u128 },
}

struct Inner {
    valid: AtomicBool,
    transport: Transport,
    security_properties: SecurityPropertiesOfHttpRequest,
    session: Mutex<SessionView>,
    security_group: SecurityGroupId,
    method_name: String,
    content_type: Mutex<Option<String>>,
}

/// A cheaply-cloneable handle into one in-flight call's scope.
#[derive(Clone)]
pub struct CallContext(Arc<Inner>);

impl CallContext {
    pub fn new(
        transport: Transport,
        security_properties: SecurityPropertiesOfHttpRequest,
        session: SessionView,
        security_group: SecurityGroupId,
        method_name: impl Into<String>,
    ) -> Self {
        CallContext(Arc::new(Inner {
            valid: AtomicBool::new(true),
            transport,
            security_properties,
            session: Mutex::new(session),
            security_group,
            method_name: method_name.into(),
            content_type: Mutex::new(None),
        }))
    }

    /// Marks this context as torn down. Called when the owning request is
    /// aborted or the owning socket connection closes.
    /// In-flight user work is not forcibly interrupted; its eventual result
    /// is simply discarded by the caller.
    pub fn invalidate(&self) {
        self.0.valid.store(false, Ordering::Release);
    }

    pub fn is_valid(&self) -> bool {
        self.0.valid.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::ContextInvalidated("the request or connection this call belonged to is gone"))
        }
    }

    pub fn transport(&self) -> Result<&Transport> {
        self.check()?;
        Ok(&self.0.transport)
    }

    pub fn security_properties(&self) -> Result<&SecurityPropertiesOfHttpRequest> {
        self.check()?;
        Ok(&self.0.security_properties)
    }

    pub fn security_group(&self) -> Result<SecurityGroupId> {
        self.check()?;
        Ok(self.0.security_group)
    }

    pub fn method_name(&self) -> Result<&str> {
        self.check()?;
        Ok(&self.0.method_name)
    }

    /// Runs `f` with exclusive access to the session view, returning
    /// whatever `f` returns. This is the only way method bodies touch
    /// session state.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut SessionView) -> R) -> Result<R> {
        self.check()?;
        Ok(f(&mut self.0.session.lock()))
    }

    /// Consumes the context's session view, finalizing any pending commit.
    /// Called once by the dispatcher after the method body returns.
    pub fn finish_session(&self) -> Result<SessionView> {
        self.check()?;
        Ok(self.0.session.lock().clone())
    }

    /// Declares the content type the response should be shaped with.
    /// `None` (the default if never called) shapes the result as
    /// `application/json`.
    pub fn set_content_type(&self, content_type: impl Into<String>) -> Result<()> {
        self.check()?;
        *self.0.content_type.lock() = Some(content_type.into());
        Ok(())
    }

    /// Takes the declared content type, if any. Called once by the
    /// dispatcher after the method body returns, alongside
    /// [`Self::finish_session`].
    pub fn take_content_type(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.0.content_type.lock().take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CookieSession;

    fn context() -> CallContext {
        CallContext::new(
            Transport::Http { request_id: 1 },
            SecurityPropertiesOfHttpRequest::default(),
            SessionView::new(CookieSession::anonymous()),
            SecurityGroupId::default(),
            "getBook",
        )
    }

    #[test]
    fn invalidated_context_rejects_access() {
        let ctx = context();
        ctx.invalidate();
        assert!(ctx.transport().is_err());
        assert!(ctx.with_session(|_| ()).is_err());
    }

    #[test]
    fn valid_context_allows_access() {
        let ctx = context();
        assert!(ctx.transport().is_ok());
        assert!(ctx.method_name().unwrap() == "getBook");
    }
}
