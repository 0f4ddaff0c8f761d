//! The per-call mutable copy a method body actually touches.

use serde_json::Value;

use crate::security::group::SecurityGroupId;
use crate::security::mode::ProtectionMode;
use crate::token::Token;

use super::CookieSession;

/// Wraps a baseline snapshot plus the working copy a method body edits.
/// [`crate::call_context::CallContext::finish_session`] hands this back to
/// the dispatcher, which diffs `working` against `baseline` via
/// [`CookieSession::commit_if_changed`].
#[derive(Debug, Clone)]
pub struct SessionView {
    baseline: CookieSession,
    working: CookieSession,
}

impl SessionView {
    pub fn new(snapshot: CookieSession) -> Self {
        SessionView { working: snapshot.clone(), baseline: snapshot }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.working.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.working.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.working.fields.remove(name)
    }

    pub fn csrf_token(&self, group: SecurityGroupId) -> Option<&Token> {
        self.working.csrf_tokens.get(&group)
    }

    pub fn set_csrf_token(&mut self, group: SecurityGroupId, token: Token) {
        self.working.csrf_tokens.insert(group, token);
    }

    pub fn cors_read_token(&self, group: SecurityGroupId) -> Option<&Token> {
        self.working.cors_read_tokens.get(&group)
    }

    pub fn set_cors_read_token(&mut self, group: SecurityGroupId, token: Token) {
        self.working.cors_read_tokens.insert(group, token);
    }

    pub fn mark_read_proven(&mut self) {
        self.working.read_was_proven = true;
    }

    pub fn read_was_proven(&self) -> bool {
        self.working.read_was_proven
    }

    pub fn protection_mode(&self) -> Option<ProtectionMode> {
        self.working.csrf_protection_mode
    }

    /// Commits the declared mode. A no-op if one is already set — mode is
    /// immutable for the life of the session; callers are expected to have
    /// checked this first via
    /// [`crate::security::guard::decide`].
    pub fn set_protection_mode_if_absent(&mut self, mode: ProtectionMode) {
        if self.working.csrf_protection_mode.is_none() {
            self.working.csrf_protection_mode = Some(mode);
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.working.id.as_deref()
    }

    /// Diffs the working copy against the baseline and returns the snapshot
    /// to persist, if anything changed.
    pub fn commit(&self) -> Option<CookieSession> {
        self.baseline.commit_if_changed(&self.working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unread_view_does_not_commit() {
        let view = SessionView::new(CookieSession::anonymous());
        assert!(view.commit().is_none());
    }

    #[test]
    fn writing_a_field_commits() {
        let mut view = SessionView::new(CookieSession::anonymous());
        view.set("cart", Value::from(vec![1, 2, 3]));
        let committed = view.commit().expect("should commit");
        assert_eq!(committed.version, 1);
    }
}
