//! In-memory representation of a cookie session and its commit rules.

pub mod schema;
pub mod store;
pub mod view;

use std::collections::HashMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::security::group::SecurityGroupId;
use crate::security::mode::ProtectionMode;
use crate::token::Token;

/// One snapshot of a session's state. Equality
/// here means "structurally identical snapshot", which is what change
/// detection diffs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieSession {
    /// Absent until the first commit creates the session.
    pub id: Option<String>,
    pub version: u64,
    #[serde(rename = "bpSalt")]
    pub bp_salt: String,
    #[serde(rename = "previousBpSalt")]
    pub previous_bp_salt: Option<String>,
    pub csrf_protection_mode: Option<ProtectionMode>,
    pub csrf_tokens: HashMap<SecurityGroupId, Token>,
    pub cors_read_tokens: HashMap<SecurityGroupId, Token>,
    /// `true` once a request has presented a valid `corsReadToken` at least
    /// once for this session.
    pub read_was_proven: bool,
    /// User-defined fields, keyed by service-class-declared name.
    pub fields: HashMap<String, Value>,
}

impl CookieSession {
    /// The unsaved baseline every new request starts from before any
    /// service has written to it.
    pub fn anonymous() -> Self {
        CookieSession {
            id: None,
            version: 0,
            bp_salt: String::new(),
            previous_bp_salt: None,
            csrf_protection_mode: None,
            csrf_tokens: HashMap::new(),
            cors_read_tokens: HashMap::new(),
            read_was_proven: false,
            fields: HashMap::new(),
        }
    }

    fn fresh_salt() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Applies the commit rules against `self` as the
    /// baseline and `view` as the method body's edited copy. Returns `None`
    /// if the two are structurally identical (no commit). Otherwise returns
    /// the new snapshot to persist: `id` assigned if absent, `version`
    /// incremented, `bpSalt` rolled and the old one preserved.
    pub fn commit_if_changed(&self, view: &CookieSession) -> Option<CookieSession> {
        if self.fields == view.fields
            && self.csrf_protection_mode == view.csrf_protection_mode
            && self.csrf_tokens == view.csrf_tokens
            && self.cors_read_tokens == view.cors_read_tokens
            && self.read_was_proven == view.read_was_proven
        {
            return None;
        }

        let mut committed = view.clone();
        committed.id = Some(committed.id.unwrap_or_else(|| Self::fresh_salt()));
        committed.version = self.version + 1;
        committed.previous_bp_salt = Some(self.bp_salt.clone());
        committed.bp_salt = Self::fresh_salt();
        Some(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_fields_do_not_commit() {
        let baseline = CookieSession::anonymous();
        let mut view = baseline.clone();
        view.fields.insert("val".into(), Value::String("initial".into()));
        view.fields.remove("val");
        assert_eq!(baseline.fields, view.fields);
        assert!(baseline.commit_if_changed(&view).is_none());
    }

    #[test]
    fn changed_field_commits_and_rolls_salt() {
        let baseline = CookieSession::anonymous();
        let mut view = baseline.clone();
        view.fields.insert("val".into(), Value::String("x".into()));

        let committed = baseline.commit_if_changed(&view).expect("should commit");
        assert_eq!(committed.version, baseline.version + 1);
        assert_ne!(committed.bp_salt, baseline.bp_salt);
        assert_eq!(committed.previous_bp_salt.as_deref(), Some(baseline.bp_salt.as_str()));
        assert!(committed.id.is_some());
    }

    #[test]
    fn repeated_commit_keeps_version_monotonic() {
        let gen0 = CookieSession::anonymous();
        let mut view1 = gen0.clone();
        view1.fields.insert("a".into(), Value::from(1));
        let gen1 = gen0.commit_if_changed(&view1).unwrap();

        let mut view2 = gen1.clone();
        view2.fields.insert("a".into(), Value::from(2));
        let gen2 = gen1.commit_if_changed(&view2).unwrap();

        assert_eq!(gen2.version, gen1.version + 1);
        assert_ne!(gen2.bp_salt, gen1.bp_salt);
    }
}
