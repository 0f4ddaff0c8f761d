//! The cross-origin decision engine: allow/deny for
//! a (request, session, service-class) triple.

use subtle::ConstantTimeEq;

use crate::session::view::SessionView;
use crate::token::{shield, unshield, Token};

use super::group::{SecurityGroupId, SecurityGroupOptions};
use super::mode::ProtectionMode;
use super::request::SecurityPropertiesOfHttpRequest;
use super::token_kind::TokenKindIssuer;

/// Per-method facts the guard needs that live on [`crate::registry::RemoteMethod`]
/// but that this module shouldn't depend on directly.
pub struct MethodFacts {
    pub is_safe: bool,
    /// `true` for the bootstrap method that hands out `corsReadToken`.
    pub is_cors_read_token_bootstrap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decodes and constant-time-compares a shielded token string against a
/// session-bound token issued for `group`, returning `false` on any
/// malformed input rather than propagating an error.
fn token_matches(presented: &str, expected: &Token, issuer: &TokenKindIssuer<'_>, group: SecurityGroupId, verify: impl Fn(&TokenKindIssuer<'_>, &Token, SecurityGroupId) -> bool) -> bool {
    let Ok(raw) = unshield(presented) else { return false };
    let Ok(candidate) = serde_json::from_slice::<Token>(&raw) else { return false };

    let candidate_matches_expected = {
        let a = serde_json::to_vec(&candidate).unwrap_or_default();
        let b = serde_json::to_vec(expected).unwrap_or_default();
        a.ct_eq(&b).into()
    };

    candidate_matches_expected && verify(issuer, &candidate, group)
}

/// Re-shields a token for transport to the browser (the companion of
/// [`token_matches`]'s unshielding step).
pub fn shield_token(token: &Token) -> String {
    let bytes = serde_json::to_vec(token).expect("Token always serializes");
    shield(&bytes)
}

/// Evaluates the full origin/token/mode decision procedure for one call.
pub fn decide(
    request: &SecurityPropertiesOfHttpRequest,
    session: &SessionView,
    group: SecurityGroupId,
    options: &SecurityGroupOptions,
    issuer: &TokenKindIssuer<'_>,
    presented_csrf_token: Option<&str>,
    presented_cors_read_token: Option<&str>,
    method: &MethodFacts,
) -> Decision {
    // Step 1: dev-disable-security short circuit, requires every registered
    // class to agree (carried here as a single flag per security group,
    // since classes sharing a group always share this flag by
    // construction — see SecurityGroupOptions::fingerprint).
    if options.dev_disable_security {
        return Decision::Allow;
    }

    let enforced_mode = session
        .protection_mode()
        .or(request.declared_mode)
        .unwrap_or(ProtectionMode::DEFAULT);

    // Step 2: declared mode conflicting with the enforced (session-pinned)
    // mode is always a denial, even before considering origin or tokens.
    if let Some(declared) = request.declared_mode {
        if session.protection_mode().is_some() && declared != enforced_mode {
            return Decision::Deny("declared protection mode conflicts with the session's committed mode");
        }
    }

    // Step 3.
    if enforced_mode == ProtectionMode::CsrfToken {
        if request.browser_might_have_security_issues() {
            return Decision::Deny("user agent is known-vulnerable under csrfToken mode");
        }

        let Some(expected) = session.csrf_token(group) else {
            return Decision::Deny("no csrfToken has been issued for this session/group");
        };

        let presented = match presented_csrf_token {
            Some(p) => p,
            None => return Decision::Deny("csrfToken mode requires a presented token"),
        };

        return if token_matches(presented, expected, issuer, group, TokenKindIssuer::verify_csrf_token) {
            Decision::Allow
        } else {
            Decision::Deny("presented csrfToken did not verify")
        };
    }

    // Step 4: origin-allowedness.
    let origin_allowed = request
        .effective_origin()
        .map(|origin| options.allowed_origins.allows(origin))
        .unwrap_or(false);

    if origin_allowed {
        return Decision::Allow;
    }

    // Step 5.
    if request.browser_might_have_security_issues() {
        return Decision::Deny("user agent is known-vulnerable and origin is not allowed");
    }

    // Step 6.
    if enforced_mode == ProtectionMode::CorsReadToken {
        let proven_by_token = presented_cors_read_token
            .zip(session.cors_read_token(group))
            .map(|(presented, expected)| {
                token_matches(presented, expected, issuer, group, TokenKindIssuer::verify_cors_read_token)
            })
            .unwrap_or(false);

        return if proven_by_token || session.read_was_proven() {
            Decision::Allow
        } else {
            Decision::Deny("corsReadToken mode requires proven prior read access")
        };
    }

    // Step 7: simple cross-site request.
    if request.could_be_simple_request() {
        return if request.method.eq_ignore_ascii_case("GET") && method.is_safe {
            Decision::Allow
        } else {
            Decision::Deny("simple cross-site requests may only reach safe GET methods")
        };
    }

    // Step 8: non-simple request that necessarily passed a CORS preflight.
    if method.is_cors_read_token_bootstrap {
        return Decision::Allow;
    }

    if matches!(enforced_mode, ProtectionMode::Preflight) {
        Decision::Allow
    } else {
        Decision::Deny("non-simple request outside preflight mode without an allowed origin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::group::AllowedOrigins;
    use crate::session::CookieSession;
    use crate::token::TokenBox;

    fn facts(is_safe: bool) -> MethodFacts {
        MethodFacts { is_safe, is_cors_read_token_bootstrap: false }
    }

    fn allow_origin(origin: &str) -> SecurityGroupOptions {
        SecurityGroupOptions {
            allowed_origins: AllowedOrigins::List(vec![origin.to_owned()]),
            ..Default::default()
        }
    }

    #[test]
    fn dev_disable_security_always_allows() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);
        let request = SecurityPropertiesOfHttpRequest { method: "POST".into(), ..Default::default() };
        let session = SessionView::new(CookieSession::anonymous());
        let options = SecurityGroupOptions { dev_disable_security: true, ..Default::default() };

        let decision = decide(&request, &session, SecurityGroupId::default(), &options, &issuer, None, None, &facts(false));
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn same_origin_request_is_allowed() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);
        let request = SecurityPropertiesOfHttpRequest {
            method: "POST".into(),
            origin: Some("https://app.example".into()),
            content_type: Some("application/json".into()),
            forced_complex: true,
            ..Default::default()
        };
        let session = SessionView::new(CookieSession::anonymous());
        let options = allow_origin("https://app.example");

        let decision = decide(&request, &session, SecurityGroupId::default(), &options, &issuer, None, None, &facts(false));
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn simple_cross_site_get_to_unsafe_method_is_denied() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);
        let request = SecurityPropertiesOfHttpRequest {
            method: "GET".into(),
            origin: Some("https://evil.test".into()),
            ..Default::default()
        };
        let session = SessionView::new(CookieSession::anonymous());
        let options = allow_origin("https://app.example");

        let decision = decide(&request, &session, SecurityGroupId::default(), &options, &issuer, None, None, &facts(false));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn simple_cross_site_get_to_safe_method_is_allowed() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);
        let request = SecurityPropertiesOfHttpRequest {
            method: "GET".into(),
            origin: Some("https://evil.test".into()),
            ..Default::default()
        };
        let session = SessionView::new(CookieSession::anonymous());
        let options = allow_origin("https://app.example");

        let decision = decide(&request, &session, SecurityGroupId::default(), &options, &issuer, None, None, &facts(true));
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn conflicting_declared_mode_is_denied() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);
        let request = SecurityPropertiesOfHttpRequest {
            method: "POST".into(),
            declared_mode: Some(ProtectionMode::CsrfToken),
            ..Default::default()
        };
        let mut session_data = CookieSession::anonymous();
        session_data.csrf_protection_mode = Some(ProtectionMode::Preflight);
        let session = SessionView::new(session_data);
        let options = SecurityGroupOptions::default();

        let decision = decide(&request, &session, SecurityGroupId::default(), &options, &issuer, None, None, &facts(false));
        assert!(!decision.is_allowed());
    }
}
