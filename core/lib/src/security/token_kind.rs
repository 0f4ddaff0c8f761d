//! Issuance of the two token kinds a session carries: `csrfToken` and
//! `corsReadToken`.

use serde::{Deserialize, Serialize};

use crate::token::{Token, TokenBox};

use super::group::SecurityGroupId;

pub const CSRF_TOKEN_TYPE: &str = "csrfToken";
pub const CORS_READ_TOKEN_TYPE: &str = "corsReadToken";

/// The payload carried inside a csrf/cors-read token: which security group
/// it was issued for, so a stolen token for one group can't be replayed
/// against another.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    group: SecurityGroupId,
}

/// Issues and verifies the two session-bound token kinds over a shared
/// [`TokenBox`].
pub struct TokenKindIssuer<'a> {
    token_box: &'a TokenBox,
}

impl<'a> TokenKindIssuer<'a> {
    pub fn new(token_box: &'a TokenBox) -> Self {
        TokenKindIssuer { token_box }
    }

    pub fn issue_csrf_token(&self, group: SecurityGroupId) -> crate::error::Result<Token> {
        self.token_box
            .encrypt(&TokenPayload { group }, CSRF_TOKEN_TYPE)
            .map_err(Into::into)
    }

    pub fn issue_cors_read_token(&self, group: SecurityGroupId) -> crate::error::Result<Token> {
        self.token_box
            .encrypt(&TokenPayload { group }, CORS_READ_TOKEN_TYPE)
            .map_err(Into::into)
    }

    /// Verifies `token` was issued for `expected_group` and is of the
    /// requested kind.
    fn verify(&self, token: &Token, expected_group: SecurityGroupId, type_tag: &str) -> bool {
        match self.token_box.decrypt::<TokenPayload>(token, type_tag) {
            Ok(payload) => payload.group == expected_group,
            Err(_) => false,
        }
    }

    pub fn verify_csrf_token(&self, token: &Token, expected_group: SecurityGroupId) -> bool {
        self.verify(token, expected_group, CSRF_TOKEN_TYPE)
    }

    pub fn verify_cors_read_token(&self, token: &Token, expected_group: SecurityGroupId) -> bool {
        self.verify(token, expected_group, CORS_READ_TOKEN_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::group::SecurityGroupId;

    #[test]
    fn issued_token_verifies_for_its_own_group_only() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);

        let group_a = SecurityGroupId::default();
        let group_b = SecurityGroupId::from(1u64);

        let token = issuer.issue_csrf_token(group_a).unwrap();
        assert!(issuer.verify_csrf_token(&token, group_a));
        assert!(!issuer.verify_csrf_token(&token, group_b));
    }

    #[test]
    fn cors_read_and_csrf_tokens_do_not_cross_verify() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let issuer = TokenKindIssuer::new(&tb);
        let group = SecurityGroupId::default();

        let read_token = issuer.issue_cors_read_token(group).unwrap();
        assert!(!issuer.verify_csrf_token(&read_token, group));
        assert!(issuer.verify_cors_read_token(&read_token, group));
    }
}
