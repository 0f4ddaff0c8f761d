//! TokenBridge: lifts HTTP-derived security context and session state onto
//! a socket via signed+encrypted tokens bound to the socket's identifier.

use serde::{Deserialize, Serialize};

use remotecore::error::{Error, Result};
use remotecore::security::group::SecurityGroupId;
use remotecore::security::request::SecurityPropertiesOfHttpRequest;
use remotecore::session::CookieSession;
use remotecore::token::{Token, TokenBox};

const BRIDGE_TOKEN_TYPE: &str = "socketBridge";

/// A socket's own identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId(pub [u8; 16]);

/// The payload carried inside a bridge token: everything needed to trust
/// an inbound socket call as if it arrived over the HTTP plane that minted
/// it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgePayload {
    pub socket_id: SocketId,
    pub security: SecurityPropertiesOfHttpRequest,
    pub session: CookieSession,
    pub covers_groups: Vec<SecurityGroupId>,
}

/// Whether a socket caches one security-context snapshot per security
/// group (faster, default) or one per service class (stricter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessProofGranularity {
    PerSecurityGroup,
    PerServiceClass,
}

impl Default for AccessProofGranularity {
    fn default() -> Self {
        AccessProofGranularity::PerSecurityGroup
    }
}

pub struct TokenBridge<'a> {
    token_box: &'a TokenBox,
}

impl<'a> TokenBridge<'a> {
    pub fn new(token_box: &'a TokenBox) -> Self {
        TokenBridge { token_box }
    }

    /// Mints a bridge token on the HTTP side, to be ferried to the socket
    /// by the client.
    pub fn mint(&self, payload: BridgePayload) -> Result<Token> {
        self.token_box.encrypt(&payload, BRIDGE_TOKEN_TYPE).map_err(Into::into)
    }

    /// Verifies and decodes a bridge token received over a socket,
    /// rejecting it outright if the socket id embedded inside doesn't
    /// match the socket that received it.
    pub fn accept(&self, token: &Token, receiving_socket: SocketId) -> Result<BridgePayload> {
        let payload: BridgePayload = self.token_box.decrypt(token, BRIDGE_TOKEN_TYPE)?;

        if payload.socket_id != receiving_socket {
            return Err(Error::SecurityDenied {
                reason: "bridge token's socket id does not match the receiving socket",
            });
        }

        Ok(payload)
    }

    /// Validates a session update arriving from the socket side before it
    /// is written back on the HTTP side: `version` must be exactly one
    /// greater than the socket's last-known view.
    pub fn validate_monotonic_update(current: &CookieSession, incoming: &CookieSession) -> Result<()> {
        if incoming.version != current.version + 1 {
            return Err(Error::SecurityDenied {
                reason: "session update is not exactly one version ahead of the socket's current view",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(version: u64) -> CookieSession {
        let mut session = CookieSession::anonymous();
        session.version = version;
        session
    }

    #[test]
    fn token_is_rejected_for_the_wrong_socket() {
        let tb = TokenBox::from_secret(b"a reasonably long shared secret").unwrap();
        let bridge = TokenBridge::new(&tb);

        let socket_a = SocketId([1; 16]);
        let socket_b = SocketId([2; 16]);

        let token = bridge.mint(BridgePayload {
            socket_id: socket_a,
            security: SecurityPropertiesOfHttpRequest::default(),
            session: CookieSession::anonymous(),
            covers_groups: vec![],
        }).unwrap();

        assert!(bridge.accept(&token, socket_a).is_ok());
        assert!(bridge.accept(&token, socket_b).is_err());
    }

    #[test]
    fn version_must_increase_by_exactly_one() {
        assert!(TokenBridge::validate_monotonic_update(&session_at(3), &session_at(4)).is_ok());
        assert!(TokenBridge::validate_monotonic_update(&session_at(3), &session_at(5)).is_err());
        assert!(TokenBridge::validate_monotonic_update(&session_at(3), &session_at(3)).is_err());
    }
}
