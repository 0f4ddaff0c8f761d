//! Pluggable session persistence: the contract a session record store must
//! satisfy, plus an in-memory implementation for tests and single-process
//! deployments.
use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;

use super::CookieSession;

/// What any session store must provide. The internal fields `id`,
/// `version`, `bpSalt`, `previousBpSalt` travel as regular fields of the
/// stored record and MUST round-trip unchanged.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<CookieSession>>;

    /// Persists `session`, which already carries its assigned `id`.
    async fn save(&self, session: CookieSession) -> Result<()>;

    async fn destroy(&self, id: &str) -> Result<()>;
}

/// A `DashMap`-backed store. Suitable for tests and single-node
/// deployments; a production deployment behind a load balancer supplies its
/// own [`SessionStore`].
pub struct InMemorySessionStore {
    sessions: DashMap<String, CookieSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<CookieSession>> {
        Ok(self.sessions.get(id).map(|e| e.clone()))
    }

    async fn save(&self, session: CookieSession) -> Result<()> {
        let id = session.id.clone().ok_or_else(|| {
            crate::error::Error::Session("cannot save a session with no id".into())
        })?;
        self.sessions.insert(id, session);
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
