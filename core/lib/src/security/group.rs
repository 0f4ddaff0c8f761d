//! SecurityGroup: the equivalence class of service classes that share
//! identical security options, so a token issued for the group is accepted
//! for any member.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::collections::hash_map::DefaultHasher;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::mode::ProtectionMode;

/// How an [`AllowedOrigins`] list is checked. The `Predicate` variant is
/// compared by `Arc` pointer identity, not by behavior: two distinct
/// closures form distinct groups even if they happen to accept the same
/// origins.
#[derive(Clone)]
pub enum AllowedOrigins {
    All,
    List(Vec<String>),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl AllowedOrigins {
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            AllowedOrigins::All => true,
            AllowedOrigins::List(list) => list.iter().any(|o| o == origin),
            AllowedOrigins::Predicate(f) => f(origin),
        }
    }

    fn fingerprint_into(&self, hasher: &mut impl Hasher) {
        match self {
            AllowedOrigins::All => 0u8.hash(hasher),
            AllowedOrigins::List(list) => {
                1u8.hash(hasher);
                list.hash(hasher);
            }
            AllowedOrigins::Predicate(f) => {
                2u8.hash(hasher);
                (Arc::as_ptr(f) as *const () as usize).hash(hasher);
            }
        }
    }
}

/// The security-relevant options of a set of service classes.
#[derive(Clone)]
pub struct SecurityGroupOptions {
    pub allowed_origins: AllowedOrigins,
    pub default_mode: ProtectionMode,
    pub force_token_check: bool,
    pub dev_disable_security: bool,
}

impl Default for SecurityGroupOptions {
    fn default() -> Self {
        SecurityGroupOptions {
            allowed_origins: AllowedOrigins::List(Vec::new()),
            default_mode: ProtectionMode::DEFAULT,
            force_token_check: false,
            dev_disable_security: false,
        }
    }
}

impl SecurityGroupOptions {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.allowed_origins.fingerprint_into(&mut hasher);
        self.default_mode.hash(&mut hasher);
        self.force_token_check.hash(&mut hasher);
        self.dev_disable_security.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecurityGroupId(pub(crate) u64);

impl From<u64> for SecurityGroupId {
    fn from(raw: u64) -> Self {
        SecurityGroupId(raw)
    }
}

impl std::fmt::Display for SecurityGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group-{:016x}", self.0)
    }
}

/// Process-wide registry mapping option fingerprints to interned groups.
/// Write-once, read-many: registration happens during class setup, then the
/// registry is frozen before the first inbound request is served.
pub struct SecurityGroupRegistry {
    groups: DashMap<u64, SecurityGroupOptions>,
    frozen: std::sync::atomic::AtomicBool,
}

impl Default for SecurityGroupRegistry {
    fn default() -> Self {
        SecurityGroupRegistry {
            groups: DashMap::new(),
            frozen: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl SecurityGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `options`, returning the id of the (possibly pre-existing)
    /// group with an identical fingerprint.
    ///
    /// # Panics
    ///
    /// Panics if the registry has already been frozen.
    pub fn register(&self, options: SecurityGroupOptions) -> SecurityGroupId {
        assert!(
            !self.frozen.load(std::sync::atomic::Ordering::Acquire),
            "cannot register a new SecurityGroup after the registry has been frozen",
        );

        let fingerprint = options.fingerprint();
        self.groups.entry(fingerprint).or_insert(options);
        SecurityGroupId(fingerprint)
    }

    pub fn freeze(&self) {
        self.frozen.store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn get(&self, id: SecurityGroupId) -> Option<SecurityGroupOptions> {
        self.groups.get(&id.0).map(|e| e.clone())
    }
}
