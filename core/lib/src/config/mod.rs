//! Process configuration, loaded via a layered [`figment`]-backed `Config`:
//! hardcoded defaults, merged over an optional TOML file, merged over
//! environment variables.

mod secret_key;

pub use secret_key::SecretKey;

use std::time::Duration;

use figment::{Figment, providers::{Format, Toml, Serialized, Env}};
use serde::{Deserialize, Serialize};

use crate::trace::TraceFormat;

/// Key-rotation schedule for per-session CSRF/CORS-read tokens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotate {
    /// Total hours a key is used as either the primary or secondary key.
    pub period: u8,
    /// Minimum hours the secondary key survives before being rotated out.
    pub window: u8,
}

impl Default for Rotate {
    fn default() -> Self {
        Rotate { period: 24, window: 6 }
    }
}

impl Rotate {
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period as u64 * 3600)
    }

    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window as u64 * 3600)
    }

    pub const fn epoch(&self) -> Duration {
        let wait = self.period.saturating_sub(self.window);
        Duration::from_secs(wait as u64 * 3600)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Process-wide secret backing [`crate::token::TokenBox`].
    #[serde(serialize_with = "SecretKey::serialize_zero")]
    pub secret_key: SecretKey,

    /// Mount prefix for the HTTP call surface, e.g. `/api`.
    pub base_path: String,

    /// Rotation schedule for CSRF/CORS-read token signing keys.
    pub csrf_rotate: Rotate,

    /// `NODE_ENV`-equivalent relaxation switch.
    /// Only takes effect when every registered security group agrees
    /// — enforced by [`crate::security::group`], not
    /// here.
    pub dev_disable_security: bool,

    /// Maximum age, in seconds, a [`crate::session::CookieSession`] cookie
    /// is honored for before being treated as absent.
    pub session_max_age: u64,

    pub trace_format: TraceFormat,

    #[serde(with = "tracing_level_serde")]
    pub trace_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            secret_key: SecretKey::zero(),
            base_path: "/api".into(),
            csrf_rotate: Rotate::default(),
            dev_disable_security: false,
            session_max_age: 60 * 60 * 24 * 14,
            trace_format: TraceFormat::default(),
            trace_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    /// The default, empty figment: env vars prefixed `REMOTECORE_` over an
    /// optional `RemoteCore.toml` file, over the struct defaults.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("RemoteCore.toml").nested())
            .merge(Env::prefixed("REMOTECORE_").global())
    }

    pub fn from(figment: Figment) -> figment::error::Result<Config> {
        figment.extract()
    }
}

impl crate::trace::Traceable for Config {
    fn trace(&self) {
        crate::info! {
            name: "config",
            base_path = %self.base_path,
            dev_disable_security = self.dev_disable_security,
            session_max_age = self.session_max_age,
            csrf_rotate.period_hours = self.csrf_rotate.period,
            csrf_rotate.window_hours = self.csrf_rotate.window,
            trace_format = ?self.trace_format,
            "loaded configuration",
        }

        if !self.secret_key.is_provided() {
            crate::warn! {
                name: "volatile_secret_key",
                "running without a configured `secret_key`; tokens issued before \
                this restart will stop verifying; set one for anything beyond local \
                development",
            }
        }
    }
}

mod tracing_level_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(level: &tracing::Level, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<tracing::Level, D::Error> {
        let s = String::deserialize(de)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
