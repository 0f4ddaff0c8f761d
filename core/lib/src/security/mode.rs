use serde::{Deserialize, Serialize};

/// The three cross-origin protection modes a session can commit to. Once a
/// session's mode is set it is immutable for the life of the session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtectionMode {
    Preflight,
    CorsReadToken,
    CsrfToken,
}

impl ProtectionMode {
    /// An absent meta parameter is committed as `preflight`, not an error
    /// and not `None`.
    pub const DEFAULT: ProtectionMode = ProtectionMode::Preflight;
}

impl std::str::FromStr for ProtectionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preflight" => Ok(ProtectionMode::Preflight),
            "corsReadToken" => Ok(ProtectionMode::CorsReadToken),
            "csrfToken" => Ok(ProtectionMode::CsrfToken),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ProtectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProtectionMode::Preflight => "preflight",
            ProtectionMode::CorsReadToken => "corsReadToken",
            ProtectionMode::CsrfToken => "csrfToken",
        };
        f.write_str(s)
    }
}
