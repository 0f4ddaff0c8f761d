//! Everything [`crate::security::guard::decide`] needs to know about one
//! inbound request.

use serde::{Deserialize, Serialize};

use super::mode::ProtectionMode;
use super::ua;

/// The "simple request" content types a browser will send cross-origin
/// without a CORS preflight.
const SIMPLE_CONTENT_TYPES: &[&str] = &[
    "application/x-www-form-urlencoded",
    "multipart/form-data",
    "text/plain",
];

const SIMPLE_METHODS: &[&str] = &["GET", "HEAD", "POST"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPropertiesOfHttpRequest {
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub method: String,
    pub content_type: Option<String>,
    /// `true` when the request presented a valid `corsReadToken`.
    pub read_was_proven: bool,
    /// The `csrfProtectionMode` meta parameter the request declared, if
    /// any.
    pub declared_mode: Option<ProtectionMode>,
    pub user_agent: Option<String>,
    /// `true` when the request declared a header that forces a non-simple
    /// classification even though method/content-type would otherwise
    /// qualify.
    pub forced_complex: bool,
}

impl Default for SecurityPropertiesOfHttpRequest {
    fn default() -> Self {
        SecurityPropertiesOfHttpRequest {
            origin: None,
            referer: None,
            method: "GET".to_owned(),
            content_type: None,
            read_was_proven: false,
            declared_mode: None,
            user_agent: None,
            forced_complex: false,
        }
    }
}

impl SecurityPropertiesOfHttpRequest {
    /// The origin to judge allowedness against: `Origin`, falling back to
    /// `Referer`.
    pub fn effective_origin(&self) -> Option<&str> {
        self.origin.as_deref().or_else(|| self.referer_origin())
    }

    fn referer_origin(&self) -> Option<&str> {
        let referer = self.referer.as_deref()?;
        let without_scheme = referer.split_once("://").map(|(_, rest)| rest).unwrap_or(referer);
        let host_end = without_scheme.find('/').unwrap_or(without_scheme.len());
        let host = &without_scheme[..host_end];
        let scheme_end = referer.len() - without_scheme.len();
        Some(&referer[..scheme_end + host.len()])
    }

    /// Method in {GET, HEAD, POST} and content-type in the simple set and
    /// no forced-complex header.
    pub fn could_be_simple_request(&self) -> bool {
        if self.forced_complex {
            return false;
        }

        if !SIMPLE_METHODS.contains(&self.method.to_ascii_uppercase().as_str()) {
            return false;
        }

        match &self.content_type {
            None => true,
            Some(ct) => {
                let base = ct.split(';').next().unwrap_or("").trim();
                SIMPLE_CONTENT_TYPES.contains(&base)
            }
        }
    }

    /// Whether this request's user agent is a browser known to mishandle
    /// cross-origin fetch credentials.
    pub fn browser_might_have_security_issues(&self) -> bool {
        self.user_agent.as_deref().map(ua::is_vulnerable).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_request_classification() {
        let mut props = SecurityPropertiesOfHttpRequest {
            method: "GET".into(),
            content_type: Some("multipart/form-data; boundary=x".into()),
            ..Default::default()
        };
        assert!(props.could_be_simple_request());

        props.method = "PUT".into();
        assert!(!props.could_be_simple_request());

        props.method = "POST".into();
        props.forced_complex = true;
        assert!(!props.could_be_simple_request());
    }

    #[test]
    fn falls_back_to_referer_origin() {
        let props = SecurityPropertiesOfHttpRequest {
            origin: None,
            referer: Some("https://evil.test/path?x=1".into()),
            ..Default::default()
        };
        assert_eq!(props.effective_origin(), Some("https://evil.test"));
    }
}
