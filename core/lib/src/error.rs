//! Central error type for the engine.
//!
//! One `thiserror`-derived enum covering every failure kind, each mapped to
//! its wire status code.

use http::StatusCode;

/// Every way a call into this engine can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong type, wrong arity, unknown named key, or a forbidden mixture of
    /// named and positional arguments at the same position.
    #[error("argument error: {0}")]
    Argument(String),

    /// CSRF/origin/mode/token denial. The `reason` is
    /// logged server-side only; callers only ever see a uniform message.
    #[error("cross-origin request denied")]
    SecurityDenied { reason: &'static str },

    /// The named method does not exist, isn't marked remote, or collides
    /// with a reserved identifier.
    #[error("method error: {0}")]
    Method(#[from] crate::registry::MethodLookupError),

    /// The user's method body returned an error. `status` defaults to 500
    /// unless the error is a recognized "communication error" carrying its
    /// own status.
    #[error("{message}")]
    Raised { message: String, name: String, status: StatusCode, cause: Option<String> },

    /// A thrown, non-error value; surfaced to the client with status 550 so
    /// it can re-raise the original payload.
    #[error("non-error value raised")]
    RaisedValue(serde_json::Value),

    /// Malformed envelope, oversized payload, or a disallowed return type
    /// crossing the socket. Fatal: the connection closes.
    #[error("transport error: {0}")]
    TransportFatal(String),

    /// All siblings of a `SingleRetryableOperation` observe this same error;
    /// the next caller retries from scratch rather than reusing it.
    #[error("concurrent initialization failed: {0}")]
    ConcurrentInit(String),

    #[error("token error: {0}")]
    Token(#[from] crate::token::TokenError),

    #[error("session store error: {0}")]
    Session(String),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// The call context was touched from a detached continuation after the
    /// request was aborted or the connection closed.
    #[error("cannot access call context: {0}")]
    ContextInvalidated(&'static str),
}

impl Error {
    /// The HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Argument(_) => StatusCode::BAD_REQUEST,
            Error::SecurityDenied { .. } => StatusCode::FORBIDDEN,
            Error::Method(_) => StatusCode::NOT_FOUND,
            Error::Raised { status, .. } => *status,
            Error::RaisedValue(_) => StatusCode::from_u16(550).expect("valid status"),
            Error::TransportFatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ConcurrentInit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Token(_) => StatusCode::FORBIDDEN,
            Error::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ContextInvalidated(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error should be logged server-side with details, as
    /// opposed to the uniform public message the client gets for denials.
    pub fn log_details(&self) -> bool {
        !matches!(self, Error::SecurityDenied { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
