//! Content negotiation and result shaping.

use http::StatusCode;
use serde_json::Value;

use crate::error::{Error, Result};

/// The outcome of one successful call, already shaped for the wire.
#[derive(Debug, Clone)]
pub enum OutgoingBody {
    /// `application/json; charset=utf-8`, the default.
    Json(Value),
    /// A method that explicitly set `text/html`; MUST be a string.
    Html(String),
    /// Raw bytes, any content type the method set explicitly.
    Bytes { content_type: String, bytes: Vec<u8> },
}

impl OutgoingBody {
    pub fn content_type(&self) -> &str {
        match self {
            OutgoingBody::Json(_) => "application/json; charset=utf-8",
            OutgoingBody::Html(_) => "text/html; charset=utf-8",
            OutgoingBody::Bytes { content_type, .. } => content_type,
        }
    }
}

/// Builds the final response body for a method's return value, given
/// whether the method declared a non-default content type.
///
/// `declared_content_type` models "the method explicitly set another
/// content type"; `Some("text/html")` requires `result` to
/// be a JSON string, surfaced as an [`Error::Argument`] otherwise.
pub fn shape_result(result: Value, declared_content_type: Option<&str>) -> Result<OutgoingBody> {
    match declared_content_type {
        None | Some("application/json") => Ok(OutgoingBody::Json(result)),
        Some("text/html") => match result {
            Value::String(s) => Ok(OutgoingBody::Html(s)),
            _ => Err(Error::Argument("a method returning text/html must return a string".into())),
        },
        Some(other) => match result {
            Value::String(s) => Ok(OutgoingBody::Bytes { content_type: other.to_owned(), bytes: s.into_bytes() }),
            Value::Array(_) | Value::Object(_) => Ok(OutgoingBody::Json(result)),
            _ => Err(Error::Argument(format!("cannot encode a {other} response from this return value"))),
        },
    }
}

/// Status codes for the non-success cases: 401 for session-identified
/// not-logged-in errors, 403 for CSRF denial, 550 for a thrown non-Error
/// value. `Error::status_code` already covers the rest.
pub fn status_for(error: &Error) -> StatusCode {
    error.status_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_content_type_is_json() {
        let body = shape_result(Value::from(1), None).unwrap();
        assert!(matches!(body, OutgoingBody::Json(_)));
        assert_eq!(body.content_type(), "application/json; charset=utf-8");
    }

    #[test]
    fn html_requires_a_string_result() {
        assert!(shape_result(Value::from(1), Some("text/html")).is_err());
        assert!(shape_result(Value::String("<p>ok</p>".into()), Some("text/html")).is_ok());
    }
}
