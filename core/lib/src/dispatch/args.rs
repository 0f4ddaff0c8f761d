//! The argument-binding grammar: path segments, query, and body merge into
//! one positional/named argument list, then coerce to each parameter's
//! declared type.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::registry::{ParamDescriptor, ParamKind};

use super::request::{Body, RawHttpCall};

/// Parameters accepted in every channel but stripped before argument
/// binding.
pub const META_PARAM_NAMES: &[&str] = &["csrfProtectionMode"];

/// One raw argument slot before type coercion: either it arrived
/// positionally (path segments, bare comma-separated query, a JSON array
/// body) or by name (named query keys, a JSON/form object body).
#[derive(Debug, Clone)]
enum RawArg {
    Positional(String),
    Named(String, Value),
}

/// Splits `query` into bare comma-separated positional values (no `=`) or
/// named key/value pairs: queries with named keys become a name→value map;
/// bare comma-separated query values become positional.
fn parse_query(query: &str) -> Result<Vec<RawArg>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    if !query.contains('=') && query.contains(',') || (!query.contains('=') && !query.is_empty()) {
        return Ok(query.split(',').map(|s| RawArg::Positional(s.to_owned())).collect());
    }

    let mut args = Vec::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::Argument(format!("malformed query parameter `{pair}`"))
        })?;
        let decoded = percent_encoding::percent_decode_str(value)
            .decode_utf8()
            .map_err(|e| Error::Argument(format!("invalid percent-encoding in query: {e}")))?;
        args.push(RawArg::Named(key.to_owned(), Value::String(decoded.into_owned())));
    }
    Ok(args)
}

/// Coerces a raw query/path string to a parameter's declared type:
/// integers, floats, `NaN`/`±Infinity`, `0x`-prefixed hex, ISO-8601 dates,
/// `true`/`false`, empty string → absent.
fn coerce_string(raw: &str, kind: ParamKind) -> Result<Value> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    match kind {
        ParamKind::String | ParamKind::Any => Ok(Value::String(raw.to_owned())),
        ParamKind::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(Error::Argument(format!("`{raw}` is not a boolean"))),
        },
        ParamKind::Number => {
            if raw == "NaN" {
                return Ok(Value::String("NaN".into()));
            }
            if raw == "Infinity" || raw == "-Infinity" {
                return Ok(Value::String(raw.to_owned()));
            }
            if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
                let n = i64::from_str_radix(hex, 16)
                    .map_err(|_| Error::Argument(format!("`{raw}` is not a valid hex number")))?;
                return Ok(Value::from(n));
            }
            serde_json::Number::from_string_unchecked_or_parse(raw)
                .ok_or_else(|| Error::Argument(format!("`{raw}` is not a number")))
                .map(Value::Number)
        }
        ParamKind::Date => {
            time::OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339)
                .map_err(|_| Error::Argument(format!("`{raw}` is not an ISO-8601 date")))?;
            Ok(Value::String(raw.to_owned()))
        }
        ParamKind::BigInt => Ok(Value::String(raw.to_owned())),
        ParamKind::ByteStream | ParamKind::Callback => {
            Err(Error::Argument("byte-stream and callback parameters cannot be bound from a plain string".into()))
        }
    }
}

/// Helper: `serde_json::Number` has no public fallible string parser that
/// distinguishes ints/floats the way we need, so this wraps the standard
/// parse paths in one place.
trait NumberFromStringExt {
    fn from_string_unchecked_or_parse(raw: &str) -> Option<serde_json::Number>;
}

impl NumberFromStringExt for serde_json::Number {
    fn from_string_unchecked_or_parse(raw: &str) -> Option<serde_json::Number> {
        if let Ok(i) = raw.parse::<i64>() {
            return Some(serde_json::Number::from(i));
        }
        if let Ok(f) = raw.parse::<f64>() {
            return serde_json::Number::from_f64(f);
        }
        None
    }
}

/// The merged, still-uncoerced argument set for one call, before binding
/// against `ParamDescriptor`s.
#[derive(Debug, Default)]
struct MergedArgs {
    positional: Vec<Value>,
    named: std::collections::HashMap<String, Value>,
}

fn body_to_args(body: &Body) -> Result<MergedArgs> {
    let mut merged = MergedArgs::default();

    match body {
        Body::Empty => {}
        Body::Json(Value::Array(items)) => merged.positional = items.clone(),
        Body::Json(Value::Object(map)) => {
            for (k, v) in map {
                merged.named.insert(k.clone(), v.clone());
            }
        }
        Body::Json(other) => {
            // A bare JSON scalar (string/number/bool/null) becomes one
            // positional argument; anything else would be ambiguous.
            merged.positional.push(other.clone());
        }
        Body::FormUrlEncoded(pairs) => {
            for (k, v) in pairs {
                merged.named.insert(k.clone(), Value::String(v.clone()));
            }
        }
        Body::PlainText(text) => merged.positional.push(Value::String(text.clone())),
        Body::Octet(bytes) => merged.positional.push(Value::String(
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes),
        )),
        Body::Multipart(parts) => {
            for part in parts {
                merged.named.insert(part.name.clone(), part.as_value());
            }
        }
    }

    Ok(merged)
}

/// Extracts and strips meta parameters from the merged named-argument map,
/// returning the declared `csrfProtectionMode`, if any.
fn extract_meta(named: &mut std::collections::HashMap<String, Value>) -> Option<String> {
    for meta in META_PARAM_NAMES {
        if let Some(Value::String(s)) = named.remove(*meta) {
            return Some(s);
        }
        named.remove(*meta);
    }
    None
}

/// Merges path segments, query, and body in that order — path first
/// (positional), then query, then body. Duplicate named parameters across
/// query and body are a hard error; unknown names fail unless the method
/// opts into `trimArguments`.
pub fn bind_arguments(
    call: &RawHttpCall,
    params: &[ParamDescriptor],
    trim_arguments: bool,
) -> Result<(Vec<Value>, Option<String>)> {
    let mut positional: Vec<Value> = call.path_args.iter().map(|s| Value::String(s.clone())).collect();

    let mut query_args = parse_query(&call.query)?;
    let mut named: std::collections::HashMap<String, Value> = std::collections::HashMap::new();

    for arg in query_args.drain(..) {
        match arg {
            RawArg::Positional(s) => positional.push(Value::String(s)),
            RawArg::Named(k, v) => {
                named.insert(k, v);
            }
        }
    }

    let body_args = body_to_args(&call.body)?;
    positional.extend(body_args.positional);

    for (k, v) in body_args.named {
        if named.insert(k.clone(), v).is_some() {
            return Err(Error::Argument(format!("Cannot set {k} through named parameters more than once")));
        }
    }

    let declared_mode = extract_meta(&mut named);

    if !trim_arguments {
        let known: std::collections::HashSet<&str> = params.iter().map(|p| p.name.as_str()).collect();
        for key in named.keys() {
            if !known.contains(key.as_str()) {
                return Err(Error::Argument(format!("unknown parameter `{key}`")));
            }
        }
    }

    let mut bound = Vec::with_capacity(params.len());
    for (idx, param) in params.iter().enumerate() {
        let raw = if let Some(named_value) = named.remove(&param.name) {
            named_value
        } else if let Some(positional_value) = positional.get(idx).cloned() {
            positional_value
        } else if param.variadic {
            Value::Array(positional.get(idx..).map(|s| s.to_vec()).unwrap_or_default())
        } else {
            Value::Null
        };

        bound.push(match raw {
            Value::String(s) => coerce_string(&s, param.kind)?,
            other => other,
        });
    }

    Ok((bound, declared_mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_param(name: &str) -> ParamDescriptor {
        ParamDescriptor { name: name.to_owned(), kind: ParamKind::String, variadic: false }
    }

    #[test]
    fn query_named_keys_bind_by_name() {
        let call = RawHttpCall {
            path_args: vec![],
            query: "name=a&authorFilter=b".into(),
            body: Body::Empty,
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name"), string_param("authorFilter")];
        let (args, _) = bind_arguments(&call, &params, false).unwrap();
        assert_eq!(args, vec![Value::String("a".into()), Value::String("b".into())]);
    }

    #[test]
    fn bare_comma_query_binds_positionally() {
        let call = RawHttpCall {
            path_args: vec![],
            query: "a,b".into(),
            body: Body::Empty,
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name"), string_param("authorFilter")];
        let (args, _) = bind_arguments(&call, &params, false).unwrap();
        assert_eq!(args, vec![Value::String("a".into()), Value::String("b".into())]);
    }

    #[test]
    fn path_segment_then_query_key() {
        let call = RawHttpCall {
            path_args: vec!["a".into()],
            query: "authorFilter=b".into(),
            body: Body::Empty,
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name"), string_param("authorFilter")];
        let (args, _) = bind_arguments(&call, &params, false).unwrap();
        assert_eq!(args, vec![Value::String("a".into()), Value::String("b".into())]);
    }

    #[test]
    fn json_object_body_binds_by_name_with_null_for_missing() {
        let call = RawHttpCall {
            path_args: vec![],
            query: "".into(),
            body: Body::Json(serde_json::json!({ "name": "a" })),
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name"), string_param("authorFilter")];
        let (args, _) = bind_arguments(&call, &params, false).unwrap();
        assert_eq!(args, vec![Value::String("a".into()), Value::Null]);
    }

    #[test]
    fn form_urlencoded_body_binds_like_keyed_object() {
        let call = RawHttpCall {
            path_args: vec![],
            query: "".into(),
            body: Body::FormUrlEncoded(vec![("name".into(), "a".into()), ("authorFilter".into(), "b".into())]),
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name"), string_param("authorFilter")];
        let (args, _) = bind_arguments(&call, &params, false).unwrap();
        assert_eq!(args, vec![Value::String("a".into()), Value::String("b".into())]);
    }

    #[test]
    fn duplicate_named_parameter_across_query_and_body_is_an_error() {
        let call = RawHttpCall {
            path_args: vec![],
            query: "name=a".into(),
            body: Body::Json(serde_json::json!({ "name": "b" })),
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name")];
        let err = bind_arguments(&call, &params, false).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn unknown_parameter_name_is_rejected_unless_trimmed() {
        let call = RawHttpCall {
            path_args: vec![],
            query: "bogus=1".into(),
            body: Body::Empty,
            ..RawHttpCall::default()
        };
        let params = vec![string_param("name")];
        assert!(bind_arguments(&call, &params, false).is_err());
        assert!(bind_arguments(&call, &params, true).is_ok());
    }

    #[test]
    fn numeric_path_segment_coerces_to_a_float() {
        let call = RawHttpCall {
            path_args: vec!["-12345.67".into()],
            query: "".into(),
            body: Body::Empty,
            ..RawHttpCall::default()
        };
        let params = vec![ParamDescriptor { name: "n".into(), kind: ParamKind::Number, variadic: false }];
        let (args, _) = bind_arguments(&call, &params, false).unwrap();
        assert_eq!(args, vec![Value::from(-12345.67)]);
    }
}
