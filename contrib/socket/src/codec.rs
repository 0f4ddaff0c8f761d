//! The extended-JSON codec carried over the socket wire. Plain JSON has no
//! way to distinguish `undefined` from `null` or to carry arbitrary-precision
//! integers, so extended values
//! that need one of those three shapes are wrapped in a single-key tagged
//! object (`{"$bigint": "…"}`, `{"$date": "…"}`, `{"$undefined": true}`) on
//! the wire; everything else round-trips as ordinary JSON.
use std::collections::BTreeMap;

use serde::{de, ser, Deserialize, Serialize};

const BIGINT_TAG: &str = "$bigint";
const DATE_TAG: &str = "$date";
const UNDEFINED_TAG: &str = "$undefined";

#[derive(Debug, Clone, PartialEq)]
pub enum ExtValue {
    Null,
    /// Distinct from `Null` on the wire.
    Undefined,
    Bool(bool),
    Number(f64),
    /// Carried as a decimal ASCII string so precision survives JS's
    /// 53-bit float mantissa.
    BigInt(String),
    String(String),
    Date(String),
    Array(Vec<ExtValue>),
    Object(BTreeMap<String, ExtValue>),
}

impl ExtValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ExtValue::Undefined)
    }
}

impl From<serde_json::Value> for ExtValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ExtValue::Null,
            serde_json::Value::Bool(b) => ExtValue::Bool(b),
            serde_json::Value::Number(n) => ExtValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => ExtValue::String(s),
            serde_json::Value::Array(items) => ExtValue::Array(items.into_iter().map(ExtValue::from).collect()),
            serde_json::Value::Object(map) => {
                ExtValue::Object(map.into_iter().map(|(k, v)| (k, ExtValue::from(v))).collect())
            }
        }
    }
}

impl Serialize for ExtValue {
    fn serialize<S: ser::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        match self {
            ExtValue::Null => ser.serialize_unit(),
            ExtValue::Bool(b) => ser.serialize_bool(*b),
            ExtValue::Number(n) => ser.serialize_f64(*n),
            ExtValue::String(s) => ser.serialize_str(s),
            ExtValue::Array(items) => items.serialize(ser),
            ExtValue::Object(map) => map.serialize(ser),
            ExtValue::Undefined => {
                let mut map = ser.serialize_map(Some(1))?;
                map.serialize_entry(UNDEFINED_TAG, &true)?;
                map.end()
            }
            ExtValue::BigInt(digits) => {
                let mut map = ser.serialize_map(Some(1))?;
                map.serialize_entry(BIGINT_TAG, digits)?;
                map.end()
            }
            ExtValue::Date(iso) => {
                let mut map = ser.serialize_map(Some(1))?;
                map.serialize_entry(DATE_TAG, iso)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ExtValue {
    fn deserialize<D: de::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(de)?;
        Ok(from_tagged_json(raw))
    }
}

fn from_tagged_json(value: serde_json::Value) -> ExtValue {
    match value {
        serde_json::Value::Object(map) if map.len() == 1 => {
            if let Some(serde_json::Value::String(digits)) = map.get(BIGINT_TAG) {
                return ExtValue::BigInt(digits.clone());
            }
            if let Some(serde_json::Value::String(iso)) = map.get(DATE_TAG) {
                return ExtValue::Date(iso.clone());
            }
            if map.get(UNDEFINED_TAG).is_some() {
                return ExtValue::Undefined;
            }
            ExtValue::Object(map.into_iter().map(|(k, v)| (k, from_tagged_json(v))).collect())
        }
        serde_json::Value::Object(map) => {
            ExtValue::Object(map.into_iter().map(|(k, v)| (k, from_tagged_json(v))).collect())
        }
        serde_json::Value::Array(items) => ExtValue::Array(items.into_iter().map(from_tagged_json).collect()),
        serde_json::Value::Null => ExtValue::Null,
        serde_json::Value::Bool(b) => ExtValue::Bool(b),
        serde_json::Value::Number(n) => ExtValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => ExtValue::String(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_round_trips_distinct_from_null() {
        let wire = serde_json::to_string(&ExtValue::Undefined).unwrap();
        let back: ExtValue = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, ExtValue::Undefined);
        assert_ne!(back, ExtValue::Null);
    }

    #[test]
    fn bigint_round_trips_as_a_decimal_string() {
        let wire = serde_json::to_string(&ExtValue::BigInt("9007199254740992".into())).unwrap();
        let back: ExtValue = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, ExtValue::BigInt("9007199254740992".into()));
    }

    #[test]
    fn plain_values_round_trip_as_ordinary_json() {
        let value = ExtValue::Object(BTreeMap::from([
            ("name".to_owned(), ExtValue::String("a".into())),
            ("count".to_owned(), ExtValue::Number(3.0)),
        ]));
        let wire = serde_json::to_string(&value).unwrap();
        let back: ExtValue = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, value);
    }
}
