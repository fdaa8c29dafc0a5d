//! Conversion between CEL values and JSON.
//!
//! JSON numbers become `Int` when they fit in an `i64`, then `UInt`, then
//! `Double`. In the other direction timestamps serialize as RFC 3339
//! strings with a `+00:00` offset and durations as whole nanoseconds, or
//! as a float when the nanosecond count does not fit in an `i64`.

use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};

use super::{MapKey, Value, ValueMap};

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Double)
                }
            }
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => {
                Value::list(items.iter().map(Value::from).collect::<Vec<_>>())
            }
            serde_json::Value::Object(members) => members
                .iter()
                .map(|(k, v)| (MapKey::from(k.as_str()), Value::from(v)))
                .collect::<ValueMap>()
                .into(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.collect_seq(b.iter()),
            Value::List(items) => serializer.collect_seq(items.iter()),
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (key, value) in m.iter() {
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
            Value::Struct(s) => {
                let mut map = serializer.serialize_map(None)?;
                for (field, value) in s.fields() {
                    map.serialize_entry(field, value)?;
                }
                map.end()
            }
            Value::Timestamp(ts) => match ts.to_datetime_utc() {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => Err(S::Error::custom("timestamp out of range")),
            },
            // Durations past roughly 292 years overflow i64 nanoseconds.
            Value::Duration(d) => match i64::try_from(d.total_nanos()) {
                Ok(nanos) => serializer.serialize_i64(nanos),
                Err(_) => serializer.serialize_f64(d.total_nanos() as f64),
            },
            Value::Unknown(u) => Err(S::Error::custom(format!(
                "cannot serialize a value that depends on unknown variables: {}",
                u.attributes().collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}
