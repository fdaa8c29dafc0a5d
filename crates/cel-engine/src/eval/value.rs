//! Runtime values for CEL evaluation.
//!
//! `Value` is a closed tagged union. Collections are reference counted so
//! cloning a value never copies its contents, and values are never mutated
//! once built.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::time;

/// A CEL runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    List(Arc<[Value]>),
    /// Key-value map with deterministic (sorted) iteration order.
    Map(Arc<ValueMap>),
    /// Record built by a struct literal such as `Point{x: 1, y: 2}`.
    Struct(Arc<StructValue>),
    Timestamp(Timestamp),
    Duration(Duration),
    /// Result that depends on context variables declared unknown.
    Unknown(Arc<UnknownSet>),
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Earliest representable timestamp, 0001-01-01T00:00:00Z.
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// Latest representable timestamp, 9999-12-31T23:59:59Z.
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
/// Roughly ten thousand years either way.
const MAX_DURATION_SECONDS: i64 = 315_576_000_000;

/// A CEL timestamp value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Seconds since Unix epoch.
    pub seconds: i64,
    /// Nanoseconds (0..999_999_999).
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Create a timestamp from seconds since Unix epoch.
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() as i32,
        }
    }

    /// Build a timestamp from nanoseconds since the epoch, if it is in range.
    pub fn from_total_nanos(total: i128) -> Option<Self> {
        let seconds = i64::try_from(total.div_euclid(NANOS_PER_SECOND)).ok()?;
        let nanos = total.rem_euclid(NANOS_PER_SECOND) as i32;
        let ts = Self { seconds, nanos };
        ts.is_valid().then_some(ts)
    }

    pub fn total_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND + self.nanos as i128
    }

    /// Whether the timestamp lies within years 0001 through 9999.
    pub fn is_valid(&self) -> bool {
        (MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&self.seconds)
            && (0..1_000_000_000).contains(&self.nanos)
    }

    pub fn to_datetime_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, u32::try_from(self.nanos).ok()?)
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self > other
    }
}

/// A CEL duration value.
///
/// `seconds` and `nanos` always carry the same sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    pub seconds: i64,
    /// Nanoseconds component (0..999_999_999 for positive durations,
    /// -999_999_999..0 for negative durations).
    pub nanos: i32,
}

impl Duration {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Build a duration from a nanosecond count, if it is in range.
    pub fn from_total_nanos(total: i128) -> Option<Self> {
        let seconds = i64::try_from(total / NANOS_PER_SECOND).ok()?;
        let nanos = (total % NANOS_PER_SECOND) as i32;
        let d = Self { seconds, nanos };
        d.is_valid().then_some(d)
    }

    pub fn total_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND + self.nanos as i128
    }

    pub fn is_negative(&self) -> bool {
        self.seconds < 0 || (self.seconds == 0 && self.nanos < 0)
    }

    pub fn is_valid(&self) -> bool {
        self.seconds.abs() <= MAX_DURATION_SECONDS
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_nanos().cmp(&other.total_nanos())
    }
}

/// Names of the unknown context variables a value depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownSet {
    attributes: BTreeSet<Arc<str>>,
}

impl UnknownSet {
    pub fn new(attribute: impl Into<Arc<str>>) -> Self {
        Self {
            attributes: BTreeSet::from([attribute.into()]),
        }
    }

    pub fn merge(&mut self, other: &UnknownSet) {
        self.attributes.extend(other.attributes.iter().cloned());
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Attribute names in sorted order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.as_ref())
    }
}

/// A map key. CEL allows bool, int, uint, and string as map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    String(Arc<str>),
}

impl MapKey {
    /// Create a map key from a Value, if it has a key type.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(i) => Some(MapKey::Int(*i)),
            Value::UInt(u) => Some(MapKey::UInt(*u)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::UInt(u) => Value::UInt(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }

    /// Keys a lookup with `value` may match. Numeric keys match across
    /// int, uint and integral doubles.
    fn lookup_candidates(value: &Value) -> [Option<MapKey>; 2] {
        match value {
            Value::Int(i) => [
                Some(MapKey::Int(*i)),
                u64::try_from(*i).ok().map(MapKey::UInt),
            ],
            Value::UInt(u) => [
                Some(MapKey::UInt(*u)),
                i64::try_from(*u).ok().map(MapKey::Int),
            ],
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => [
                double_to_i64(*d).map(MapKey::Int),
                double_to_u64(*d).map(MapKey::UInt),
            ],
            other => [MapKey::from_value(other), None],
        }
    }
}

impl fmt::Display for MapKey {
    /// Plain rendering, used where keys must become strings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{}", b),
            MapKey::Int(i) => write!(f, "{}", i),
            MapKey::UInt(u) => write!(f, "{}", u),
            MapKey::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(Arc::from(s))
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::String(Arc::from(s))
    }
}

/// A CEL map with heterogeneous keys.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: BTreeMap<MapKey, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Get a value by exact key.
    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Get a value by a runtime key, matching numerically equal keys of
    /// other numeric types.
    pub fn get_value(&self, key: &Value) -> Option<&Value> {
        MapKey::lookup_candidates(key)
            .into_iter()
            .flatten()
            .find_map(|k| self.entries.get(&k))
    }

    pub fn contains_value(&self, key: &Value) -> bool {
        self.get_value(key).is_some()
    }

    pub fn insert(&mut self, key: MapKey, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

impl FromIterator<(MapKey, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (MapKey, Value)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

/// A named record with string fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    type_name: Arc<str>,
    fields: BTreeMap<Arc<str>, Value>,
}

impl StructValue {
    pub fn new(
        type_name: impl Into<Arc<str>>,
        fields: impl IntoIterator<Item = (Arc<str>, Value)>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            fields: fields.into_iter().collect(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

// ==================== Value Constructors ====================

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn list(elements: impl Into<Arc<[Value]>>) -> Self {
        Value::List(elements.into())
    }

    pub fn map(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Value::Map(Arc::new(ValueMap::from_entries(entries)))
    }

    pub fn timestamp(seconds: i64, nanos: i32) -> Self {
        Value::Timestamp(Timestamp::new(seconds, nanos))
    }

    pub fn duration(seconds: i64, nanos: i32) -> Self {
        Value::Duration(Duration::new(seconds, nanos))
    }

    pub fn unknown(attribute: impl Into<Arc<str>>) -> Self {
        Value::Unknown(Arc::new(UnknownSet::new(attribute)))
    }
}

// ==================== Type Information ====================

impl Value {
    /// The CEL type name of this value, as used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null_type",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Struct(s) => s.type_name(),
            Value::Timestamp(_) => "google.protobuf.Timestamp",
            Value::Duration(_) => "google.protobuf.Duration",
            Value::Unknown(_) => "unknown",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Double(_))
    }
}

// ==================== Value Conversions ====================

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_unknown(&self) -> Option<&UnknownSet> {
        match self {
            Value::Unknown(u) => Some(u),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
    f32 => Double,
    f64 => Double,
    &str => String,
    String => String,
    Vec<u8> => Bytes,
    Vec<Value> => List,
    Timestamp => Timestamp,
    Duration => Duration,
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(Arc::new(map))
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(Arc::new(s))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ==================== Numeric Comparison ====================

/// 2^63 as a double, the first value above the i64 range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
/// 2^64 as a double, the first value above the u64 range.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

pub(crate) fn double_to_i64(d: f64) -> Option<i64> {
    (d >= -I64_BOUND && d < I64_BOUND).then(|| d as i64)
}

pub(crate) fn double_to_u64(d: f64) -> Option<u64> {
    (d > -1.0 && d < U64_BOUND).then(|| d as u64)
}

/// Exact comparison of an integer with a double.
fn cmp_int_double(i: i64, d: f64) -> Option<Ordering> {
    if d.is_nan() {
        return None;
    }
    if d >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if d < -I64_BOUND {
        return Some(Ordering::Greater);
    }
    let whole = d.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0.partial_cmp(&(d - whole)),
        ord => Some(ord),
    }
}

fn cmp_uint_double(u: u64, d: f64) -> Option<Ordering> {
    if d.is_nan() {
        return None;
    }
    if d >= U64_BOUND {
        return Some(Ordering::Less);
    }
    if d < 0.0 {
        return Some(Ordering::Greater);
    }
    let whole = d.trunc();
    match u.cmp(&(whole as u64)) {
        Ordering::Equal => 0.0.partial_cmp(&(d - whole)),
        ord => Some(ord),
    }
}

fn cmp_int_uint(i: i64, u: u64) -> Ordering {
    match u64::try_from(i) {
        Ok(i) => i.cmp(&u),
        Err(_) => Ordering::Less,
    }
}

/// Compare two numeric values by mathematical value. `None` when either
/// side is NaN or not numeric.
pub(crate) fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::UInt(b)) => Some(cmp_int_uint(*a, *b)),
        (Value::UInt(a), Value::Int(b)) => Some(cmp_int_uint(*b, *a).reverse()),
        (Value::Int(a), Value::Double(b)) => cmp_int_double(*a, *b),
        (Value::Double(a), Value::Int(b)) => cmp_int_double(*b, *a).map(Ordering::reverse),
        (Value::UInt(a), Value::Double(b)) => cmp_uint_double(*a, *b),
        (Value::Double(a), Value::UInt(b)) => cmp_uint_double(*b, *a).map(Ordering::reverse),
        _ => None,
    }
}

// ==================== Equality ====================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                compare_numeric(a, b) == Some(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, va)| b.get_value(&key.to_value()) == Some(va))
            }
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Unknown(a), Value::Unknown(b)) => a == b,
            _ => false,
        }
    }
}

// ==================== Comparison ====================

impl Value {
    /// Compare two values, returning an ordering if they are comparable.
    ///
    /// Values of the same kind compare naturally; int, uint and double
    /// compare with each other by mathematical value.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            (a, b) => compare_numeric(a, b),
        }
    }
}

// ==================== Display ====================

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("b\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\x{:02x}", b)?,
        }
    }
    f.write_str("\"")
}

fn write_separated<T>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
    mut write_item: impl FnMut(&mut fmt::Formatter<'_>, T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_item(f, item)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}u", v),
            Value::Double(v) if v.is_nan() => write!(f, "NaN"),
            Value::Double(v) if v.is_infinite() => {
                let sign = if v.is_sign_positive() { '+' } else { '-' };
                write!(f, "{}infinity", sign)
            }
            Value::Double(v) => write!(f, "{:?}", v),
            Value::String(v) => write!(f, "{:?}", v.as_ref()),
            Value::Bytes(v) => write_bytes(f, v),
            Value::List(items) => {
                f.write_str("[")?;
                write_separated(f, items.iter(), |f, item| write!(f, "{}", item))?;
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                write_separated(f, m.iter(), |f, (k, v)| {
                    write!(f, "{}: {}", k.to_value(), v)
                })?;
                f.write_str("}")
            }
            Value::Struct(s) => {
                write!(f, "{}{{", s.type_name())?;
                write_separated(f, s.fields(), |f, (k, v)| write!(f, "{}: {}", k, v))?;
                f.write_str("}")
            }
            Value::Timestamp(t) => write!(f, "timestamp(\"{}\")", time::format_timestamp(t)),
            Value::Duration(d) => write!(f, "duration(\"{}\")", time::format_duration(d)),
            Value::Unknown(u) => {
                f.write_str("unknown(")?;
                write_separated(f, u.attributes(), |f, a| f.write_str(a))?;
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_types() {
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_ne!(Value::Int(42), Value::Int(43));
        assert_eq!(Value::Int(42), Value::UInt(42));
        assert_eq!(Value::UInt(1), Value::Double(1.0));
        assert_ne!(Value::Int(-1), Value::UInt(u64::MAX));
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_eq!(Value::string("hello"), Value::string("hello"));
    }

    #[test]
    fn mismatched_kinds_are_unequal() {
        assert_ne!(Value::Int(1), Value::string("1"));
        assert_ne!(Value::Null, Value::Bool(false));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn comparison() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(Value::Int(2).compare(&Value::Int(1)), Some(Ordering::Greater));
        assert_eq!(Value::Int(-1).compare(&Value::UInt(1)), Some(Ordering::Less));
        assert_eq!(Value::Int(1).compare(&Value::Double(1.5)), Some(Ordering::Less));
        assert_eq!(Value::Double(-5.5).compare(&Value::Int(-5)), Some(Ordering::Less));
        assert_eq!(Value::string("a").compare(&Value::Int(1)), None);
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Int(1)), None);
    }

    #[test]
    fn comparison_is_exact_at_the_edges_of_double_precision() {
        // 2^53 + 1 has no exact double representation.
        let big = (1i64 << 53) + 1;
        let double = (1i64 << 53) as f64;
        assert_eq!(Value::Int(big).compare(&Value::Double(double)), Some(Ordering::Greater));
        assert_eq!(
            Value::Int(i64::MAX).compare(&Value::Double(I64_BOUND)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::UInt(u64::MAX).compare(&Value::Double(U64_BOUND)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::UInt(0).compare(&Value::Double(-0.5)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn map_lookup_is_heterogeneous() {
        let map = ValueMap::from_entries([
            (MapKey::Int(1), Value::from("one")),
            (MapKey::UInt(2), Value::from("two")),
            (MapKey::from("k"), Value::from("key")),
        ]);

        assert_eq!(map.get_value(&Value::UInt(1)), Some(&Value::from("one")));
        assert_eq!(map.get_value(&Value::Int(2)), Some(&Value::from("two")));
        assert_eq!(map.get_value(&Value::Double(1.0)), Some(&Value::from("one")));
        assert_eq!(map.get_value(&Value::Double(1.5)), None);
        assert_eq!(map.get_value(&Value::Int(-1)), None);
        assert_eq!(map.get_value(&Value::from("k")), Some(&Value::from("key")));
        assert!(!map.contains_value(&Value::Null));
    }

    #[test]
    fn map_equality_ignores_key_representation() {
        let a = Value::map([(MapKey::Int(1), Value::Int(10))]);
        let b = Value::map([(MapKey::UInt(1), Value::Double(10.0))]);
        let c = Value::map([(MapKey::UInt(1), Value::Int(11))]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn timestamp_range() {
        assert!(Timestamp::from_seconds(MIN_TIMESTAMP_SECONDS).is_valid());
        assert!(!Timestamp::from_seconds(MIN_TIMESTAMP_SECONDS - 1).is_valid());
        assert!(Timestamp::from_seconds(MAX_TIMESTAMP_SECONDS).is_valid());
        assert!(!Timestamp::from_seconds(MAX_TIMESTAMP_SECONDS + 1).is_valid());
    }

    #[test]
    fn timestamp_total_nanos_round_trip_before_epoch() {
        let ts = Timestamp::from_total_nanos(-1_500_000_000).unwrap();
        assert_eq!(ts, Timestamp::new(-2, 500_000_000));
        assert_eq!(ts.total_nanos(), -1_500_000_000);
        assert!(ts.is_before(&Timestamp::from_seconds(0)));
    }

    #[test]
    fn duration_ordering_respects_sign() {
        let a = Duration::from_total_nanos(-1_500_000_000).unwrap();
        assert_eq!(a, Duration::new(-1, -500_000_000));
        assert!(a.is_negative());
        assert!(a < Duration::from_seconds(-1));
        assert!(Duration::new(0, -1) > Duration::from_seconds(-1));
        assert!(Duration::from_total_nanos(i128::MAX).is_none());
    }

    #[test]
    fn unknown_sets_merge() {
        let mut a = UnknownSet::new("x");
        a.merge(&UnknownSet::new("y"));
        a.merge(&UnknownSet::new("x"));
        assert_eq!(a.attributes().collect::<Vec<_>>(), vec!["x", "y"]);
        assert!(a.contains("y"));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::UInt(42).to_string(), "42u");
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::Double(f64::NEG_INFINITY).to_string(), "-infinity");
        assert_eq!(Value::string("say \"hi\"").to_string(), r#""say \"hi\"""#);
        assert_eq!(Value::bytes(vec![b'a', 0xff]).to_string(), r#"b"a\xff""#);
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::from("a")]).to_string(),
            r#"[1, "a"]"#
        );
        assert_eq!(
            Value::map([(MapKey::from("k"), Value::Bool(true))]).to_string(),
            r#"{"k": true}"#
        );
        assert_eq!(
            Value::timestamp(1_672_534_800, 0).to_string(),
            r#"timestamp("2023-01-01T01:00:00Z")"#
        );
        assert_eq!(
            Value::duration(1, 500_000_000).to_string(),
            r#"duration("1.5s")"#
        );
        assert_eq!(Value::unknown("x").to_string(), "unknown(x)");
    }

    #[test]
    fn struct_display_and_access() {
        let point = StructValue::new("Point", [(Arc::from("x"), Value::Int(1))]);
        assert!(point.has("x"));
        assert!(!point.has("y"));
        assert_eq!(point.get("x"), Some(&Value::Int(1)));
        assert_eq!(Value::from(point).to_string(), "Point{x: 1}");
    }
}
