//! Built-in function implementations.
//!
//! Dispatch is fixed at check time: the evaluator hands each [`Builtin`]
//! its already evaluated arguments, receiver first for method calls.
//! Argument counts are validated by the checker, so the functions here only
//! reject argument kinds.

use cel_engine_checker::Builtin;

use super::time::{self, TimestampComponent};
use super::value::{double_to_i64, double_to_u64};
use super::{Duration, EvalError, Timestamp, Value};

/// Call a built-in with evaluated arguments.
pub(crate) fn call(builtin: Builtin, args: &[Value]) -> Result<Value, EvalError> {
    match builtin {
        Builtin::Size => size(args),
        Builtin::Contains => string_test(args, "contains", |s, sub| s.contains(sub)),
        Builtin::StartsWith => string_test(args, "startsWith", |s, p| s.starts_with(p)),
        Builtin::EndsWith => string_test(args, "endsWith", |s, p| s.ends_with(p)),
        Builtin::Max => extreme(args, "max", std::cmp::Ordering::Greater),
        Builtin::Min => extreme(args, "min", std::cmp::Ordering::Less),
        Builtin::Int => to_int(arg(args, 0)?),
        Builtin::UInt => to_uint(arg(args, 0)?),
        Builtin::Double => to_double(arg(args, 0)?),
        Builtin::String => to_string(arg(args, 0)?),
        Builtin::Bool => to_bool(arg(args, 0)?),
        Builtin::Bytes => to_bytes(arg(args, 0)?),
        Builtin::Timestamp => to_timestamp(arg(args, 0)?),
        Builtin::Duration => to_duration(arg(args, 0)?),
        Builtin::Dyn => arg(args, 0).cloned(),
        Builtin::GetFullYear => timestamp_field(args, "getFullYear", TimestampComponent::FullYear),
        Builtin::GetMonth => timestamp_field(args, "getMonth", TimestampComponent::Month),
        Builtin::GetDayOfYear => timestamp_field(args, "getDayOfYear", TimestampComponent::DayOfYear),
        Builtin::GetDayOfMonth => {
            timestamp_field(args, "getDayOfMonth", TimestampComponent::DayOfMonth)
        }
        Builtin::GetDate => timestamp_field(args, "getDate", TimestampComponent::Date),
        Builtin::GetDayOfWeek => timestamp_field(args, "getDayOfWeek", TimestampComponent::DayOfWeek),
        Builtin::GetHours => time_field(args, "getHours", TimestampComponent::Hours, 3_600_000_000_000),
        Builtin::GetMinutes => time_field(args, "getMinutes", TimestampComponent::Minutes, 60_000_000_000),
        Builtin::GetSeconds => time_field(args, "getSeconds", TimestampComponent::Seconds, 1_000_000_000),
        Builtin::GetMilliseconds => {
            time_field(args, "getMilliseconds", TimestampComponent::Milliseconds, 1_000_000)
        }
        Builtin::Matches => Err(EvalError::internal(
            "matches is evaluated by the regex node, not dispatched",
        )),
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, EvalError> {
    args.get(index)
        .ok_or_else(|| EvalError::internal(format!("missing argument {}", index)))
}

fn overload_error(function: &str, args: &[Value]) -> EvalError {
    EvalError::no_matching_overload(function, &args.iter().collect::<Vec<_>>())
}

fn size(args: &[Value]) -> Result<Value, EvalError> {
    let len = match arg(args, 0)? {
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        _ => return Err(overload_error("size", args)),
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| EvalError::overflow("size exceeds int range"))
}

fn string_test(
    args: &[Value],
    function: &str,
    test: impl Fn(&str, &str) -> bool,
) -> Result<Value, EvalError> {
    match (arg(args, 0)?, arg(args, 1)?) {
        (Value::String(s), Value::String(other)) => Ok(Value::Bool(test(&**s, &**other))),
        _ => Err(overload_error(function, args)),
    }
}

/// `max` and `min` over their arguments, or over the elements of a single
/// list argument.
fn extreme(
    args: &[Value],
    function: &str,
    wanted: std::cmp::Ordering,
) -> Result<Value, EvalError> {
    let candidates = match args {
        [Value::List(items)] => &items[..],
        _ => args,
    };
    let (first, rest) = candidates.split_first().ok_or_else(|| {
        EvalError::invalid_argument(format!("{}() requires at least one value", function))
    })?;

    let mut best = first;
    for candidate in rest {
        match candidate.compare(best) {
            Some(ord) if ord == wanted => best = candidate,
            Some(_) => {}
            None if candidate.is_numeric() && best.is_numeric() => {
                return Err(EvalError::invalid_argument(format!(
                    "{}() is undefined for NaN",
                    function
                )))
            }
            None => return Err(overload_error(function, candidates)),
        }
    }
    Ok(best.clone())
}

// ==================== Conversions ====================

fn to_int(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::UInt(u) => i64::try_from(*u)
            .map(Value::Int)
            .map_err(|_| EvalError::invalid_conversion(value, "int")),
        Value::Double(d) => double_to_i64(d.trunc())
            .map(Value::Int)
            .ok_or_else(|| EvalError::invalid_conversion(value, "int")),
        Value::String(s) => s
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::invalid_conversion(value, "int")),
        Value::Timestamp(ts) => Ok(Value::Int(ts.seconds)),
        other => Err(EvalError::no_matching_overload("int", &[other])),
    }
}

fn to_uint(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::UInt(u) => Ok(Value::UInt(*u)),
        Value::Int(i) => u64::try_from(*i)
            .map(Value::UInt)
            .map_err(|_| EvalError::invalid_conversion(value, "uint")),
        Value::Double(d) => double_to_u64(d.trunc())
            .map(Value::UInt)
            .ok_or_else(|| EvalError::invalid_conversion(value, "uint")),
        Value::String(s) => s
            .parse::<u64>()
            .map(Value::UInt)
            .map_err(|_| EvalError::invalid_conversion(value, "uint")),
        other => Err(EvalError::no_matching_overload("uint", &[other])),
    }
}

fn to_double(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Double(d) => Ok(Value::Double(*d)),
        Value::Int(i) => Ok(Value::Double(*i as f64)),
        Value::UInt(u) => Ok(Value::Double(*u as f64)),
        Value::String(s) => s
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| EvalError::invalid_conversion(value, "double")),
        other => Err(EvalError::no_matching_overload("double", &[other])),
    }
}

fn to_string(value: &Value) -> Result<Value, EvalError> {
    let s = match value {
        Value::String(_) => return Ok(value.clone()),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Bytes(b) => std::str::from_utf8(b)
            .map_err(|_| EvalError::invalid_conversion(value, "string"))?
            .to_string(),
        Value::Timestamp(ts) => time::format_timestamp(ts),
        Value::Duration(d) => time::format_duration(d),
        other => return Err(EvalError::no_matching_overload("string", &[other])),
    };
    Ok(Value::string(s))
}

fn to_bool(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) => match s.as_ref() {
            "true" | "TRUE" | "True" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "FALSE" | "False" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err(EvalError::invalid_conversion(value, "bool")),
        },
        other => Err(EvalError::no_matching_overload("bool", &[other])),
    }
}

fn to_bytes(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Bytes(_) => Ok(value.clone()),
        Value::String(s) => Ok(Value::bytes(s.as_bytes().to_vec())),
        other => Err(EvalError::no_matching_overload("bytes", &[other])),
    }
}

fn to_timestamp(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Timestamp(_) => Ok(value.clone()),
        Value::String(s) => time::parse_timestamp(s)
            .map(Value::Timestamp)
            .map_err(EvalError::invalid_argument),
        Value::Int(seconds) => {
            let ts = Timestamp::from_seconds(*seconds);
            if ts.is_valid() {
                Ok(Value::Timestamp(ts))
            } else {
                Err(EvalError::range(format!(
                    "timestamp {} is outside years 0001 to 9999",
                    seconds
                )))
            }
        }
        other => Err(EvalError::no_matching_overload("timestamp", &[other])),
    }
}

fn to_duration(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Duration(_) => Ok(value.clone()),
        Value::String(s) => time::parse_duration(s)
            .map(Value::Duration)
            .map_err(EvalError::invalid_argument),
        other => Err(EvalError::no_matching_overload("duration", &[other])),
    }
}

// ==================== Temporal Accessors ====================

fn timestamp_field(
    args: &[Value],
    function: &str,
    component: TimestampComponent,
) -> Result<Value, EvalError> {
    let Value::Timestamp(ts) = arg(args, 0)? else {
        return Err(overload_error(function, args));
    };
    let zone = match args.get(1) {
        None => None,
        Some(Value::String(tz)) => Some(time::parse_timezone(tz).map_err(EvalError::invalid_argument)?),
        Some(_) => return Err(overload_error(function, args)),
    };

    let field = match zone {
        Some(zone) => zone.datetime_from_timestamp(ts).map(|dt| component.extract(&dt)),
        None => ts.to_datetime_utc().map(|dt| component.extract(&dt)),
    };
    field
        .map(Value::Int)
        .ok_or_else(|| EvalError::range("timestamp out of range"))
}

/// Accessors shared by timestamps and durations. On a duration they return
/// the whole number of `unit_nanos` units it spans.
fn time_field(
    args: &[Value],
    function: &str,
    component: TimestampComponent,
    unit_nanos: i128,
) -> Result<Value, EvalError> {
    match (arg(args, 0)?, args.len()) {
        (Value::Duration(d), 1) => duration_total(d, unit_nanos),
        _ => timestamp_field(args, function, component),
    }
}

fn duration_total(d: &Duration, unit_nanos: i128) -> Result<Value, EvalError> {
    i64::try_from(d.total_nanos() / unit_nanos)
        .map(Value::Int)
        .map_err(|_| EvalError::overflow("duration total exceeds int range"))
}
