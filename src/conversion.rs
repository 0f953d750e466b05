//! Checked coercions from [`Value`] into the types requested by the application.
//!
//! Widening between integer types is allowed as long as the value is representable. Anything which
//! would truncate, wrap or round is rejected with [`Error::InvalidType`].

use atoi::FromRadix10SignedChecked;

use crate::{
    value::{Date, Time, Timestamp, Value},
    Error,
};

/// Types which can be extracted from a non-`NULL` [`Value`].
pub trait FromValue: Sized {
    /// Name of the type, used in error messages.
    const NAME: &'static str;

    fn from_value(value: &Value) -> Result<Self, Error>;
}

fn incompatible<T: FromValue>(value: &Value) -> Error {
    Error::invalid_type(format!("{} value {}", value.type_name(), value), T::NAME)
}

/// Integer view of the value, if it is an integer, a boolean or text holding an integer.
fn as_i128(value: &Value) -> Option<i128> {
    match value {
        Value::I16(v) => Some(i128::from(*v)),
        Value::U16(v) => Some(i128::from(*v)),
        Value::I32(v) => Some(i128::from(*v)),
        Value::I64(v) => Some(i128::from(*v)),
        Value::Bool(v) => Some(i128::from(*v)),
        Value::F32(v) => float_to_integer(f64::from(*v)),
        Value::F64(v) => float_to_integer(*v),
        Value::Text(text) => parse_integer(text),
        _ => None,
    }
}

fn float_to_integer(v: f64) -> Option<i128> {
    // `i64::MAX as f64` rounds up to 2^63, so values equal to the bound are already out of range.
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 2f64.powi(100)).then_some(v as i128)
}

/// Parses text consisting of an optional sign and decimal digits, surrounded by optional
/// whitespace. Decimals with a zero fraction (e.g. `"42.000"` as returned for `NUMERIC(5,3)`) are
/// accepted, too. Group separators are not, `"1,000"` is no integer.
fn parse_integer(text: &str) -> Option<i128> {
    let text = text.trim();
    let (integral, fraction) = match text.split_once('.') {
        Some((integral, fraction)) => (integral, Some(fraction)),
        None => (text, None),
    };
    let digits = integral.strip_prefix(['+', '-']).unwrap_or(integral);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if fraction.is_some_and(|f| !f.bytes().all(|b| b == b'0')) {
        return None;
    }
    match i128::from_radix_10_signed_checked(integral.as_bytes()) {
        (Some(n), used) if used == integral.len() => Some(n),
        _ => None,
    }
}

macro_rules! impl_from_value_for_integer {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                const NAME: &'static str = stringify!($t);

                fn from_value(value: &Value) -> Result<Self, Error> {
                    as_i128(value)
                        .and_then(|n| <$t>::try_from(n).ok())
                        .ok_or_else(|| incompatible::<Self>(value))
                }
            }
        )*
    };
}

impl_from_value_for_integer!(i16, u16, i32, i64);

/// `true` if converting `n` to `f64` and back yields `n` again.
fn exact_f64(n: i128) -> Option<f64> {
    let f = n as f64;
    (f as i128 == n).then_some(f)
}

impl FromValue for f64 {
    const NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Result<Self, Error> {
        let converted = match value {
            Value::F64(v) => Some(*v),
            Value::F32(v) => Some(f64::from(*v)),
            Value::I16(_) | Value::U16(_) | Value::I32(_) | Value::I64(_) => {
                as_i128(value).and_then(exact_f64)
            }
            Value::Text(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        converted.ok_or_else(|| incompatible::<Self>(value))
    }
}

impl FromValue for f32 {
    const NAME: &'static str = "f32";

    fn from_value(value: &Value) -> Result<Self, Error> {
        let converted = match value {
            Value::F32(v) => Some(*v),
            Value::Text(text) => text.trim().parse::<f32>().ok(),
            other => f64::from_value(other).ok().and_then(|wide| {
                let narrow = wide as f32;
                (f64::from(narrow) == wide || wide.is_nan()).then_some(narrow)
            }),
        };
        converted.ok_or_else(|| incompatible::<Self>(value))
    }
}

/// Booleans are coerced through a canonical integer representation: `0` is `false`, `1` is `true`.
/// Every other value is rejected.
impl FromValue for bool {
    const NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => match as_i128(other) {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(incompatible::<Self>(value)),
            },
        }
    }
}

impl FromValue for String {
    const NAME: &'static str = "string";

    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Text(text) => Ok(text.clone()),
            Value::I16(v) => Ok(v.to_string()),
            Value::U16(v) => Ok(v.to_string()),
            Value::I32(v) => Ok(v.to_string()),
            Value::I64(v) => Ok(v.to_string()),
            Value::F32(v) => Ok(v.to_string()),
            Value::F64(v) => Ok(v.to_string()),
            // Same canonical integer representation used to read booleans.
            Value::Bool(v) => Ok(u8::from(*v).to_string()),
            Value::Date(v) => Ok(v.to_string()),
            Value::Time(v) => Ok(v.to_string()),
            Value::Timestamp(v) => Ok(v.to_string()),
            Value::Bytes(_) | Value::Null => Err(incompatible::<Self>(value)),
        }
    }
}

impl FromValue for Vec<u8> {
    const NAME: &'static str = "binary";

    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            Value::Text(text) => Ok(text.as_bytes().to_vec()),
            other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromValue for Date {
    const NAME: &'static str = "date";

    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Date(date) => Ok(*date),
            // Only if no time of day would be lost
            Value::Timestamp(ts) if ts.time == Time::default() && ts.fraction == 0 => Ok(ts.date),
            Value::Text(text) => text.parse().map_err(|_| incompatible::<Self>(value)),
            other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromValue for Time {
    const NAME: &'static str = "time";

    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Time(time) => Ok(*time),
            Value::Text(text) => text.parse().map_err(|_| incompatible::<Self>(value)),
            other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromValue for Timestamp {
    const NAME: &'static str = "timestamp";

    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Date(date) => Ok(Timestamp::from(*date)),
            Value::Text(text) => text.parse().map_err(|_| incompatible::<Self>(value)),
            other => Err(incompatible::<Self>(other)),
        }
    }
}

impl FromValue for Value {
    const NAME: &'static str = "value";

    fn from_value(value: &Value) -> Result<Self, Error> {
        Ok(value.clone())
    }
}
