//! Semantic values exchanged with the database, independent of the byte layouts ODBC expects.

use std::{fmt, str::FromStr};

use atoi::FromRadix10Checked;

/// Calendar date as used in `DATE` columns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: i16,
    pub month: u16,
    pub day: u16,
}

/// Time of day as used in `TIME` columns. Fractional seconds are not part of ODBC's time struct.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

/// Date and time of day with nanosecond precision as used in `TIMESTAMP` columns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub date: Date,
    pub time: Time,
    /// Fractional seconds in nanoseconds (0 to 999,999,999).
    pub fraction: u32,
}

impl Date {
    pub fn new(year: i16, month: u16, day: u16) -> Self {
        Self { year, month, day }
    }
}

impl Time {
    pub fn new(hour: u16, minute: u16, second: u16) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }
}

impl Timestamp {
    pub fn new(date: Date, time: Time, fraction: u32) -> Self {
        Self {
            date,
            time,
            fraction,
        }
    }

    /// Number of decimal digits needed to represent the fraction without loss, rounded up to the
    /// precisions commonly supported by databases (0, 3, 7 or 9).
    pub fn fraction_precision(&self) -> i16 {
        match self.fraction {
            0 => 0,
            f if f % 1_000_000 == 0 => 3,
            f if f % 100 == 0 => 7,
            _ => 9,
        }
    }
}

impl From<odbc_sys::Date> for Date {
    fn from(d: odbc_sys::Date) -> Self {
        Date::new(d.year, d.month, d.day)
    }
}

impl From<Date> for odbc_sys::Date {
    fn from(d: Date) -> Self {
        odbc_sys::Date {
            year: d.year,
            month: d.month,
            day: d.day,
        }
    }
}

impl From<odbc_sys::Time> for Time {
    fn from(t: odbc_sys::Time) -> Self {
        Time::new(t.hour, t.minute, t.second)
    }
}

impl From<Time> for odbc_sys::Time {
    fn from(t: Time) -> Self {
        odbc_sys::Time {
            hour: t.hour,
            minute: t.minute,
            second: t.second,
        }
    }
}

impl From<odbc_sys::Timestamp> for Timestamp {
    fn from(ts: odbc_sys::Timestamp) -> Self {
        Timestamp {
            date: Date::new(ts.year, ts.month, ts.day),
            time: Time::new(ts.hour, ts.minute, ts.second),
            fraction: ts.fraction,
        }
    }
}

impl From<Timestamp> for odbc_sys::Timestamp {
    fn from(ts: Timestamp) -> Self {
        odbc_sys::Timestamp {
            year: ts.date.year,
            month: ts.date.month,
            day: ts.date.day,
            hour: ts.time.hour,
            minute: ts.time.minute,
            second: ts.time.second,
            fraction: ts.fraction,
        }
    }
}

impl From<Date> for Timestamp {
    fn from(date: Date) -> Self {
        Timestamp::new(date, Time::default(), 0)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)?;
        if self.fraction != 0 {
            let digits = format!("{:09}", self.fraction);
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

/// Text could not be parsed into a date, time or timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTemporalError {
    text: String,
    expected: &'static str,
}

impl fmt::Display for ParseTemporalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid {}", self.text, self.expected)
    }
}

impl std::error::Error for ParseTemporalError {}

/// Parses `text` as an unsigned number consisting of exactly the digits in `text`.
fn parse_field<I: FromRadix10Checked>(text: &str) -> Option<I> {
    if text.is_empty() {
        return None;
    }
    match I::from_radix_10_checked(text.as_bytes()) {
        (Some(n), used) if used == text.len() => Some(n),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<Date> {
    let (year, rest) = match text.strip_prefix('-') {
        Some(unsigned) => {
            let (year, rest) = unsigned.split_once('-')?;
            (-parse_field::<i16>(year)?, rest)
        }
        None => {
            let (year, rest) = text.split_once('-')?;
            (parse_field::<i16>(year)?, rest)
        }
    };
    let (month, day) = rest.split_once('-')?;
    let date = Date::new(year, parse_field(month)?, parse_field(day)?);
    (1..=12).contains(&date.month).then_some(())?;
    (1..=31).contains(&date.day).then_some(date)
}

/// Parses `hh:mm:ss` optionally followed by a fraction. Returns the time and the fraction in
/// nanoseconds.
fn parse_time(text: &str) -> Option<(Time, u32)> {
    let (hms, fraction) = match text.split_once('.') {
        Some((hms, fraction)) => (hms, Some(fraction)),
        None => (text, None),
    };
    let mut parts = hms.split(':');
    let hour = parse_field(parts.next()?)?;
    let minute = parse_field(parts.next()?)?;
    let second = parse_field(parts.next()?)?;
    if parts.next().is_some() || hour > 23 || minute > 59 || second > 61 {
        return None;
    }
    let nanos = match fraction {
        None => 0,
        Some(digits) if digits.len() <= 9 => {
            let value: u32 = parse_field(digits)?;
            value * 10u32.pow(9 - digits.len() as u32)
        }
        Some(_) => return None,
    };
    Some((Time::new(hour, minute, second), nanos))
}

impl FromStr for Date {
    type Err = ParseTemporalError;

    /// Parses ISO 8601 dates like `2024-02-29`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_date(s.trim()).ok_or_else(|| ParseTemporalError {
            text: s.to_owned(),
            expected: "date",
        })
    }
}

impl FromStr for Time {
    type Err = ParseTemporalError;

    /// Parses `hh:mm:ss`. A fractional part is accepted only if it is zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_time(s.trim()) {
            Some((time, 0)) => Ok(time),
            _ => Err(ParseTemporalError {
                text: s.to_owned(),
                expected: "time",
            }),
        }
    }
}

impl FromStr for Timestamp {
    type Err = ParseTemporalError;

    /// Parses `yyyy-mm-dd hh:mm:ss[.fffffffff]`. `T` is accepted as separator, too. A date
    /// without time of day is interpreted as midnight.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.split_once([' ', 'T']) {
            Some((date, time)) => parse_date(date)
                .zip(parse_time(time))
                .map(|(date, (time, fraction))| Timestamp::new(date, time, fraction)),
            None => parse_date(trimmed).map(Timestamp::from),
        };
        parsed.ok_or_else(|| ParseTemporalError {
            text: s.to_owned(),
            expected: "timestamp",
        })
    }
}

/// A single value of a column or parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    I16(i16),
    U16(u16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Date(Date),
    Time(Time),
    Timestamp(Timestamp),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "binary",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Bytes(v) => write!(f, "{} bytes of binary data", v.len()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_value!(
    i16 => I16,
    u16 => U16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Text,
    Vec<u8> => Bytes,
    bool => Bool,
    Date => Date,
    Time => Time,
    Timestamp => Timestamp,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_to_and_from_driver_struct() {
        let date = Date::new(2024, 2, 29);
        let sys: odbc_sys::Date = date.into();
        assert_eq!((2024, 2, 29), (sys.year, sys.month, sys.day));
        assert_eq!(date, Date::from(sys));
    }

    #[test]
    fn timestamp_to_and_from_driver_struct() {
        let ts = Timestamp::new(Date::new(1999, 12, 31), Time::new(23, 59, 58), 500_000_000);
        let sys: odbc_sys::Timestamp = ts.into();
        assert_eq!(23, sys.hour);
        assert_eq!(500_000_000, sys.fraction);
        assert_eq!(ts, Timestamp::from(sys));
    }

    #[test]
    fn parse_temporal_text() {
        assert_eq!(Date::new(2020, 1, 5), "2020-01-05".parse().unwrap());
        assert_eq!(Time::new(7, 8, 9), "07:08:09".parse().unwrap());
        let ts: Timestamp = "2020-01-05 07:08:09.25".parse().unwrap();
        assert_eq!(250_000_000, ts.fraction);
        let iso: Timestamp = "2020-01-05T07:08:09".parse().unwrap();
        assert_eq!(Time::new(7, 8, 9), iso.time);
        let midnight: Timestamp = "2020-01-05".parse().unwrap();
        assert_eq!(Time::default(), midnight.time);
    }

    #[test]
    fn reject_malformed_temporal_text() {
        assert!("2020-13-01".parse::<Date>().is_err());
        assert!("2020/01/01".parse::<Date>().is_err());
        assert!("25:00:00".parse::<Time>().is_err());
        assert!("12:00:00.5".parse::<Time>().is_err());
        assert!("12:00".parse::<Time>().is_err());
        assert!("yesterday".parse::<Timestamp>().is_err());
    }

    #[test]
    fn display_is_iso_8601() {
        let ts = Timestamp::new(Date::new(5, 6, 7), Time::new(1, 2, 3), 120_000_000);
        assert_eq!("0005-06-07 01:02:03.12", ts.to_string());
        assert_eq!("0005-06-07", ts.date.to_string());
    }

    #[test]
    fn fraction_precision_is_lossless() {
        let at = |fraction| Timestamp::new(Date::default(), Time::default(), fraction);
        assert_eq!(0, at(0).fraction_precision());
        assert_eq!(3, at(123_000_000).fraction_precision());
        assert_eq!(7, at(123_456_700).fraction_precision());
        assert_eq!(9, at(123_456_789).fraction_precision());
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::Null, Value::from(None::<i32>));
        assert_eq!(Value::I32(5), Value::from(Some(5)));
        assert_eq!(Value::Text("a".to_owned()), Value::from("a"));
    }
}
