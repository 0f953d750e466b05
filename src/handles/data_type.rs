use odbc_sys::{SqlDataType, ULen};

/// Enumeration over valid SQL Data Types supported by ODBC
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataType {
    /// The type is not known.
    #[default]
    Unknown,
    /// `Char(n)`. Character string of fixed length.
    Char {
        /// Column size in characters (excluding terminating zero).
        length: ULen,
    },
    /// `NChar(n)`. Character string of fixed length with UTF-16 encoding.
    WChar { length: ULen },
    /// `Varchar(n)`. Variable length character string.
    Varchar {
        /// Maximum length of the character string (excluding terminating zero).
        length: ULen,
    },
    /// `NVarchar(n)`. Variable length character string with UTF-16 encoding.
    WVarchar { length: ULen },
    /// `TEXT`. Variable length character data. Maximum length is data source dependent.
    LongVarchar { length: ULen },
    /// `NTEXT`. Variable length UTF-16 character data.
    WLongVarchar { length: ULen },
    /// `Numeric(p,s)`. Signed, exact, numeric value with a precision p and scale s.
    Numeric {
        /// Total number of digits.
        precision: ULen,
        /// Number of decimal digits.
        scale: i16,
    },
    /// `Decimal(p,s)`. Signed, exact, numeric value with a precision of at least p and scale s.
    Decimal {
        /// Total number of digits.
        precision: ULen,
        /// Number of decimal digits.
        scale: i16,
    },
    /// `Integer`. 32 Bit Integer
    Integer,
    /// `Smallint`. 16 Bit Integer
    SmallInt,
    /// `Float(p)`. Signed, approximate, numeric value with a binary precision of at least p.
    Float { precision: ULen },
    /// `Real`. Binary precision 24.
    Real,
    /// `Double Precision`. Binary precision 53.
    Double,
    /// `Date`. Year, month, and day fields, conforming to the rules of the Gregorian calendar.
    Date,
    /// `Time`. Hour, minute, and second fields. Precision p indicates the seconds precision.
    Time { precision: i16 },
    /// `Timestamp`. Year, month, day, hour, minute, and second fields.
    Timestamp { precision: i16 },
    /// `BIGINT`. Exact numeric value with precision 19 (if signed) or 20 (if unsigned).
    BigInt,
    /// `TINYINT`. Exact numeric value with precision 3 and scale 0.
    TinyInt,
    /// `BIT`. Single bit binary data.
    Bit,
    /// `BINARY(n)`. Binary data of fixed length.
    Binary { length: ULen },
    /// `VARBINARY(n)`. Variable length binary data.
    Varbinary { length: ULen },
    /// `BLOB`. Variable length binary data. Maximum length is data source dependent.
    LongVarbinary { length: ULen },
    /// The driver returned a type, but it is not among the other types of these enumeration.
    Other {
        data_type: SqlDataType,
        column_size: ULen,
        decimal_digits: i16,
    },
}

impl DataType {
    /// This constructor is useful to create an instance of the enumeration using values returned by
    /// ODBC Api calls like `SQLDescribeCol`, rather than just initializing a variant directly.
    pub fn new(data_type: SqlDataType, column_size: ULen, decimal_digits: i16) -> Self {
        match data_type {
            SqlDataType::UNKNOWN_TYPE => DataType::Unknown,
            SqlDataType::CHAR => DataType::Char {
                length: column_size,
            },
            SqlDataType::EXT_W_CHAR => DataType::WChar {
                length: column_size,
            },
            SqlDataType::VARCHAR => DataType::Varchar {
                length: column_size,
            },
            SqlDataType::EXT_W_VARCHAR => DataType::WVarchar {
                length: column_size,
            },
            SqlDataType::EXT_LONG_VARCHAR => DataType::LongVarchar {
                length: column_size,
            },
            SqlDataType::EXT_W_LONG_VARCHAR => DataType::WLongVarchar {
                length: column_size,
            },
            SqlDataType::NUMERIC => DataType::Numeric {
                precision: column_size,
                scale: decimal_digits,
            },
            SqlDataType::DECIMAL => DataType::Decimal {
                precision: column_size,
                scale: decimal_digits,
            },
            SqlDataType::INTEGER => DataType::Integer,
            SqlDataType::SMALLINT => DataType::SmallInt,
            SqlDataType::FLOAT => DataType::Float {
                precision: column_size,
            },
            SqlDataType::REAL => DataType::Real,
            SqlDataType::DOUBLE => DataType::Double,
            SqlDataType::DATE => DataType::Date,
            SqlDataType::TIME => DataType::Time {
                precision: decimal_digits,
            },
            SqlDataType::TIMESTAMP => DataType::Timestamp {
                precision: decimal_digits,
            },
            SqlDataType::EXT_BIG_INT => DataType::BigInt,
            SqlDataType::EXT_TINY_INT => DataType::TinyInt,
            SqlDataType::EXT_BIT => DataType::Bit,
            SqlDataType::EXT_BINARY => DataType::Binary {
                length: column_size,
            },
            SqlDataType::EXT_VAR_BINARY => DataType::Varbinary {
                length: column_size,
            },
            SqlDataType::EXT_LONG_VAR_BINARY => DataType::LongVarbinary {
                length: column_size,
            },
            other => DataType::Other {
                data_type: other,
                column_size,
                decimal_digits,
            },
        }
    }

    /// The associated `data_type` discriminator for this variant.
    pub fn data_type(&self) -> SqlDataType {
        match self {
            DataType::Unknown => SqlDataType::UNKNOWN_TYPE,
            DataType::Char { .. } => SqlDataType::CHAR,
            DataType::WChar { .. } => SqlDataType::EXT_W_CHAR,
            DataType::Varchar { .. } => SqlDataType::VARCHAR,
            DataType::WVarchar { .. } => SqlDataType::EXT_W_VARCHAR,
            DataType::LongVarchar { .. } => SqlDataType::EXT_LONG_VARCHAR,
            DataType::WLongVarchar { .. } => SqlDataType::EXT_W_LONG_VARCHAR,
            DataType::Numeric { .. } => SqlDataType::NUMERIC,
            DataType::Decimal { .. } => SqlDataType::DECIMAL,
            DataType::Integer => SqlDataType::INTEGER,
            DataType::SmallInt => SqlDataType::SMALLINT,
            DataType::Float { .. } => SqlDataType::FLOAT,
            DataType::Real => SqlDataType::REAL,
            DataType::Double => SqlDataType::DOUBLE,
            DataType::Date => SqlDataType::DATE,
            DataType::Time { .. } => SqlDataType::TIME,
            DataType::Timestamp { .. } => SqlDataType::TIMESTAMP,
            DataType::BigInt => SqlDataType::EXT_BIG_INT,
            DataType::TinyInt => SqlDataType::EXT_TINY_INT,
            DataType::Bit => SqlDataType::EXT_BIT,
            DataType::Binary { .. } => SqlDataType::EXT_BINARY,
            DataType::Varbinary { .. } => SqlDataType::EXT_VAR_BINARY,
            DataType::LongVarbinary { .. } => SqlDataType::EXT_LONG_VAR_BINARY,
            DataType::Other { data_type, .. } => *data_type,
        }
    }

    /// Return the column size, as it is required to bind the data type as a parameter. Fixed
    /// sized types report `0`.
    pub fn column_size(&self) -> ULen {
        match self {
            DataType::Unknown
            | DataType::Integer
            | DataType::SmallInt
            | DataType::Real
            | DataType::Double
            | DataType::Date
            | DataType::BigInt
            | DataType::TinyInt
            | DataType::Bit => 0,
            DataType::Time { .. } => 8,
            // 19 characters for `yyyy-mm-dd hh:mm:ss` plus the fraction and its radix point.
            DataType::Timestamp { precision } => match *precision {
                0 => 19,
                p => 20 + p.max(0) as ULen,
            },
            DataType::Char { length }
            | DataType::WChar { length }
            | DataType::Varchar { length }
            | DataType::WVarchar { length }
            | DataType::LongVarchar { length }
            | DataType::WLongVarchar { length }
            | DataType::Binary { length }
            | DataType::Varbinary { length }
            | DataType::LongVarbinary { length } => *length,
            DataType::Float { precision }
            | DataType::Numeric { precision, .. }
            | DataType::Decimal { precision, .. } => *precision,
            DataType::Other { column_size, .. } => *column_size,
        }
    }

    /// Return the number of decimal digits as required to bind the data type as a parameter.
    pub fn decimal_digits(&self) -> i16 {
        match self {
            DataType::Numeric { scale, .. } | DataType::Decimal { scale, .. } => *scale,
            DataType::Time { precision } | DataType::Timestamp { precision } => *precision,
            DataType::Other { decimal_digits, .. } => *decimal_digits,
            _ => 0,
        }
    }

    /// `true` for character data in any encoding or length class.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            DataType::Char { .. }
                | DataType::WChar { .. }
                | DataType::Varchar { .. }
                | DataType::WVarchar { .. }
                | DataType::LongVarchar { .. }
                | DataType::WLongVarchar { .. }
        )
    }

    /// `true` for binary data in any length class.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::DataType;
    use odbc_sys::SqlDataType;

    #[test]
    fn roundtrip_sql_data_type_code() {
        let described = DataType::new(SqlDataType::EXT_W_VARCHAR, 40, 0);
        assert_eq!(DataType::WVarchar { length: 40 }, described);
        assert_eq!(SqlDataType::EXT_W_VARCHAR, described.data_type());
        assert_eq!(40, described.column_size());
        assert!(described.is_text());
    }

    #[test]
    fn decimal_keeps_precision_and_scale() {
        let described = DataType::new(SqlDataType::DECIMAL, 10, 2);
        assert_eq!(10, described.column_size());
        assert_eq!(2, described.decimal_digits());
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let described = DataType::new(SqlDataType(-150), 12, 0);
        assert!(matches!(described, DataType::Other { .. }));
        assert_eq!(SqlDataType(-150), described.data_type());
    }

    #[test]
    fn timestamp_column_size_accounts_for_fraction() {
        assert_eq!(19, DataType::Timestamp { precision: 0 }.column_size());
        assert_eq!(23, DataType::Timestamp { precision: 3 }.column_size());
    }
}
