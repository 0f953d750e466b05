//! Owned input parameter buffers.
//!
//! ODBC reads bound parameters at execution time, not at bind time. Each [`BoundParameter`] keeps
//! its value and length indicator on the heap, so the addresses handed to `SQLBindParameter` stay
//! valid while the owning statement moves around, until the parameter is rebound or the statement
//! is dropped.

use std::{ffi::c_void, mem::size_of, ptr::null_mut};

use odbc_sys::{CDataType, Len, Pointer, NULL_DATA};

use crate::{handles::DataType, value::Value};

/// Marshaled representation of a [`Value`], laid out the way the ODBC C API expects it.
#[derive(Debug)]
enum CBuffer {
    Null,
    I16(i16),
    U16(u16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// `0` or `1`
    Bit(u8),
    Text(Vec<u16>),
    Binary(Vec<u8>),
    Date(odbc_sys::Date),
    Time(odbc_sys::Time),
    Timestamp(odbc_sys::Timestamp),
}

/// A parameter value together with its length indicator. Both live on the heap and must not be
/// mutated while bound.
#[derive(Debug)]
pub struct BoundParameter {
    buffer: Box<CBuffer>,
    indicator: Box<Len>,
    parameter_type: DataType,
}

impl BoundParameter {
    pub fn new(value: Value) -> Self {
        let (buffer, parameter_type) = match value {
            // The type of a NULL does not matter much, but drivers insist on a valid one.
            Value::Null => (CBuffer::Null, DataType::WVarchar { length: 1 }),
            Value::I16(v) => (CBuffer::I16(v), DataType::SmallInt),
            // No unsigned SQL types. `INTEGER` can hold every `u16`.
            Value::U16(v) => (CBuffer::U16(v), DataType::Integer),
            Value::I32(v) => (CBuffer::I32(v), DataType::Integer),
            Value::I64(v) => (CBuffer::I64(v), DataType::BigInt),
            Value::F32(v) => (CBuffer::F32(v), DataType::Real),
            Value::F64(v) => (CBuffer::F64(v), DataType::Double),
            Value::Bool(v) => (CBuffer::Bit(u8::from(v)), DataType::Bit),
            Value::Text(text) => {
                let wide: Vec<u16> = text.encode_utf16().collect();
                let length = wide.len().max(1);
                (CBuffer::Text(wide), DataType::WVarchar { length })
            }
            Value::Bytes(bytes) => {
                let length = bytes.len().max(1);
                (CBuffer::Binary(bytes), DataType::Varbinary { length })
            }
            Value::Date(date) => (CBuffer::Date(date.into()), DataType::Date),
            Value::Time(time) => (CBuffer::Time(time.into()), DataType::Time { precision: 0 }),
            Value::Timestamp(ts) => {
                let precision = ts.fraction_precision();
                (
                    CBuffer::Timestamp(ts.into()),
                    DataType::Timestamp { precision },
                )
            }
        };
        let indicator = match &buffer {
            CBuffer::Null => NULL_DATA,
            CBuffer::Text(wide) => (wide.len() * size_of::<u16>()) as Len,
            CBuffer::Binary(bytes) => bytes.len() as Len,
            // Ignored for fixed size types
            _ => 0,
        };
        Self {
            buffer: Box::new(buffer),
            indicator: Box::new(indicator),
            parameter_type,
        }
    }

    /// SQL type the parameter is bound as.
    pub fn parameter_type(&self) -> DataType {
        self.parameter_type
    }

    pub fn c_data_type(&self) -> CDataType {
        match *self.buffer {
            CBuffer::Null | CBuffer::Text(_) => CDataType::WChar,
            CBuffer::I16(_) => CDataType::SShort,
            CBuffer::U16(_) => CDataType::UShort,
            CBuffer::I32(_) => CDataType::SLong,
            CBuffer::I64(_) => CDataType::SBigInt,
            CBuffer::F32(_) => CDataType::Float,
            CBuffer::F64(_) => CDataType::Double,
            CBuffer::Bit(_) => CDataType::Bit,
            CBuffer::Binary(_) => CDataType::Binary,
            CBuffer::Date(_) => CDataType::TypeDate,
            CBuffer::Time(_) => CDataType::TypeTime,
            CBuffer::Timestamp(_) => CDataType::TypeTimestamp,
        }
    }

    /// Address of the value. Stable as long as `self` is alive and not mutated.
    pub fn value_ptr(&self) -> Pointer {
        fn erase<T>(value: &T) -> Pointer {
            value as *const T as *const c_void as Pointer
        }
        match &*self.buffer {
            CBuffer::Null => null_mut(),
            CBuffer::I16(v) => erase(v),
            CBuffer::U16(v) => erase(v),
            CBuffer::I32(v) => erase(v),
            CBuffer::I64(v) => erase(v),
            CBuffer::F32(v) => erase(v),
            CBuffer::F64(v) => erase(v),
            CBuffer::Bit(v) => erase(v),
            // Never null, even for empty buffers. Some drivers reject a null value pointer if the
            // indicator is not `NULL_DATA`.
            CBuffer::Text(v) => v.as_ptr() as *const c_void as Pointer,
            CBuffer::Binary(v) => v.as_ptr() as *const c_void as Pointer,
            CBuffer::Date(v) => erase(v),
            CBuffer::Time(v) => erase(v),
            CBuffer::Timestamp(v) => erase(v),
        }
    }

    /// Length of the value buffer in bytes.
    pub fn buffer_length(&self) -> Len {
        let bytes = match &*self.buffer {
            CBuffer::Null => 0,
            CBuffer::I16(_) => size_of::<i16>(),
            CBuffer::U16(_) => size_of::<u16>(),
            CBuffer::I32(_) => size_of::<i32>(),
            CBuffer::I64(_) => size_of::<i64>(),
            CBuffer::F32(_) => size_of::<f32>(),
            CBuffer::F64(_) => size_of::<f64>(),
            CBuffer::Bit(_) => size_of::<u8>(),
            CBuffer::Text(v) => v.len() * size_of::<u16>(),
            CBuffer::Binary(v) => v.len(),
            CBuffer::Date(_) => size_of::<odbc_sys::Date>(),
            CBuffer::Time(_) => size_of::<odbc_sys::Time>(),
            CBuffer::Timestamp(_) => size_of::<odbc_sys::Timestamp>(),
        };
        bytes as Len
    }

    /// Address of the length indicator. The driver only reads it for input parameters.
    pub fn indicator_ptr(&self) -> *mut Len {
        &*self.indicator as *const Len as *mut Len
    }
}
