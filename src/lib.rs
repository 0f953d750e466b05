//! # ODBC
//!
//! ODBC (Open Database Connectivity) is a Database standard. This library helps you write
//! applications which connect to any data source with an ODBC driver, execute SQL statements with
//! bound parameters and read typed values out of the result sets.
//!
//! ```no_run
//! use odbc_kit::{ConnectionOptions, Environment};
//!
//! let env = unsafe { Environment::new()? };
//! let conn = env.connect_with_connection_string(
//!     "Driver={SQLite3};Database=:memory:;",
//!     ConnectionOptions::default(),
//! )?;
//! conn.just_execute("CREATE TABLE simple (a INTEGER, b VARCHAR(10))", 0)?;
//!
//! let mut insert = conn.prepare("INSERT INTO simple (a, b) VALUES (?, ?)", 0)?;
//! insert.bind(0, 42)?;
//! insert.bind(1, "Hello")?;
//! insert.execute(0)?;
//!
//! let mut cursor = conn.execute("SELECT a, b FROM simple", 0)?;
//! while cursor.next()? {
//!     let a: i32 = cursor.get(0)?;
//!     let b: Option<String> = cursor.get_nullable("b")?;
//!     println!("{a} {b:?}");
//! }
//! # Ok::<(), odbc_kit::Error>(())
//! ```
//!
//! Connections, statements and cursors are deliberately not `Send`. Use one connection per thread.

mod connection;
mod conversion;
mod cursor;
mod environment;
mod error;
mod parameter;
mod statement;
mod value;

pub mod handles;
pub mod registry;

pub use self::{
    connection::{Connection, ConnectionOptions},
    conversion::FromValue,
    cursor::{ColumnIndex, ColumnMetadata, Position, ResultCursor},
    environment::{DataSourceInfo, DriverInfo, Environment},
    error::{Error, ErrorKind},
    handles::{DataType, Nullability},
    statement::Statement,
    value::{Date, ParseTemporalError, Time, Timestamp, Value},
};
// Reexports
/// Reexports `odbc-sys` as sys to enable applications to always use the same version as this crate.
pub use odbc_sys as sys;
pub use widestring::{U16Str, U16String};
