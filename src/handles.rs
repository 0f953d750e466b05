//! Provides basic abstraction over valid (i.e. allocated ODBC handles).
//!
//! Two decisions are already baked into this module:
//!
//! * Treat warnings by logging them with `log`.
//! * Use the Unicode (wide) variants of the ODBC API.
//!
//! Functions in this module return [`SqlResult`] and are agnostic of the top level
//! [`crate::Error`] type.

mod as_handle;
mod buffer;
mod column_description;
mod connection;
mod data_type;
mod diagnostics;
mod environment;
mod sql_result;
mod statement;

pub use {
    as_handle::AsHandle,
    column_description::{ColumnDescription, Nullability},
    connection::Connection,
    data_type::DataType,
    diagnostics::{log_diagnostics, DiagnosticRecords, Diagnostics, Record, State},
    environment::Environment,
    sql_result::{ExtSqlReturn, SqlResult},
    statement::Statement,
};

use log::error;
use odbc_sys::{Handle, HandleType, SQLFreeHandle, SqlReturn};

/// Character type used by the wide ODBC function calls.
pub type SqlChar = u16;

/// Decodes UTF-16 as it is returned from the driver into a `String`. Invalid code points are
/// replaced with the Unicode replacement character rather than failing.
pub fn slice_to_utf8(text: &[SqlChar]) -> String {
    String::from_utf16_lossy(text)
}

/// Frees a handle. Failures are logged, since there is nobody left to report them to.
///
/// # Safety
///
/// `handle` must be a valid ODBC handle of type `handle_type` which has not been freed before.
unsafe fn drop_handle(handle: Handle, handle_type: HandleType) {
    match SQLFreeHandle(handle_type, handle) {
        SqlReturn::SUCCESS => (),
        other => error!("SQLFreeHandle failed for a {handle_type:?} handle: {other:?}"),
    }
}
