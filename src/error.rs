use thiserror::Error as ThisError;

use log::warn;

use crate::handles::{log_diagnostics, Diagnostics, Record as DiagnosticRecord, SqlResult, State};

#[cfg(feature = "odbc_version_3_5")]
const ODBC_VERSION_STRING: &str = "3.5";
#[cfg(not(feature = "odbc_version_3_5"))]
const ODBC_VERSION_STRING: &str = "3.80";

/// The six categories every [`Error`] falls into. Useful for callers which want to react to a
/// class of errors without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Anything which does not fit any of the other categories.
    General,
    /// A value has been read as non-nullable, yet turned out to be `NULL`.
    NullAccess,
    /// A value could not be represented by the requested type without loss.
    InvalidType,
    /// A column, parameter or row has been addressed which does not exist.
    IndexOutOfRange,
    /// The API has been used in a way which can never succeed, e.g. using a statement after its
    /// connection has been closed.
    Programming,
    /// The driver manager or the driver reported an error.
    Database,
}

#[derive(Debug, ThisError)]
/// Error type used by every fallible operation of this crate.
pub enum Error {
    /// Allocating the environment itself fails. Further diagnostics are not available, as they
    /// would be retrieved using the envirorment handle.
    #[error("Failed to allocate ODBC Environment.")]
    FailedAllocatingEnvironment,
    /// An error returned if we fail to set the ODBC version
    #[error(
        "The ODBC diver manager installed in your system does not seem to support ODBC API version \
        {ODBC_VERSION_STRING}. Which is required by this application. Most likely you need to \
        update your driver manager. Diagnostic record returned by SQLSetEnvAttr:\n{0}"
    )]
    UnsupportedOdbcApiVersion(DiagnosticRecord),
    /// This should never happen, given that ODBC driver manager and ODBC driver do not have any
    /// Bugs. Since we may link vs a bunch of these, better to be on the safe side.
    #[error(
        "No Diagnostics available. The ODBC function call to {function} returned an error. Sadly \
        neither the ODBC driver manager, nor the driver were polite enough to leave a diagnostic \
        record specifying what exactly went wrong."
    )]
    NoDiagnostics {
        /// ODBC API call which returned error without producing a diagnostic record.
        function: &'static str,
    },
    /// A low level ODBC function call returned a code which none of the calls issued by this crate
    /// should ever return, e.g. `SQL_INVALID_HANDLE`.
    #[error("ODBC function '{function}' returned the unexpected return code {code}.")]
    UnexpectedReturnCode {
        /// ODBC API call which returned the code.
        function: &'static str,
        /// Raw `SQLRETURN` value.
        code: i16,
    },
    /// SQL Error had been returned by a low level ODBC function call. A Diagnostic record is
    /// obtained and associated with this error.
    #[error("ODBC emitted an error calling '{function}':\n{record}")]
    Diagnostics {
        /// Diagnostic record returned by the ODBC driver manager
        record: DiagnosticRecord,
        /// ODBC API call which produced the diagnostic record
        function: &'static str,
    },
    /// The value of the column in the current row is `NULL`, but has been requested as a type
    /// which can not represent `NULL`.
    #[error(
        "Column '{column}' is NULL in the current row. Use a nullable getter if the column may \
        hold NULL values."
    )]
    NullAccess {
        /// Zero based index of the column.
        column: usize,
    },
    /// A value could not be converted into the requested type without loss or wrapping.
    #[error("Can not represent {found} as {requested}.")]
    InvalidType {
        /// Human readable description of the value or native type found.
        found: String,
        /// Name of the requested type.
        requested: &'static str,
    },
    /// Column, parameter or row does not exist.
    #[error("{what} does not exist. {detail}")]
    IndexOutOfRange {
        /// What has been addressed, e.g. `"Column 7"` or `"Column 'nmae'"`.
        what: String,
        /// Additional information, e.g. the number of available columns.
        detail: String,
    },
    /// The API has been used incorrectly.
    #[error("{0}")]
    Programming(String),
    /// A catch all for errors which do not originate from the driver nor from a misuse of the API.
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FailedAllocatingEnvironment | Error::General(_) => ErrorKind::General,
            Error::NullAccess { .. } => ErrorKind::NullAccess,
            Error::InvalidType { .. } => ErrorKind::InvalidType,
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::Programming(_) => ErrorKind::Programming,
            Error::UnsupportedOdbcApiVersion(_)
            | Error::NoDiagnostics { .. }
            | Error::UnexpectedReturnCode { .. }
            | Error::Diagnostics { .. } => ErrorKind::Database,
        }
    }

    /// SQLSTATE of the diagnostic record associated with this error, if any.
    pub fn state(&self) -> Option<State> {
        match self {
            Error::Diagnostics { record, .. } | Error::UnsupportedOdbcApiVersion(record) => {
                Some(record.state)
            }
            _ => None,
        }
    }

    /// Shorthand for an invalid type error.
    pub(crate) fn invalid_type(found: impl Into<String>, requested: &'static str) -> Self {
        Error::InvalidType {
            found: found.into(),
            requested,
        }
    }

    /// Shorthand for accessing a statement or cursor whose connection is gone.
    pub(crate) fn not_connected() -> Self {
        Error::Programming(
            "The connection has been closed. Statements and cursors created from it can no \
            longer be used."
                .to_owned(),
        )
    }

    /// Allows for mapping the error variant from the "catch all" diagnostic to a more specific one
    /// offering the oppertunity to provide context in the error message.
    fn provide_context_for_diagnostic<F>(self, f: F) -> Self
    where
        F: FnOnce(DiagnosticRecord, &'static str) -> Error,
    {
        if let Error::Diagnostics { record, function } = self {
            f(record, function)
        } else {
            self
        }
    }
}

/// Convinience for easily providing more context to errors without an additional call to `map_err`
pub(crate) trait ExtendResult {
    fn provide_context_for_diagnostic<F>(self, f: F) -> Self
    where
        F: FnOnce(DiagnosticRecord, &'static str) -> Error;
}

impl<T> ExtendResult for Result<T, Error> {
    fn provide_context_for_diagnostic<F>(self, f: F) -> Self
    where
        F: FnOnce(DiagnosticRecord, &'static str) -> Error,
    {
        self.map_err(|error| error.provide_context_for_diagnostic(f))
    }
}

// Define that here rather than in `sql_result` mod to keep the `handles` module entirely agnostic
// about the top level `Error` type.
impl<T> SqlResult<T> {
    /// [`SqlResult::Success`] and [`SqlResult::SuccessWithInfo`] are mapped to Ok. In case of
    /// [`SqlResult::SuccessWithInfo`] any diagnostics are logged. [`SqlResult::Error`] is mapped
    /// to error. [`SqlResult::NoData`] is unexpected and reported as a database error without
    /// diagnostics.
    pub fn into_result(self, handle: &(impl Diagnostics + ?Sized)) -> Result<T, Error> {
        self.into_result_with(handle, None)
    }

    /// Like [`Self::into_result`], but [`SqlResult::NoData`] is mapped to `None`, and any success
    /// is mapped to `Some`.
    pub fn into_result_option(
        self,
        handle: &(impl Diagnostics + ?Sized),
    ) -> Result<Option<T>, Error> {
        self.map(Some).into_result_with(handle, Some(None))
    }

    /// Most flexible way of converting an `SqlResult` to an idiomatic `Result`.
    ///
    /// # Parameters
    ///
    /// * `handle`: This handle is used to extract diagnostics in case `self` is
    ///   [`SqlResult::SuccessWithInfo`] or [`SqlResult::Error`].
    /// * `no_data`: Controls the behaviour for [`SqlResult::NoData`]. `Some(value)` would cause
    ///   [`SqlResult::NoData`] to be mapped to `Ok(value)`.
    pub fn into_result_with(
        self,
        handle: &(impl Diagnostics + ?Sized),
        no_data: Option<T>,
    ) -> Result<T, Error> {
        match self {
            // The function has been executed successfully. Holds result.
            SqlResult::Success(value) => Ok(value),
            // The function has been executed successfully. There have been warnings. Holds result.
            SqlResult::SuccessWithInfo(value) => {
                log_diagnostics(handle);
                Ok(value)
            }
            SqlResult::Error { function } => {
                let mut records = handle.diagnostic_records();
                let Some(record) = records.next() else {
                    return Err(Error::NoDiagnostics { function });
                };
                warn!("{record}");
                for further in records {
                    warn!("{further}");
                }
                Err(Error::Diagnostics { record, function })
            }
            SqlResult::Unexpected { code, function } => Err(Error::UnexpectedReturnCode {
                function,
                code: code.0,
            }),
            SqlResult::NoData => no_data.map(Ok).unwrap_or(Err(Error::NoDiagnostics {
                function: "unexpected SQL_NO_DATA",
            })),
        }
    }
}
