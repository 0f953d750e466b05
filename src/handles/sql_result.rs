use odbc_sys::SqlReturn;

/// Result of an ODBC function call. Variants hold the same meaning as the constants associated with
/// [`SqlReturn`]. This type may hold results, but it is still the responsibility of the user to
/// fetch and handle the diagnostics in case of an Error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlResult<T> {
    /// The function has been executed successfully.
    Success(T),
    /// The function has been executed successfully. There have been warnings.
    SuccessWithInfo(T),
    /// No more data is available
    NoData,
    /// The function returned an error state. Check diagnostics.
    Error {
        /// Name of the ODBC Api call which caused the error.
        function: &'static str,
    },
    /// A return code which is never expected for the calls issued by this crate, e.g.
    /// `SQL_INVALID_HANDLE` or `SQL_NEED_DATA` from a misbehaving driver.
    Unexpected {
        /// Return code as reported by the function.
        code: SqlReturn,
        /// Name of the ODBC Api call which returned `code`.
        function: &'static str,
    },
}

impl SqlResult<()> {
    /// Append a return value a successful to Result
    pub fn on_success<F, T>(self, f: F) -> SqlResult<T>
    where
        F: FnOnce() -> T,
    {
        self.map(|()| f())
    }
}

impl<T> SqlResult<T> {
    /// `True` if variant is [`SqlResult::Error`] or [`SqlResult::Unexpected`].
    pub fn is_err(&self) -> bool {
        matches!(self, SqlResult::Error { .. } | SqlResult::Unexpected { .. })
    }

    /// Applies `f` to any value wrapped in `Success` or `SuccessWithInfo`.
    pub fn map<U, F>(self, f: F) -> SqlResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            SqlResult::Success(v) => SqlResult::Success(f(v)),
            SqlResult::SuccessWithInfo(v) => SqlResult::SuccessWithInfo(f(v)),
            SqlResult::Error { function } => SqlResult::Error { function },
            SqlResult::Unexpected { code, function } => SqlResult::Unexpected { code, function },
            SqlResult::NoData => SqlResult::NoData,
        }
    }
}

pub trait ExtSqlReturn {
    fn into_sql_result(self, function_name: &'static str) -> SqlResult<()>;

    /// Use this instead of [`Self::into_sql_result`] if you expect [`SqlReturn::NO_DATA`] to be a
    /// valid value. [`SqlReturn::NO_DATA`] is mapped to `Success(false)`, all other success values
    /// are `Success(true)`.
    fn into_sql_result_bool(self, function_name: &'static str) -> SqlResult<bool>;
}

impl ExtSqlReturn for SqlReturn {
    fn into_sql_result(self, function: &'static str) -> SqlResult<()> {
        match self {
            SqlReturn::SUCCESS => SqlResult::Success(()),
            SqlReturn::SUCCESS_WITH_INFO => SqlResult::SuccessWithInfo(()),
            SqlReturn::ERROR => SqlResult::Error { function },
            SqlReturn::NO_DATA => SqlResult::NoData,
            // Only synchronous calls are issued and no data at execution parameters are bound, so
            // `STILL_EXECUTING` and `NEED_DATA` only come from buggy drivers.
            code => SqlResult::Unexpected { code, function },
        }
    }

    fn into_sql_result_bool(self, function: &'static str) -> SqlResult<bool> {
        match self {
            SqlReturn::NO_DATA => SqlResult::Success(false),
            other => other.into_sql_result(function).on_success(|| true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_is_a_success_if_expected() {
        assert_eq!(
            SqlResult::Success(false),
            SqlReturn::NO_DATA.into_sql_result_bool("SQLFetch")
        );
        assert_eq!(
            SqlResult::SuccessWithInfo(true),
            SqlReturn::SUCCESS_WITH_INFO.into_sql_result_bool("SQLFetch")
        );
    }

    #[test]
    fn error_remembers_function_name() {
        let result = SqlReturn::ERROR.into_sql_result("SQLExecute");
        assert!(result.is_err());
        assert_eq!(
            SqlResult::Error {
                function: "SQLExecute"
            },
            result
        );
    }

    #[test]
    fn unexpected_return_codes_are_kept() {
        let result = SqlReturn::INVALID_HANDLE.into_sql_result_bool("SQLFetch");
        assert_eq!(
            SqlResult::Unexpected {
                code: SqlReturn::INVALID_HANDLE,
                function: "SQLFetch"
            },
            result
        );
        assert!(result.is_err());
    }
}
