use std::collections::BTreeMap;

use log::debug;

use crate::{
    connection::{borrow_core, SharedCore},
    cursor::{CursorSource, ResultCursor},
    handles::{self, Record, SqlResult, State},
    parameter::BoundParameter,
    registry::Key,
    value::{Date, Time, Timestamp, Value},
    Error,
};

/// A prepared SQL statement with its parameter bindings. Created by
/// [`crate::Connection::prepare`].
///
/// Parameters are bound by zero based ordinal and stay bound across executions. Binding an ordinal
/// again replaces its value, all other ordinals keep theirs. The statement owns the memory of every
/// bound value, since the driver only reads it during execution.
pub struct Statement<'env> {
    core: SharedCore<'env>,
    key: Key,
    sql: String,
    prepared: bool,
    /// Applied to executions which do not specify a timeout of their own.
    query_timeout_sec: usize,
    /// Keyed by one based ODBC parameter number.
    parameters: BTreeMap<u16, BoundParameter>,
    scrollable: bool,
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        self.free_handle();
    }
}

impl<'env> Statement<'env> {
    pub(crate) fn new(core: SharedCore<'env>, key: Key, sql: String) -> Self {
        Self {
            core,
            key,
            sql,
            prepared: false,
            query_timeout_sec: 0,
            parameters: BTreeMap::new(),
            scrollable: false,
        }
    }

    pub(crate) fn mark_prepared(&mut self, query_timeout_sec: usize) {
        self.prepared = true;
        self.query_timeout_sec = query_timeout_sec;
    }

    /// Runs `f` with the statement handle. Fails with a programming error if the statement or its
    /// connection has been closed.
    pub(crate) fn with_handle<R>(
        &self,
        f: impl FnOnce(&mut handles::Statement) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut core = borrow_core(&self.core)?;
        let handle = core.statement_mut(self.key)?;
        f(handle)
    }

    /// SQL text this statement has been created with.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// `true` if the statement has been prepared, and can be executed repeatedly.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Binds `value` to the parameter placeholder with the zero based ordinal `index`.
    ///
    /// `index` must be smaller than the number of placeholders `SQLNumParams` reports for the
    /// statement. Violations are database errors with SQLSTATE `07009`, attributed to
    /// `SQLNumParams`. If binding fails the previous binding of `index` (if any) stays in place.
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<(), Error> {
        let parameter_number = index
            .checked_add(1)
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| Error::IndexOutOfRange {
                what: format!("Parameter {index}"),
                detail: format!("ODBC supports at most {} parameters.", u16::MAX),
            })?;
        let parameter = BoundParameter::new(value.into());
        self.with_handle(|handle| {
            // Many drivers silently grow their parameter arrays for ordinals beyond the last
            // placeholder. Reject those the way a strict driver would.
            if let SqlResult::Success(count) | SqlResult::SuccessWithInfo(count) =
                handle.num_params()
            {
                if parameter_number > count {
                    return Err(invalid_descriptor_index(parameter_number, count));
                }
            }
            // Safety: `parameter` is moved into `self.parameters` right after binding. Its value
            // and indicator are boxed and therefore keep their addresses.
            unsafe {
                handle.bind_input_parameter(
                    parameter_number,
                    parameter.c_data_type(),
                    parameter.parameter_type(),
                    parameter.value_ptr(),
                    parameter.buffer_length(),
                    parameter.indicator_ptr(),
                )
            }
            .into_result(handle)
        })?;
        // Replacing drops the previous buffer, which the driver no longer references.
        self.parameters.insert(parameter_number, parameter);
        Ok(())
    }

    /// Binds `NULL` to the parameter at `index`.
    pub fn bind_null(&mut self, index: usize) -> Result<(), Error> {
        self.bind(index, Value::Null)
    }

    pub fn bind_i16(&mut self, index: usize, value: i16) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_u16(&mut self, index: usize, value: u16) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_i32(&mut self, index: usize, value: i32) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_i64(&mut self, index: usize, value: i64) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_f32(&mut self, index: usize, value: f32) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_f64(&mut self, index: usize, value: f64) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_str(&mut self, index: usize, value: &str) -> Result<(), Error> {
        self.bind(index, value)
    }

    /// Booleans are bound as `BIT`, i.e. as the integers `0` and `1`.
    pub fn bind_bool(&mut self, index: usize, value: bool) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_bytes(&mut self, index: usize, value: &[u8]) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_date(&mut self, index: usize, value: Date) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_time(&mut self, index: usize, value: Time) -> Result<(), Error> {
        self.bind(index, value)
    }

    pub fn bind_timestamp(&mut self, index: usize, value: Timestamp) -> Result<(), Error> {
        self.bind(index, value)
    }

    /// Number of parameters currently bound by this statement.
    pub fn num_bound_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Number of placeholders in the SQL text, as reported by the driver.
    pub fn parameter_count(&self) -> Result<u16, Error> {
        self.with_handle(|handle| handle.num_params().into_result(handle))
    }

    /// Unbinds all parameters.
    pub fn reset_parameters(&mut self) -> Result<(), Error> {
        self.with_handle(|handle| handle.reset_parameters().into_result(handle))?;
        self.parameters.clear();
        Ok(())
    }

    /// Request a scrollable cursor for subsequent executions. Needed for any navigation except
    /// [`ResultCursor::next`]. Not every driver supports scrollable cursors.
    pub fn set_scrollable(&mut self, scrollable: bool) -> Result<(), Error> {
        self.with_handle(|handle| handle.set_scrollable(scrollable).into_result(handle))?;
        self.scrollable = scrollable;
        Ok(())
    }

    /// `true` if [`Self::set_scrollable`] requested a scrollable cursor.
    pub fn is_scrollable(&self) -> bool {
        self.scrollable
    }

    /// Executes the statement with the currently bound parameters.
    ///
    /// # Parameters
    ///
    /// * `timeout_sec`: Query timeout for this execution. `0` falls back to the timeout passed
    ///   to [`crate::Connection::prepare`].
    ///
    /// Any cursor of a previous execution is closed first. Bindings are kept, so the statement can
    /// be executed again after rebinding only some of its parameters.
    pub fn execute(&mut self, timeout_sec: usize) -> Result<ResultCursor<'_, 'env>, Error> {
        let timeout_sec = if timeout_sec == 0 {
            self.query_timeout_sec
        } else {
            timeout_sec
        };
        self.with_handle(|handle| {
            handle.close_cursor().into_result(handle)?;
            if timeout_sec != 0 {
                handle.set_query_timeout_sec(timeout_sec).into_result(handle)?;
            }
            // Safety: All bound buffers are owned by `self.parameters`.
            unsafe { handle.execute() }.into_result(handle)
        })?;
        debug!("Executed prepared statement: {}", self.sql);
        ResultCursor::new(CursorSource::Borrowed(self))
    }

    /// Closes the cursor of the last execution, if it is still open.
    pub fn close_cursor(&mut self) -> Result<(), Error> {
        self.with_handle(|handle| handle.close_cursor().into_result(handle))
    }

    /// Releases the statement handle. Never fails. Any further use of the statement fails with a
    /// programming error.
    pub fn close(&mut self) {
        self.free_handle();
        self.parameters.clear();
    }

    fn free_handle(&mut self) {
        // The handle must go before the parameter buffers it points to.
        if let Ok(mut core) = borrow_core(&self.core) {
            core.free_statement(self.key);
        }
    }
}

/// Raised for parameter numbers beyond the placeholder count reported by `SQLNumParams`. Carries
/// the SQLSTATE a strict driver would emit from `SQLBindParameter`.
fn invalid_descriptor_index(parameter_number: u16, count: u16) -> Error {
    let message = format!(
        "Invalid descriptor index. Parameter number {parameter_number} exceeds the {count} \
        placeholders reported for the statement."
    );
    Error::Diagnostics {
        record: Record::new(State::INVALID_DESCRIPTOR_INDEX, 0, &message),
        function: "SQLNumParams",
    }
}
