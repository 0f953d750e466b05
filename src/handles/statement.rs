use super::{
    as_handle::AsHandle,
    buffer::{buf_ptr, clamp_int, clamp_small_int, mut_buf_ptr},
    column_description::{ColumnDescription, Nullability},
    data_type::DataType,
    drop_handle,
    sql_result::ExtSqlReturn,
    SqlChar, SqlResult,
};
use odbc_sys::{
    CDataType, Desc, FetchOrientation, FreeStmtOption, HStmt, Handle, HandleType, Len, ParamType,
    Pointer, SQLBindParameter, SQLColAttributeW, SQLDescribeColW, SQLExecDirectW, SQLExecute,
    SQLFetch, SQLFetchScroll, SQLFreeStmt, SQLGetData, SQLGetStmtAttr, SQLNumParams,
    SQLNumResultCols, SQLPrepareW, SQLRowCount, SQLSetStmtAttrW, SqlDataType,
    StatementAttribute, ULen,
};
use std::ptr::null_mut;
use widestring::U16Str;

/// `SQL_CURSOR_FORWARD_ONLY`
const CURSOR_FORWARD_ONLY: usize = 0;
/// `SQL_CURSOR_STATIC`
const CURSOR_STATIC: usize = 3;

/// Wraps a valid (i.e. successfully allocated) ODBC statement handle.
///
/// The statement does not track the lifetime of its connection in the type system. Whoever
/// allocates it is responsible for dropping it before the connection is disconnected.
#[derive(Debug)]
pub struct Statement {
    handle: HStmt,
}

unsafe impl AsHandle for Statement {
    fn as_handle(&self) -> Handle {
        self.handle.as_handle()
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Stmt
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.handle.as_handle(), HandleType::Stmt);
        }
    }
}

impl Statement {
    /// # Safety
    ///
    /// `handle` must be a valid (successfully allocated) statement handle.
    pub unsafe fn new(handle: HStmt) -> Self {
        Self { handle }
    }

    /// Executes a statement, using the current values of the parameter marker variables if any
    /// parameters exist in the statement.
    ///
    /// # Return
    ///
    /// `Success(false)` if the statement has been executed, but affected no rows (e.g. a searched
    /// `UPDATE` without matching rows).
    pub fn exec_direct(&mut self, statement_text: &U16Str) -> SqlResult<bool> {
        unsafe {
            SQLExecDirectW(
                self.handle,
                buf_ptr(statement_text.as_slice()),
                clamp_int(statement_text.len()),
            )
            .into_sql_result_bool("SQLExecDirectW")
        }
    }

    /// Send an SQL statement to the data source for preparation. The application can include one or
    /// more parameter markers in the SQL statement. To include a parameter marker, the application
    /// embeds a question mark (?) into the SQL string at the appropriate position.
    pub fn prepare(&mut self, statement_text: &U16Str) -> SqlResult<()> {
        unsafe {
            SQLPrepareW(
                self.handle,
                buf_ptr(statement_text.as_slice()),
                clamp_int(statement_text.len()),
            )
            .into_sql_result("SQLPrepareW")
        }
    }

    /// Executes a statement prepared by `prepare`. After the application processes or discards the
    /// results from a call to `execute`, the application can call `execute` again with new
    /// parameter values.
    ///
    /// # Safety
    ///
    /// All buffers bound with [`Self::bind_input_parameter`] must still be valid.
    pub unsafe fn execute(&mut self) -> SqlResult<bool> {
        SQLExecute(self.handle).into_sql_result_bool("SQLExecute")
    }

    /// Closes the cursor associated with this statement, if any, and discards pending results.
    /// Unlike `SQLCloseCursor` this does not complain if no cursor is open.
    pub fn close_cursor(&mut self) -> SqlResult<()> {
        unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Close) }.into_sql_result("SQLFreeStmt")
    }

    /// Release all parameter buffers set by [`Self::bind_input_parameter`].
    pub fn reset_parameters(&mut self) -> SqlResult<()> {
        unsafe { SQLFreeStmt(self.handle, FreeStmtOption::ResetParams) }
            .into_sql_result("SQLFreeStmt")
    }

    /// Number of columns in result set. `0` if the statement did not produce a result set.
    pub fn num_result_cols(&self) -> SqlResult<i16> {
        let mut out: i16 = 0;
        unsafe { SQLNumResultCols(self.handle, &mut out) }
            .into_sql_result("SQLNumResultCols")
            .on_success(|| out)
    }

    /// Number of parameter markers in the prepared statement.
    pub fn num_params(&self) -> SqlResult<u16> {
        let mut out: i16 = 0;
        unsafe { SQLNumParams(self.handle, &mut out) }
            .into_sql_result("SQLNumParams")
            .on_success(|| out.max(0) as u16)
    }

    /// Number of rows affected by an `UPDATE`, `INSERT`, or `DELETE` statement. `-1` if the
    /// number is not available. Some drivers also report the number of rows of a result set here.
    pub fn row_count(&self) -> SqlResult<isize> {
        let mut out: Len = 0;
        unsafe { SQLRowCount(self.handle, &mut out) }
            .into_sql_result("SQLRowCount")
            .on_success(|| out)
    }

    /// Fetch a column description using the column index.
    ///
    /// # Parameters
    ///
    /// * `column_number`: Column index. `0` is the bookmark column. The other column indices start
    ///   with `1`.
    /// * `column_description`: Holds the description of the column after the call. This method does
    ///   not provide strong exception safety as the value of this argument is undefined in case of
    ///   an error.
    pub fn describe_col(
        &self,
        column_number: u16,
        column_description: &mut ColumnDescription,
    ) -> SqlResult<()> {
        let name = &mut column_description.name;
        // Use maximum available capacity.
        name.resize(name.capacity().max(32), 0);
        let mut name_length: i16 = 0;
        let mut data_type = SqlDataType::UNKNOWN_TYPE;
        let mut column_size: ULen = 0;
        let mut decimal_digits: i16 = 0;
        let mut nullable = odbc_sys::Nullability::UNKNOWN;

        let res = unsafe {
            SQLDescribeColW(
                self.handle,
                column_number,
                mut_buf_ptr(name),
                clamp_small_int(name.len()),
                &mut name_length,
                &mut data_type,
                &mut column_size,
                &mut decimal_digits,
                &mut nullable,
            )
            .into_sql_result("SQLDescribeColW")
        };

        if res.is_err() {
            return res;
        }

        column_description.nullability = Nullability::new(nullable);

        if name_length + 1 > clamp_small_int(name.len()) {
            // Buffer is to small to hold name, retry with larger buffer
            name.resize(name_length as usize + 1, 0);
            self.describe_col(column_number, column_description)
        } else {
            name.resize(name_length.max(0) as usize, 0);
            column_description.data_type = DataType::new(data_type, column_size, decimal_digits);
            res
        }
    }

    /// Data source dependent data type name of the column, e.g. `"VARCHAR"`, `"INTEGER"` or
    /// `"int identity"`.
    pub fn col_type_name(&self, column_number: u16, buf: &mut Vec<SqlChar>) -> SqlResult<()> {
        self.string_col_attribute(Desc::TypeName, column_number, buf)
    }

    /// The column alias, if it applies. If the column alias does not apply, the column name is
    /// returned. If there is no column name or a column alias, an empty string is returned.
    pub fn col_name(&self, column_number: u16, buf: &mut Vec<SqlChar>) -> SqlResult<()> {
        self.string_col_attribute(Desc::Name, column_number, buf)
    }

    fn string_col_attribute(
        &self,
        attribute: Desc,
        column_number: u16,
        buf: &mut Vec<SqlChar>,
    ) -> SqlResult<()> {
        // String length in bytes, not characters. Terminating zero is excluded.
        let mut string_length_in_bytes: i16 = 0;
        // Let's utilize all of `buf`s capacity.
        buf.resize(buf.capacity().max(1), 0);
        unsafe {
            let mut res = SQLColAttributeW(
                self.handle,
                column_number,
                attribute,
                mut_buf_ptr(buf) as Pointer,
                clamp_small_int(buf.len() * 2),
                &mut string_length_in_bytes as *mut i16,
                null_mut(),
            )
            .into_sql_result("SQLColAttributeW");
            if res.is_err() {
                return res;
            }
            if clamp_small_int(buf.len() * 2) < string_length_in_bytes.saturating_add(2) {
                buf.resize((string_length_in_bytes / 2 + 1) as usize, 0);
                res = SQLColAttributeW(
                    self.handle,
                    column_number,
                    attribute,
                    mut_buf_ptr(buf) as Pointer,
                    clamp_small_int(buf.len() * 2),
                    &mut string_length_in_bytes as *mut i16,
                    null_mut(),
                )
                .into_sql_result("SQLColAttributeW");
            }
            // Resize buffer to exact string length without terminal zero
            buf.resize(((string_length_in_bytes.max(0) + 1) / 2) as usize, 0);
            res
        }
    }

    /// Advances the cursor to the next row. `Success(false)` once the end of the result set has
    /// been reached.
    pub fn fetch(&mut self) -> SqlResult<bool> {
        unsafe { SQLFetch(self.handle) }.into_sql_result_bool("SQLFetch")
    }

    /// Positions the cursor according to `orientation` and `offset`. `Success(false)` if the cursor
    /// ended up before the first or after the last row. Only valid for scrollable cursors if
    /// `orientation` is anything else than [`FetchOrientation::Next`].
    pub fn fetch_scroll(&mut self, orientation: FetchOrientation, offset: isize) -> SqlResult<bool> {
        unsafe { SQLFetchScroll(self.handle, orientation, offset) }
            .into_sql_result_bool("SQLFetchScroll")
    }

    /// Retrieves data for a single column of the current row. Can be called repeatedly for the
    /// same column to retrieve variable length data in parts.
    ///
    /// # Return
    ///
    /// `Success(false)` if all the data of the column has already been retrieved by previous calls.
    ///
    /// # Safety
    ///
    /// `target` must point to a buffer of at least `buffer_length` bytes which matches
    /// `target_type`.
    pub unsafe fn get_data(
        &mut self,
        column_number: u16,
        target_type: CDataType,
        target: Pointer,
        buffer_length: Len,
        indicator: &mut Len,
    ) -> SqlResult<bool> {
        SQLGetData(
            self.handle,
            column_number,
            target_type,
            target,
            buffer_length,
            indicator as *mut Len,
        )
        .into_sql_result_bool("SQLGetData")
    }

    /// Binds a buffer holding an input parameter to a parameter marker in an SQL statement.
    ///
    /// # Safety
    ///
    /// * `value` and `indicator` must stay valid and must not move until the parameter is
    ///   rebound, parameters are reset or the statement is freed. The driver reads them at
    ///   execution time, not at bind time.
    /// * `value` must hold a value of type `value_type`. `buffer_length` is the length of the value
    ///   in bytes for variable sized types.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn bind_input_parameter(
        &mut self,
        parameter_number: u16,
        value_type: CDataType,
        parameter_type: DataType,
        value: Pointer,
        buffer_length: Len,
        indicator: *mut Len,
    ) -> SqlResult<()> {
        SQLBindParameter(
            self.handle,
            parameter_number,
            ParamType::Input,
            value_type,
            parameter_type.data_type(),
            parameter_type.column_size(),
            parameter_type.decimal_digits(),
            value,
            buffer_length,
            indicator,
        )
        .into_sql_result("SQLBindParameter")
    }

    /// Number of seconds to wait for an SQL statement to execute before returning to the
    /// application. `0` means no timeout.
    pub fn set_query_timeout_sec(&mut self, timeout_sec: usize) -> SqlResult<()> {
        unsafe {
            SQLSetStmtAttrW(
                self.handle,
                StatementAttribute::QueryTimeout,
                timeout_sec as Pointer,
                0,
            )
            .into_sql_result("SQLSetStmtAttrW")
        }
    }

    /// Requests a static, scrollable cursor (`true`) or a forward only cursor (`false`) for the
    /// result sets produced by subsequent executions.
    pub fn set_scrollable(&mut self, scrollable: bool) -> SqlResult<()> {
        let cursor_type = if scrollable {
            CURSOR_STATIC
        } else {
            CURSOR_FORWARD_ONLY
        };
        unsafe {
            SQLSetStmtAttrW(
                self.handle,
                StatementAttribute::CursorType,
                cursor_type as Pointer,
                0,
            )
            .into_sql_result("SQLSetStmtAttrW")
        }
    }

    /// One based number of the current row in the entire result set. `0` if the number can not be
    /// determined by the driver.
    pub fn row_number(&self) -> SqlResult<usize> {
        let mut out: ULen = 0;
        unsafe {
            SQLGetStmtAttr(
                self.handle,
                StatementAttribute::RowNumber,
                &mut out as *mut ULen as Pointer,
                0,
                null_mut(),
            )
            .into_sql_result("SQLGetStmtAttr")
            .on_success(|| out)
        }
    }
}
