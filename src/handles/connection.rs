use super::{
    as_handle::AsHandle,
    buffer::{buf_ptr, clamp_int, clamp_small_int, mut_buf_ptr},
    drop_handle,
    sql_result::ExtSqlReturn,
    statement::Statement,
    SqlChar, SqlResult,
};
use odbc_sys::{
    CompletionType, ConnectionAttribute, DriverConnectOption, HDbc, HEnv, HStmt, Handle,
    HandleType, InfoType, Pointer, SQLAllocHandle, SQLConnectW, SQLDisconnect, SQLDriverConnectW,
    SQLEndTran, SQLGetConnectAttrW, SQLGetInfoW, SQLSetConnectAttrW,
};
use std::{marker::PhantomData, ptr::null_mut};
use widestring::U16Str;

/// The connection handle references storage of all information about the connection to the data
/// source, including status, transaction state, and error information.
#[derive(Debug)]
pub struct Connection<'c> {
    parent: PhantomData<&'c HEnv>,
    handle: HDbc,
}

unsafe impl AsHandle for Connection<'_> {
    fn as_handle(&self) -> Handle {
        self.handle.as_handle()
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Dbc
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.handle.as_handle(), HandleType::Dbc);
        }
    }
}

impl Connection<'_> {
    /// # Safety
    ///
    /// Call this method only with a valid (successfully allocated) ODBC connection handle.
    pub unsafe fn new(handle: HDbc) -> Self {
        Self {
            handle,
            parent: PhantomData,
        }
    }

    /// Establishes connections to a driver and a data source.
    ///
    /// * See [Connecting with SQLConnect][1]
    /// * See [SQLConnectFunction][2]
    ///
    /// [1]: https://docs.microsoft.com/sql/odbc/reference/develop-app/connecting-with-sqlconnect
    /// [2]: https://docs.microsoft.com/sql/odbc/reference/syntax/sqlconnect-function
    pub fn connect(
        &mut self,
        data_source_name: &U16Str,
        user: &U16Str,
        pwd: &U16Str,
    ) -> SqlResult<()> {
        unsafe {
            SQLConnectW(
                self.handle,
                buf_ptr(data_source_name.as_slice()),
                clamp_small_int(data_source_name.len()),
                buf_ptr(user.as_slice()),
                clamp_small_int(user.len()),
                buf_ptr(pwd.as_slice()),
                clamp_small_int(pwd.len()),
            )
            .into_sql_result("SQLConnectW")
        }
    }

    /// An alternative to `connect`. It supports data sources that require more connection
    /// information than the three arguments in `connect` and data sources that are not defined in
    /// the system information. The driver is never allowed to prompt the user.
    pub fn connect_with_connection_string(&mut self, connection_string: &U16Str) -> SqlResult<()> {
        unsafe {
            SQLDriverConnectW(
                self.handle,
                null_mut(),
                buf_ptr(connection_string.as_slice()),
                clamp_small_int(connection_string.len()),
                null_mut(),
                0,
                null_mut(),
                DriverConnectOption::NoPrompt,
            )
            .into_sql_result("SQLDriverConnectW")
        }
    }

    /// Disconnect from an ODBC data source.
    pub fn disconnect(&mut self) -> SqlResult<()> {
        unsafe { SQLDisconnect(self.handle).into_sql_result("SQLDisconnect") }
    }

    /// Allocate a new statement handle.
    ///
    /// # Safety
    ///
    /// The returned statement must be dropped before this connection is disconnected or freed.
    pub unsafe fn allocate_statement(&self) -> SqlResult<Statement> {
        let mut out = Handle::null();
        SQLAllocHandle(HandleType::Stmt, self.as_handle(), &mut out)
            .into_sql_result("SQLAllocHandle")
            .on_success(|| Statement::new(HStmt(out.0)))
    }

    /// Number of seconds to wait for a login request to complete before returning to the
    /// application. `0` means the driver default. Must be set before connecting.
    pub fn set_login_timeout_sec(&mut self, timeout: u32) -> SqlResult<()> {
        unsafe {
            SQLSetConnectAttrW(
                self.handle,
                ConnectionAttribute::LOGIN_TIMEOUT,
                timeout as usize as Pointer,
                0,
            )
            .into_sql_result("SQLSetConnectAttrW")
        }
    }

    /// Specify the transaction mode. By default, ODBC transactions are in auto-commit mode.
    /// Switching from manual-commit mode to auto-commit mode automatically commits any open
    /// transaction on the connection.
    pub fn set_autocommit(&self, enabled: bool) -> SqlResult<()> {
        let val = enabled as u32;
        unsafe {
            SQLSetConnectAttrW(
                self.handle,
                ConnectionAttribute::AUTOCOMMIT,
                val as usize as Pointer,
                0, // will be ignored according to ODBC spec
            )
            .into_sql_result("SQLSetConnectAttrW")
        }
    }

    /// To commit a transaction in manual-commit mode.
    pub fn commit(&self) -> SqlResult<()> {
        unsafe {
            SQLEndTran(HandleType::Dbc, self.as_handle(), CompletionType::Commit)
                .into_sql_result("SQLEndTran")
        }
    }

    /// Roll back a transaction in manual-commit mode.
    pub fn rollback(&self) -> SqlResult<()> {
        unsafe {
            SQLEndTran(HandleType::Dbc, self.as_handle(), CompletionType::Rollback)
                .into_sql_result("SQLEndTran")
        }
    }

    /// Fetch the name of the database management system used by the connection and store it into
    /// the provided `buf`.
    pub fn fetch_database_management_system_name(&self, buf: &mut Vec<SqlChar>) -> SqlResult<()> {
        self.fetch_info_string(InfoType::DbmsName, buf)
    }

    /// Fetch the version of the database management system used by the connection. The version is
    /// of the form `##.##.####`, optionally followed by a version specific description.
    pub fn fetch_database_management_system_version(
        &self,
        buf: &mut Vec<SqlChar>,
    ) -> SqlResult<()> {
        self.fetch_info_string(InfoType::DbmsVer, buf)
    }

    fn fetch_info_string(&self, info_type: InfoType, buf: &mut Vec<SqlChar>) -> SqlResult<()> {
        // String length in bytes, not characters. Terminating zero is excluded.
        let mut string_length_in_bytes: i16 = 0;
        // Let's utilize all of `buf`s capacity.
        buf.resize(buf.capacity().max(1), 0);

        unsafe {
            let mut res = SQLGetInfoW(
                self.handle,
                info_type,
                mut_buf_ptr(buf) as Pointer,
                clamp_small_int(buf.len() * 2),
                &mut string_length_in_bytes as *mut i16,
            )
            .into_sql_result("SQLGetInfoW");

            if res.is_err() {
                return res;
            }

            if clamp_small_int(buf.len() * 2) < string_length_in_bytes.saturating_add(2) {
                buf.resize((string_length_in_bytes / 2 + 1) as usize, 0);
                res = SQLGetInfoW(
                    self.handle,
                    info_type,
                    mut_buf_ptr(buf) as Pointer,
                    clamp_small_int(buf.len() * 2),
                    &mut string_length_in_bytes as *mut i16,
                )
                .into_sql_result("SQLGetInfoW");
            }

            // Resize buffer to exact string length without terminal zero
            buf.resize(((string_length_in_bytes.max(0) + 1) / 2) as usize, 0);
            res
        }
    }

    /// Fetch the name of the current catalog (database) in use by the connection.
    pub fn fetch_current_catalog(&self, buf: &mut Vec<SqlChar>) -> SqlResult<()> {
        // String length in bytes, not characters. Terminating zero is excluded.
        let mut string_length_in_bytes: i32 = 0;
        buf.resize(buf.capacity().max(1), 0);

        unsafe {
            let mut res = SQLGetConnectAttrW(
                self.handle,
                ConnectionAttribute::CURRENT_CATALOG,
                mut_buf_ptr(buf) as Pointer,
                clamp_int(buf.len() * 2),
                &mut string_length_in_bytes as *mut i32,
            )
            .into_sql_result("SQLGetConnectAttrW");

            if res.is_err() {
                return res;
            }

            if clamp_int(buf.len() * 2) < string_length_in_bytes.saturating_add(2) {
                buf.resize((string_length_in_bytes / 2 + 1) as usize, 0);
                res = SQLGetConnectAttrW(
                    self.handle,
                    ConnectionAttribute::CURRENT_CATALOG,
                    mut_buf_ptr(buf) as Pointer,
                    clamp_int(buf.len() * 2),
                    &mut string_length_in_bytes as *mut i32,
                )
                .into_sql_result("SQLGetConnectAttrW");
            }

            buf.resize(((string_length_in_bytes.max(0) + 1) / 2) as usize, 0);
            res
        }
    }
}
