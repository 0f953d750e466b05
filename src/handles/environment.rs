use super::{
    as_handle::AsHandle,
    buffer::{clamp_small_int, mut_buf_ptr},
    drop_handle,
    sql_result::ExtSqlReturn,
    Connection, SqlChar, SqlResult,
};
use log::debug;
use odbc_sys::{
    AttrOdbcVersion, EnvironmentAttribute, FetchOrientation, HDbc, HEnv, Handle, HandleType,
    SQLAllocHandle, SQLDataSourcesW, SQLDriversW, SQLSetEnvAttr,
};
use std::ptr::null_mut;

/// An `Environment` is a global context, in which to access data.
///
/// Associated with an `Environment` is any information that is global in nature, such as:
///
/// * The `Environment`'s state
/// * The current environment-level diagnostics
/// * The handles of connections currently allocated on the environment
/// * The current stetting of each environment attribute
#[derive(Debug)]
pub struct Environment {
    /// Invariant: Should always point to a valid ODBC Environment
    handle: HEnv,
}

/// See: <https://docs.microsoft.com/en-us/sql/odbc/reference/develop-app/multithreading>
unsafe impl Send for Environment {}
/// See: <https://docs.microsoft.com/en-us/sql/odbc/reference/develop-app/multithreading>
unsafe impl Sync for Environment {}

unsafe impl AsHandle for Environment {
    fn as_handle(&self) -> Handle {
        self.handle.as_handle()
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Env
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.handle.as_handle(), HandleType::Env);
        }
    }
}

impl Environment {
    /// An allocated ODBC Environment handle
    ///
    /// # Safety
    ///
    /// There may only be one ODBC environment in any process at any time. Take care using this
    /// function in unit tests, as these run in parallel by default in Rust.
    pub unsafe fn new() -> SqlResult<Self> {
        let mut handle = Handle::null();
        let result: SqlResult<()> = SQLAllocHandle(HandleType::Env, Handle::null(), &mut handle)
            .into_sql_result("SQLAllocHandle");
        result.on_success(|| {
            debug!("ODBC Environment created.");
            Environment {
                handle: HEnv(handle.0),
            }
        })
    }

    /// Declares which Version of the ODBC API we want to use. This is the first thing that should
    /// be done with any ODBC environment.
    pub fn declare_version(&self, version: AttrOdbcVersion) -> SqlResult<()> {
        unsafe {
            SQLSetEnvAttr(
                self.handle,
                EnvironmentAttribute::OdbcVersion,
                version.into(),
                0,
            )
            .into_sql_result("SQLSetEnvAttr")
        }
    }

    /// Allocate a new connection handle. The `Connection` must not outlive the `Environment`.
    pub fn allocate_connection(&self) -> SqlResult<Connection<'_>> {
        let mut handle = Handle::null();
        unsafe {
            SQLAllocHandle(HandleType::Dbc, self.as_handle(), &mut handle)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| Connection::new(HDbc(handle.0)))
        }
    }

    /// Use together with [`Environment::drivers_buffer_fill`] to list drivers descriptions and
    /// driver attribute keywords.
    ///
    /// # Safety
    ///
    /// Callers need to make sure only one thread is iterating over driver information at a time.
    ///
    /// # Return
    ///
    /// `(driver description length, attribute length)`. Length is in characters minus terminating
    /// terminating zero. `NoData` once the list is exhausted.
    pub unsafe fn drivers_buffer_len(&self, direction: FetchOrientation) -> SqlResult<(i16, i16)> {
        // Lengths in characters minus terminating zero
        let mut length_description: i16 = 0;
        let mut length_attributes: i16 = 0;
        SQLDriversW(
            self.handle,
            direction,
            null_mut(),
            0,
            &mut length_description,
            null_mut(),
            0,
            &mut length_attributes,
        )
        .into_sql_result("SQLDriversW")
        .on_success(|| (length_description, length_attributes))
    }

    /// List drivers descriptions and driver attribute keywords. Buffers are filled up to their
    /// capacity. Use [`Environment::drivers_buffer_len`] to determine buffer lengths.
    ///
    /// # Safety
    ///
    /// Callers need to make sure only one thread is iterating over driver information at a time.
    pub unsafe fn drivers_buffer_fill(
        &self,
        direction: FetchOrientation,
        buffer_description: &mut [SqlChar],
        buffer_attributes: &mut [SqlChar],
    ) -> SqlResult<()> {
        SQLDriversW(
            self.handle,
            direction,
            mut_buf_ptr(buffer_description),
            clamp_small_int(buffer_description.len()),
            null_mut(),
            mut_buf_ptr(buffer_attributes),
            clamp_small_int(buffer_attributes.len()),
            null_mut(),
        )
        .into_sql_result("SQLDriversW")
    }

    /// Use together with [`Environment::data_source_buffer_fill`] to list data sources.
    ///
    /// # Safety
    ///
    /// Callers need to make sure only one thread is iterating over data source information at a
    /// time.
    ///
    /// # Return
    ///
    /// `(server name length,  description length)`. Length is in characters minus terminating zero.
    pub unsafe fn data_source_buffer_len(
        &self,
        direction: FetchOrientation,
    ) -> SqlResult<(i16, i16)> {
        let mut length_name: i16 = 0;
        let mut length_description: i16 = 0;
        SQLDataSourcesW(
            self.handle,
            direction,
            null_mut(),
            0,
            &mut length_name,
            null_mut(),
            0,
            &mut length_description,
        )
        .into_sql_result("SQLDataSourcesW")
        .on_success(|| (length_name, length_description))
    }

    /// List data source names and the description of their drivers.
    ///
    /// # Safety
    ///
    /// Callers need to make sure only one thread is iterating over data source information at a
    /// time.
    pub unsafe fn data_source_buffer_fill(
        &self,
        direction: FetchOrientation,
        buffer_name: &mut [SqlChar],
        buffer_description: &mut [SqlChar],
    ) -> SqlResult<()> {
        SQLDataSourcesW(
            self.handle,
            direction,
            mut_buf_ptr(buffer_name),
            clamp_small_int(buffer_name.len()),
            null_mut(),
            mut_buf_ptr(buffer_description),
            clamp_small_int(buffer_description.len()),
            null_mut(),
        )
        .into_sql_result("SQLDataSourcesW")
    }
}
