use std::{cmp::max, collections::HashMap, sync::Mutex};

use crate::{
    connection::ConnectionOptions,
    error::ExtendResult,
    handles::{self, slice_to_utf8, SqlChar, SqlResult, State},
    Connection, Error,
};
use log::debug;
use odbc_sys::{AttrOdbcVersion, FetchOrientation};
use widestring::U16String;

#[cfg(not(feature = "odbc_version_3_80"))]
const ODBC_API_VERSION: AttrOdbcVersion = AttrOdbcVersion::Odbc3;
#[cfg(feature = "odbc_version_3_80")]
const ODBC_API_VERSION: AttrOdbcVersion = AttrOdbcVersion::Odbc3_80;

/// An ODBC 3 environment.
///
/// Associated with an `Environment` is any information that is global in nature, such as:
///
/// * The `Environment`'s state
/// * The current environment-level diagnostics
/// * The handles of connections currently allocated on the environment
/// * The current setting of each environment attribute
///
/// Creating the environment is the first step of any application. Connections borrow it, so it
/// outlives all of them.
#[derive(Debug)]
pub struct Environment {
    environment: handles::Environment,
    /// Listing drivers and data sources iterates over state stored in the environment handle.
    info_lock: Mutex<()>,
}

impl Environment {
    /// Entry point into this API. Allocates a new ODBC Environment and declares to the driver
    /// manager that the Application wants to use ODBC version 3.80 (or 3 with the
    /// `odbc_version_3_5` feature).
    ///
    /// # Safety
    ///
    /// There may only be one ODBC environment in any process at any time. Take care using this
    /// function in unit tests, as these run in parallel by default in Rust. Also no library should
    /// probably wrap the creation of an odbc environment into a safe function call.
    pub unsafe fn new() -> Result<Self, Error> {
        let environment = match handles::Environment::new() {
            SqlResult::Success(env) | SqlResult::SuccessWithInfo(env) => env,
            SqlResult::Error { .. } | SqlResult::Unexpected { .. } | SqlResult::NoData => {
                return Err(Error::FailedAllocatingEnvironment)
            }
        };
        environment
            .declare_version(ODBC_API_VERSION)
            .into_result(&environment)
            .provide_context_for_diagnostic(|record, function| match record.state {
                // Older driver managers report an invalid attribute value instead of an invalid
                // state transaction.
                State::INVALID_STATE_TRANSACTION | State::INVALID_ATTRIBUTE_VALUE => {
                    Error::UnsupportedOdbcApiVersion(record)
                }
                _ => Error::Diagnostics { record, function },
            })?;
        debug!("ODBC environment ready. Declared version {:?}.", ODBC_API_VERSION);
        Ok(Self {
            environment,
            info_lock: Mutex::new(()),
        })
    }

    /// Allocates a connection handle and establishes a connection to a data source.
    ///
    /// # Arguments
    ///
    /// * `data_source_name` - Data source name. The data might be located on the same computer as
    ///   the program, or on another computer somewhere on a network.
    /// * `user` - User identifier.
    /// * `pwd` - Authentication string (typically the password).
    /// * `options` - Login timeout and other settings applied before connecting.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use odbc_kit::{ConnectionOptions, Environment};
    ///
    /// let env = unsafe { Environment::new()? };
    ///
    /// let conn = env.connect("YourDatabase", "SA", "My@Test@Password1", ConnectionOptions::default())?;
    /// # Ok::<(), odbc_kit::Error>(())
    /// ```
    pub fn connect(
        &self,
        data_source_name: &str,
        user: &str,
        pwd: &str,
        options: ConnectionOptions,
    ) -> Result<Connection<'_>, Error> {
        let data_source_name = U16String::from_str(data_source_name);
        let user = U16String::from_str(user);
        let pwd = U16String::from_str(pwd);
        let mut connection = self.allocate_connection(options)?;
        connection
            .connect(&data_source_name, &user, &pwd)
            .into_result(&connection)?;
        debug!("Connected to data source '{}'.", data_source_name.to_string_lossy());
        Ok(Connection::new(connection))
    }

    /// Allocates a connection handle and establishes a connection to a data source using a
    /// connection string. The driver is never allowed to prompt for missing information.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use odbc_kit::{ConnectionOptions, Environment};
    ///
    /// let env = unsafe { Environment::new()? };
    ///
    /// let connection_string = "
    ///     Driver={ODBC Driver 18 for SQL Server};\
    ///     Server=localhost;\
    ///     UID=SA;\
    ///     PWD=My@Test@Password1;\
    /// ";
    ///
    /// let options = ConnectionOptions { login_timeout_sec: Some(5) };
    /// let conn = env.connect_with_connection_string(connection_string, options)?;
    /// # Ok::<(), odbc_kit::Error>(())
    /// ```
    pub fn connect_with_connection_string(
        &self,
        connection_string: &str,
        options: ConnectionOptions,
    ) -> Result<Connection<'_>, Error> {
        let connection_string = U16String::from_str(connection_string);
        let mut connection = self.allocate_connection(options)?;
        connection
            .connect_with_connection_string(&connection_string)
            .into_result(&connection)?;
        debug!("Connected using connection string.");
        Ok(Connection::new(connection))
    }

    fn allocate_connection(
        &self,
        options: ConnectionOptions,
    ) -> Result<handles::Connection<'_>, Error> {
        let mut connection = self
            .environment
            .allocate_connection()
            .into_result(&self.environment)?;
        if let Some(timeout) = options.login_timeout_sec.filter(|&sec| sec != 0) {
            connection
                .set_login_timeout_sec(timeout)
                .into_result(&connection)?;
        }
        Ok(connection)
    }

    /// Get information about available drivers. Only 32 or 64 Bit drivers will be listed,
    /// depending on whether you are building a 32 Bit or 64 Bit application.
    pub fn drivers(&self) -> Result<Vec<DriverInfo>, Error> {
        let _lock = self
            .info_lock
            .lock()
            .map_err(|_| Error::General("Lock guarding driver listing is poisoned.".to_owned()))?;

        // Find required buffer size to avoid truncation.
        let (mut desc_len, mut attr_len) = (0, 0);
        let mut direction = FetchOrientation::First;
        while let Some((candidate_desc_len, candidate_attr_len)) = unsafe {
            self.environment
                .drivers_buffer_len(direction)
                .into_result_option(&self.environment)?
        } {
            desc_len = max(candidate_desc_len, desc_len);
            attr_len = max(candidate_attr_len, attr_len);
            direction = FetchOrientation::Next;
        }

        // Allocate +1 character extra for terminating zero
        let mut desc_buf = vec![0; desc_len.max(0) as usize + 1];
        let mut attr_buf = vec![0; attr_len.max(0) as usize + 1];

        let mut driver_info = Vec::new();
        let mut direction = FetchOrientation::First;
        while unsafe {
            self.environment
                .drivers_buffer_fill(direction, &mut desc_buf, &mut attr_buf)
                .into_result_option(&self.environment)?
                .is_some()
        } {
            driver_info.push(DriverInfo {
                description: until_nul(&desc_buf),
                attributes: attributes_iter(&until_nul_list(&attr_buf)).collect(),
            });
            direction = FetchOrientation::Next;
        }

        Ok(driver_info)
    }

    /// User and system data sources
    pub fn data_sources(&self) -> Result<Vec<DataSourceInfo>, Error> {
        let _lock = self.info_lock.lock().map_err(|_| {
            Error::General("Lock guarding data source listing is poisoned.".to_owned())
        })?;

        let (mut name_len, mut desc_len) = (0, 0);
        let mut direction = FetchOrientation::First;
        while let Some((candidate_name_len, candidate_desc_len)) = unsafe {
            self.environment
                .data_source_buffer_len(direction)
                .into_result_option(&self.environment)?
        } {
            name_len = max(candidate_name_len, name_len);
            desc_len = max(candidate_desc_len, desc_len);
            direction = FetchOrientation::Next;
        }

        let mut name_buf = vec![0; name_len.max(0) as usize + 1];
        let mut desc_buf = vec![0; desc_len.max(0) as usize + 1];

        let mut data_sources = Vec::new();
        let mut direction = FetchOrientation::First;
        while unsafe {
            self.environment
                .data_source_buffer_fill(direction, &mut name_buf, &mut desc_buf)
                .into_result_option(&self.environment)?
                .is_some()
        } {
            data_sources.push(DataSourceInfo {
                server_name: until_nul(&name_buf),
                driver: until_nul(&desc_buf),
            });
            direction = FetchOrientation::Next;
        }

        Ok(data_sources)
    }
}

/// Decodes a zero terminated UTF-16 string.
fn until_nul(buf: &[SqlChar]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    slice_to_utf8(&buf[..end])
}

/// Decodes a list of zero terminated strings, which itself is terminated by an empty string.
fn until_nul_list(buf: &[SqlChar]) -> String {
    let end = buf
        .windows(2)
        .position(|w| w == [0, 0])
        .map(|pos| pos + 1)
        .unwrap_or(buf.len());
    slice_to_utf8(&buf[..end])
}

/// Struct holding information available on a driver. Can be obtained via [`Environment::drivers`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DriverInfo {
    /// Name of the ODBC driver
    pub description: String,
    /// Attributes values of the driver by key
    pub attributes: HashMap<String, String>,
}

/// Holds name and description of a datasource
///
/// Can be obtained via [`Environment::data_sources`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataSourceInfo {
    /// Name of the data source
    pub server_name: String,
    /// Description of the data source
    pub driver: String,
}

/// Parses the list of attributes reported for a driver.
///
/// Key value pairs are separated by `\0`. Key and value are separated by `=`
fn attributes_iter(attributes: &str) -> impl Iterator<Item = (String, String)> + '_ {
    attributes
        .split('\0')
        .take_while(|kv_str| !kv_str.is_empty())
        .filter_map(|kv_str| {
            let (key, value) = kv_str.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
}
