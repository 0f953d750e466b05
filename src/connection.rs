use std::{
    cell::{Cell, RefCell},
    mem::ManuallyDrop,
    rc::Rc,
};

use log::{debug, error, warn};
use widestring::U16String;

use crate::{
    cursor::{CursorSource, ResultCursor},
    handles::{self, slice_to_utf8, SqlResult},
    registry::{HandleTable, Key},
    Error, Statement,
};

/// Settings applied to a connection handle before connecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Number of seconds to wait for a login request to complete. `None` or `Some(0)` leaves the
    /// decision to the driver.
    pub login_timeout_sec: Option<u32>,
}

/// State shared between a [`Connection`] and every [`Statement`] created from it.
///
/// Statements only hold [`Key`]s into `statements`. Once the connection is closed all keys go
/// stale, so using a statement afterwards is reported as a programming error instead of touching a
/// freed handle.
pub(crate) struct ConnectionCore<'env> {
    statements: HandleTable<handles::Statement>,
    /// Only dropped after a successful disconnect. Freeing a connected handle fails.
    handle: ManuallyDrop<handles::Connection<'env>>,
    connected: bool,
    dbms_name: Option<String>,
    dbms_version: Option<String>,
}

impl<'env> ConnectionCore<'env> {
    fn new(handle: handles::Connection<'env>) -> Self {
        Self {
            statements: HandleTable::new(),
            handle: ManuallyDrop::new(handle),
            connected: true,
            dbms_name: None,
            dbms_version: None,
        }
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::not_connected())
        }
    }

    pub fn allocate_statement(&mut self) -> Result<Key, Error> {
        self.ensure_connected()?;
        // Safety: Statements are freed before the connection is disconnected.
        let statement = unsafe { self.handle.allocate_statement() }.into_result(&*self.handle)?;
        self.statements.insert(statement).map_err(|_| {
            Error::General("No more statements can be allocated on this connection.".to_owned())
        })
    }

    pub fn statement_mut(&mut self, key: Key) -> Result<&mut handles::Statement, Error> {
        self.ensure_connected()?;
        self.statements.get_mut(key).ok_or_else(|| {
            Error::Programming("The statement has already been closed.".to_owned())
        })
    }

    /// Frees the statement handle. Stale keys are ignored.
    pub fn free_statement(&mut self, key: Key) {
        if let Some(statement) = self.statements.remove(key) {
            drop(statement);
        }
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        if !self.connected {
            return Ok(());
        }
        // Statements go first. Their keys are stale from now on, even if disconnecting fails.
        let freed = self.statements.drain().len();
        if freed != 0 {
            debug!("Freed {freed} statement handles before disconnecting.");
        }
        self.handle.disconnect().into_result(&*self.handle)?;
        self.connected = false;
        debug!("Disconnected from data source.");
        Ok(())
    }

    /// Disconnect, rolling back a pending transaction if that is what keeps the driver from
    /// disconnecting.
    fn disconnect_best_effort(&mut self) -> Result<(), Error> {
        match self.disconnect() {
            Ok(()) => Ok(()),
            Err(e) if e.state() == Some(handles::State::INVALID_STATE_TRANSACTION) => {
                warn!("Rolling back open transaction before disconnecting.");
                self.handle.rollback().into_result(&*self.handle)?;
                self.disconnect()
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for ConnectionCore<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect_best_effort() {
            // Leaking the connection handle is better than aborting the process while dropping.
            error!("Failed to disconnect. The connection handle is leaked. {e}");
            return;
        }
        // Safety: `handle` is not used after this point and has been disconnected.
        unsafe { ManuallyDrop::drop(&mut self.handle) }
    }
}

/// Shared handle to the connection state, as held by statements.
pub(crate) type SharedCore<'env> = Rc<RefCell<ConnectionCore<'env>>>;

/// Borrows the connection state mutably. Fails instead of panicking if it is already borrowed,
/// which could only happen if a statement is used from within a callback of another one.
pub(crate) fn borrow_core<'a, 'env>(
    core: &'a SharedCore<'env>,
) -> Result<std::cell::RefMut<'a, ConnectionCore<'env>>, Error> {
    core.try_borrow_mut().map_err(|_| {
        Error::Programming("The connection is already in use by another operation.".to_owned())
    })
}

/// The connection handle references storage of all information about the connection to the data
/// source, including status, transaction state, and error information.
///
/// A `Connection`, its statements and their cursors are meant to be used from one thread only.
/// They are neither `Send` nor `Sync`. Independent connections may be used in parallel.
///
/// Dropping the connection disconnects it. Statements which are still alive afterwards fail with
/// [`crate::ErrorKind::Programming`].
pub struct Connection<'env> {
    core: SharedCore<'env>,
    /// `true` while a transaction started with [`Connection::begin_transaction`] is open.
    in_transaction: Cell<bool>,
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        match borrow_core(&self.core) {
            Ok(mut core) => {
                if let Err(e) = core.disconnect_best_effort() {
                    error!("Error disconnecting: {e}");
                }
            }
            Err(e) => error!("{e}"),
        }
    }
}

impl<'env> Connection<'env> {
    pub(crate) fn new(handle: handles::Connection<'env>) -> Self {
        Self {
            core: Rc::new(RefCell::new(ConnectionCore::new(handle))),
            in_transaction: Cell::new(false),
        }
    }

    /// `true` until the connection is closed with [`Self::disconnect`].
    pub fn is_connected(&self) -> bool {
        self.core
            .try_borrow()
            .map(|core| core.connected)
            .unwrap_or(true)
    }

    /// Closes the connection. Every statement created from this connection is freed. Calling
    /// `disconnect` again after a successful call does nothing.
    ///
    /// Fails with [`crate::ErrorKind::Programming`] while a transaction started with
    /// [`Self::begin_transaction`] is open. The connection and its statements stay usable in that
    /// case.
    pub fn disconnect(&self) -> Result<(), Error> {
        if self.in_transaction.get() {
            return Err(Error::Programming(
                "A transaction is in progress. Commit or roll back before disconnecting."
                    .to_owned(),
            ));
        }
        borrow_core(&self.core)?.disconnect()?;
        self.in_transaction.set(false);
        Ok(())
    }

    /// Name of the database management system, e.g. `"PostgreSQL"` or `"SQLite"`. Queried from the
    /// driver on the first call.
    pub fn dbms_name(&self) -> Result<String, Error> {
        let mut core = borrow_core(&self.core)?;
        core.ensure_connected()?;
        if let Some(name) = &core.dbms_name {
            return Ok(name.clone());
        }
        let mut buf = Vec::with_capacity(64);
        core.handle
            .fetch_database_management_system_name(&mut buf)
            .into_result(&*core.handle)?;
        let name = slice_to_utf8(&buf);
        core.dbms_name = Some(name.clone());
        Ok(name)
    }

    /// Version of the database management system, e.g. `"15.04.0000"`. Queried from the driver on
    /// the first call.
    pub fn dbms_version(&self) -> Result<String, Error> {
        let mut core = borrow_core(&self.core)?;
        core.ensure_connected()?;
        if let Some(version) = &core.dbms_version {
            return Ok(version.clone());
        }
        let mut buf = Vec::with_capacity(32);
        core.handle
            .fetch_database_management_system_version(&mut buf)
            .into_result(&*core.handle)?;
        let version = slice_to_utf8(&buf);
        core.dbms_version = Some(version.clone());
        Ok(version)
    }

    /// Name of the current catalog (database). Always asks the driver, since executing e.g.
    /// `USE other_database` changes it.
    pub fn database_name(&self) -> Result<String, Error> {
        let core = borrow_core(&self.core)?;
        core.ensure_connected()?;
        let mut buf = Vec::with_capacity(64);
        core.handle
            .fetch_current_catalog(&mut buf)
            .into_result(&*core.handle)?;
        Ok(slice_to_utf8(&buf))
    }

    /// Prepares an SQL statement. Use `?` as placeholder for parameters and bind them by their
    /// zero based ordinal.
    ///
    /// # Parameters
    ///
    /// * `sql`: The text representation of the SQL statement.
    /// * `timeout_sec`: Query timeout applied to every execution. `0` keeps the driver default.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use odbc_kit::{ConnectionOptions, Environment};
    ///
    /// let env = unsafe { Environment::new()? };
    /// let conn = env.connect_with_connection_string("Driver={SQLite3};Database=:memory:", ConnectionOptions::default())?;
    /// let mut statement = conn.prepare("SELECT ? + 1", 0)?;
    /// statement.bind(0, 41)?;
    /// let mut cursor = statement.execute(0)?;
    /// if cursor.next()? {
    ///     assert_eq!(42, cursor.get_i32(0)?);
    /// }
    /// # Ok::<(), odbc_kit::Error>(())
    /// ```
    pub fn prepare(&self, sql: &str, timeout_sec: usize) -> Result<Statement<'env>, Error> {
        let key = borrow_core(&self.core)?.allocate_statement()?;
        // Construct first, so the handle is freed again if preparing fails.
        let mut statement = Statement::new(self.core.clone(), key, sql.to_owned());
        let text = U16String::from_str(sql);
        statement.with_handle(|handle| {
            if timeout_sec != 0 {
                handle.set_query_timeout_sec(timeout_sec).into_result(handle)?;
            }
            handle.prepare(&text).into_result(handle)
        })?;
        statement.mark_prepared(timeout_sec);
        debug!("Prepared statement: {sql}");
        Ok(statement)
    }

    /// Executes an SQL statement directly, without preparing it first. Use this for statements
    /// which are only executed once. The returned cursor owns the statement.
    ///
    /// A statement which does not produce a result set (e.g. `INSERT`) returns a cursor without
    /// columns, which still reports the number of affected rows.
    pub fn execute(
        &self,
        sql: &str,
        timeout_sec: usize,
    ) -> Result<ResultCursor<'env, 'env>, Error> {
        let key = borrow_core(&self.core)?.allocate_statement()?;
        let statement = Statement::new(self.core.clone(), key, sql.to_owned());
        let text = U16String::from_str(sql);
        statement.with_handle(|handle| {
            if timeout_sec != 0 {
                handle.set_query_timeout_sec(timeout_sec).into_result(handle)?;
            }
            handle.exec_direct(&text).into_result(handle)
        })?;
        debug!("Executed statement: {sql}");
        ResultCursor::new(CursorSource::Owned(statement))
    }

    /// Executes an SQL statement and discards any result set.
    ///
    /// # Return
    ///
    /// Number of rows affected, if reported by the driver.
    pub fn just_execute(&self, sql: &str, timeout_sec: usize) -> Result<Option<usize>, Error> {
        let cursor = self.execute(sql, timeout_sec)?;
        Ok(cursor.affected_rows())
    }

    /// Enables or disables autocommit mode. Switching autocommit back on commits any open
    /// transaction.
    pub fn set_autocommit(&self, enabled: bool) -> Result<(), Error> {
        let core = borrow_core(&self.core)?;
        core.ensure_connected()?;
        core.handle.set_autocommit(enabled).into_result(&*core.handle)
    }

    /// Starts a transaction by switching autocommit off. It ends with [`Self::commit`] or
    /// [`Self::rollback`], which switch autocommit on again.
    pub fn begin_transaction(&self) -> Result<(), Error> {
        if self.in_transaction.get() {
            return Err(Error::Programming(
                "A transaction is already in progress.".to_owned(),
            ));
        }
        self.set_autocommit(false)?;
        self.in_transaction.set(true);
        Ok(())
    }

    /// Commits the current transaction.
    pub fn commit(&self) -> Result<(), Error> {
        self.end_transaction(|handle| handle.commit())
    }

    /// Rolls back the current transaction.
    pub fn rollback(&self) -> Result<(), Error> {
        self.end_transaction(|handle| handle.rollback())
    }

    /// `true` while a transaction started with [`Self::begin_transaction`] is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    fn end_transaction(
        &self,
        end: impl FnOnce(&handles::Connection<'env>) -> SqlResult<()>,
    ) -> Result<(), Error> {
        let core = borrow_core(&self.core)?;
        core.ensure_connected()?;
        end(&*core.handle).into_result(&*core.handle)?;
        if self.in_transaction.get() {
            core.handle.set_autocommit(true).into_result(&*core.handle)?;
            self.in_transaction.set(false);
        }
        Ok(())
    }
}
