use lazy_static::lazy_static;
use odbc_kit::{Connection, ConnectionOptions, Environment};

// Rust by default executes tests in parallel. Share one environment between all of them.
lazy_static! {
    pub static ref ENV: Environment = {
        let _ = env_logger::builder().is_test(true).try_init();
        unsafe { Environment::new().unwrap() }
    };
}

/// Data source specific settings for running the same test against different databases.
#[derive(Clone, Copy, Debug)]
pub struct Profile {
    pub connection_string: &'static str,
    /// Column type for binary large objects.
    pub blob_type: &'static str,
}

impl Profile {
    pub fn connection(&self) -> Result<Connection<'static>, odbc_kit::Error> {
        ENV.connect_with_connection_string(self.connection_string, ConnectionOptions::default())
    }

    /// Connects and (re)creates an empty table `table_name` with the given column definitions.
    pub fn setup_empty_table(
        &self,
        table_name: &str,
        column_definitions: &[&str],
    ) -> Result<Connection<'static>, odbc_kit::Error> {
        let conn = self.connection()?;
        conn.just_execute(&format!("DROP TABLE IF EXISTS {table_name}"), 0)?;
        let columns = column_definitions.join(", ");
        conn.just_execute(&format!("CREATE TABLE {table_name} ({columns})"), 0)?;
        Ok(conn)
    }
}

#[cfg(target_os = "windows")]
const SQLITE_3_CONNECTION: &str = "Driver={SQLite3 ODBC Driver};Database=sqlite-test.db";
#[cfg(not(target_os = "windows"))]
const SQLITE_3_CONNECTION: &str = "Driver={SQLite3};Database=sqlite-test.db";

pub const SQLITE_3: &Profile = &Profile {
    connection_string: SQLITE_3_CONNECTION,
    blob_type: "BLOB",
};

const POSTGRES_CONNECTION: &str = "Driver={PostgreSQL UNICODE};\
    Server=localhost;\
    Port=5432;\
    Database=test;\
    Uid=test;\
    Pwd=test;";

pub const POSTGRES: &Profile = &Profile {
    connection_string: POSTGRES_CONNECTION,
    blob_type: "BYTEA",
};
