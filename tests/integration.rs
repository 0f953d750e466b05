mod common;

use stdext::function_name;
use test_case::test_case;

use common::{Profile, ENV, POSTGRES, SQLITE_3};

use odbc_kit::{ConnectionOptions, DataType, Date, Error, ErrorKind, Time, Timestamp, Value};

macro_rules! table_name {
    () => {
        // Make function name a valid table name
        function_name!()
            .replace("::", "_")
            .replace(r#"_{{closure}}"#, "")
    };
}

#[test]
fn bogus_connection_string() {
    // When
    let result = ENV.connect_with_connection_string("foobar", ConnectionOptions::default());

    // Then

    // We expect an error, since "foobar" is obviously not a connection string we can use to connect
    // to any datasource (for starters it does not specify a driver).
    let error = result.err().unwrap();
    assert_eq!(ErrorKind::Database, error.kind());
    if let Error::Diagnostics { record, function } = error {
        assert_eq!("SQLDriverConnectW", function);
        // Make sure we remove any Nuls from the message, trailing or otherwise.
        assert!(!record.message.contains(&0));
    } else {
        panic!("Expected Error::Diagnostics")
    };
}

#[test]
fn unknown_data_source_name() {
    let result = ENV.connect(
        "odbc_kit_no_such_data_source",
        "",
        "",
        ConnectionOptions::default(),
    );

    let error = result.err().unwrap();
    assert_eq!(ErrorKind::Database, error.kind());
    if let Error::Diagnostics { function, .. } = error {
        assert_eq!("SQLConnectW", function);
    } else {
        panic!("Expected Error::Diagnostics")
    };
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn connect_and_disconnect(profile: &Profile) {
    let conn = profile.connection().unwrap();
    assert!(conn.is_connected());

    conn.disconnect().unwrap();
    assert!(!conn.is_connected());
    // Closing twice is benign
    conn.disconnect().unwrap();
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn dbms_name_is_cached(profile: &Profile) {
    let conn = profile.connection().unwrap();

    let first = conn.dbms_name().unwrap();
    let second = conn.dbms_name().unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert!(!conn.dbms_version().unwrap().is_empty());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn insert_and_select(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER", "b VARCHAR(10)"])
        .unwrap();

    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a, b) VALUES (?, ?)"), 0)
        .unwrap();
    assert_eq!(2, insert.parameter_count().unwrap());
    insert.bind(0, 42).unwrap();
    insert.bind(1, "Hello").unwrap();
    assert_eq!(Some(1), insert.execute(0).unwrap().affected_rows());
    // Only rebind the first parameter, the second one keeps its value.
    insert.bind_i32(0, 43).unwrap();
    insert.execute(0).unwrap();
    insert.bind_i32(0, 7).unwrap();
    insert.bind_null(1).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a, b FROM {table_name} ORDER BY a"), 0)
        .unwrap();
    assert_eq!(2, cursor.column_count());

    assert!(cursor.next().unwrap());
    assert_eq!(7, cursor.get_i32(0).unwrap());
    assert_eq!(None, cursor.get_nullable::<String>("b").unwrap());
    assert!(cursor.is_null(1).unwrap());
    assert_eq!(
        ErrorKind::NullAccess,
        cursor.get_string(1).unwrap_err().kind()
    );

    assert!(cursor.next().unwrap());
    assert_eq!(42, cursor.get_i32("a").unwrap());
    assert_eq!("Hello", cursor.get_string("b").unwrap());

    assert!(cursor.next().unwrap());
    assert_eq!(43, cursor.get_i32(0).unwrap());
    assert_eq!("Hello", cursor.get_string(1).unwrap());

    assert!(!cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn next_reports_end_after_last_row(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    conn.just_execute(&format!("INSERT INTO {table_name} (a) VALUES (1), (2), (3)"), 0)
        .unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name} ORDER BY a"), 0)
        .unwrap();

    assert_eq!(-1, cursor.position());
    for expected in 1..=3 {
        assert!(cursor.next().unwrap());
        assert_eq!(expected, cursor.get_i64(0).unwrap());
        assert_eq!(i64::from(expected - 1), cursor.position());
    }
    assert!(!cursor.next().unwrap());
    assert!(cursor.at_end());
    assert_eq!(3, cursor.position());
    assert_eq!(Some(3), cursor.row_count());
    // Staying at the end does not bother the driver again.
    assert!(!cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn access_by_name_and_ordinal_agree(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER", "b VARCHAR(10)"])
        .unwrap();
    conn.just_execute(&format!("INSERT INTO {table_name} (a, b) VALUES (1, 'one')"), 0)
        .unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a, b FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());

    assert_eq!(1, cursor.column_index("b").unwrap());
    assert_eq!("b", cursor.column_name(1).unwrap());
    assert_eq!(cursor.value(1).unwrap(), cursor.value("b").unwrap());
    assert_eq!(cursor.value(0).unwrap(), cursor.value("a").unwrap());
    assert_eq!(DataType::Integer, cursor.column_data_type("a").unwrap());
    assert!(cursor.column_data_type(1).unwrap().is_text());
    assert!(!cursor.column_type_name(0).unwrap().is_empty());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn unknown_columns_are_out_of_range(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut cursor = conn.execute("SELECT 1 AS a", 0).unwrap();
    assert!(cursor.next().unwrap());

    let by_name = cursor.get_i32("no_such_column").unwrap_err();
    let by_ordinal = cursor.get_i32(5).unwrap_err();
    // Names are case sensitive
    let wrong_case = cursor.get_i32("A").unwrap_err();

    assert_eq!(ErrorKind::IndexOutOfRange, by_name.kind());
    assert_eq!(ErrorKind::IndexOutOfRange, by_ordinal.kind());
    assert_eq!(ErrorKind::IndexOutOfRange, wrong_case.kind());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn value_access_before_next_is_a_programming_error(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let cursor = conn.execute("SELECT 1 AS a", 0).unwrap();

    let error = cursor.get_i32(0).unwrap_err();

    assert_eq!(ErrorKind::Programming, error.kind());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn out_of_range_coercion_is_invalid_type(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut cursor = conn.execute("SELECT 70000 AS a, -1 AS b", 0).unwrap();
    assert!(cursor.next().unwrap());

    assert_eq!(70000, cursor.get_i64(0).unwrap());
    assert_eq!(ErrorKind::InvalidType, cursor.get_i16(0).unwrap_err().kind());
    assert_eq!(ErrorKind::InvalidType, cursor.get_u16(1).unwrap_err().kind());
    assert_eq!(ErrorKind::InvalidType, cursor.get_date(0).unwrap_err().kind());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn bind_ordinal_beyond_placeholders(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a) VALUES (?)"), 0)
        .unwrap();
    insert.bind(0, 42).unwrap();

    let error = insert.bind(9999, 1).unwrap_err();

    assert_eq!(ErrorKind::Database, error.kind());
    // The failed bind did not disturb the existing one
    assert_eq!(1, insert.num_bound_parameters());
    insert.execute(0).unwrap();
    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(42, cursor.get_i32(0).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn failed_execution_leaves_statement_reexecutable(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER NOT NULL"])
        .unwrap();
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a) VALUES (?)"), 0)
        .unwrap();

    insert.bind_null(0).unwrap();
    let error = insert.execute(0).err().unwrap();
    assert_eq!(ErrorKind::Database, error.kind());

    insert.bind_i32(0, 5).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(5, cursor.get_i32(0).unwrap());
    assert!(!cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn malformed_sql_is_a_database_error(profile: &Profile) {
    let conn = profile.connection().unwrap();

    let error = conn.execute("SELEKT 1", 0).err().unwrap();

    assert_eq!(ErrorKind::Database, error.kind());
    assert!(error.state().is_some());
    // The connection is still usable
    let mut cursor = conn.execute("SELECT 1", 0).unwrap();
    assert!(cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn statement_outliving_its_connection(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut statement = conn.prepare("SELECT ?", 0).unwrap();

    conn.disconnect().unwrap();

    assert_eq!(
        ErrorKind::Programming,
        statement.bind(0, 1).unwrap_err().kind()
    );
    assert_eq!(
        ErrorKind::Programming,
        statement.execute(0).err().unwrap().kind()
    );
    assert_eq!(
        ErrorKind::Programming,
        conn.prepare("SELECT 1", 0).err().unwrap().kind()
    );
    // Dropping the connection first and the statement later is fine, too
    drop(conn);
    drop(statement);
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn closed_statement_can_not_be_executed(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut statement = conn.prepare("SELECT 1", 0).unwrap();

    statement.close();
    // Closing twice is benign
    statement.close();

    assert_eq!(
        ErrorKind::Programming,
        statement.execute(0).err().unwrap().kind()
    );
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn reexecute_prepared_query(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    conn.just_execute(&format!("INSERT INTO {table_name} (a) VALUES (1), (2), (3)"), 0)
        .unwrap();
    let mut query = conn
        .prepare(&format!("SELECT a FROM {table_name} WHERE a > ? ORDER BY a"), 0)
        .unwrap();

    query.bind(0, 1).unwrap();
    let mut cursor = query.execute(0).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(2, cursor.get_i32(0).unwrap());
    // Leave the cursor without consuming the remaining rows
    drop(cursor);

    query.bind(0, 2).unwrap();
    let mut cursor = query.execute(0).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(3, cursor.get_i32(0).unwrap());
    assert!(!cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn scroll_through_result_set(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    conn.just_execute(&format!("INSERT INTO {table_name} (a) VALUES (1), (2), (3)"), 0)
        .unwrap();
    let mut query = conn
        .prepare(&format!("SELECT a FROM {table_name} ORDER BY a"), 0)
        .unwrap();
    query.set_scrollable(true).unwrap();
    let mut cursor = query.execute(0).unwrap();

    assert!(cursor.last().unwrap());
    assert_eq!(3, cursor.get_i32(0).unwrap());
    assert_eq!(2, cursor.position());

    assert!(cursor.first().unwrap());
    assert_eq!(1, cursor.get_i32(0).unwrap());
    assert_eq!(0, cursor.position());

    assert!(cursor.move_to(1).unwrap());
    assert_eq!(2, cursor.get_i32(0).unwrap());

    assert!(cursor.prior().unwrap());
    assert_eq!(1, cursor.get_i32(0).unwrap());
    assert!(!cursor.prior().unwrap());
    assert_eq!(-1, cursor.position());

    assert!(cursor.skip(2).unwrap());
    assert_eq!(2, cursor.get_i32(0).unwrap());
    assert_eq!(1, cursor.position());

    assert!(!cursor.move_to(10).unwrap());
    assert!(cursor.at_end());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn jumping_past_the_end_reports_row_count(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    conn.just_execute(&format!("INSERT INTO {table_name} (a) VALUES (1), (2), (3)"), 0)
        .unwrap();
    let mut query = conn
        .prepare(&format!("SELECT a FROM {table_name} ORDER BY a"), 0)
        .unwrap();
    query.set_scrollable(true).unwrap();
    let mut cursor = query.execute(0).unwrap();

    // Jump past the end without visiting any row first
    assert!(!cursor.move_to(10).unwrap());

    assert!(cursor.at_end());
    assert_eq!(3, cursor.position());
    assert_eq!(Some(3), cursor.row_count());
    // The cursor really is behind the last row
    assert!(cursor.prior().unwrap());
    assert_eq!(3, cursor.get_i32(0).unwrap());
    assert_eq!(2, cursor.position());

    assert!(!cursor.skip(5).unwrap());
    assert_eq!(3, cursor.position());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn scrolling_a_forward_only_cursor_is_a_database_error(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    conn.just_execute(&format!("INSERT INTO {table_name} (a) VALUES (1), (2)"), 0)
        .unwrap();
    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name} ORDER BY a"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());

    let error = cursor.last().unwrap_err();

    assert_eq!(ErrorKind::Database, error.kind());
    // The cursor stays on the row it has been on
    assert_eq!(0, cursor.position());
    assert_eq!(1, cursor.get_i32(0).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn rollback_and_commit(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    let insert = format!("INSERT INTO {table_name} (a) VALUES (1)");
    let count = format!("SELECT COUNT(*) FROM {table_name}");

    conn.begin_transaction().unwrap();
    assert!(conn.in_transaction());
    assert_eq!(
        ErrorKind::Programming,
        conn.begin_transaction().unwrap_err().kind()
    );
    conn.just_execute(&insert, 0).unwrap();
    conn.rollback().unwrap();
    assert!(!conn.in_transaction());

    let mut cursor = conn.execute(&count, 0).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(0, cursor.get_i64(0).unwrap());
    drop(cursor);

    conn.begin_transaction().unwrap();
    conn.just_execute(&insert, 0).unwrap();
    conn.commit().unwrap();

    let mut cursor = conn.execute(&count, 0).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(1, cursor.get_i64(0).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn disconnect_refused_during_transaction(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a) VALUES (?)"), 0)
        .unwrap();
    conn.begin_transaction().unwrap();

    let error = conn.disconnect().unwrap_err();

    assert_eq!(ErrorKind::Programming, error.kind());
    assert!(conn.is_connected());
    assert!(conn.in_transaction());
    // Statements created earlier are still alive
    insert.bind_i32(0, 1).unwrap();
    insert.execute(0).unwrap();
    conn.commit().unwrap();
    conn.disconnect().unwrap();
    assert!(!conn.is_connected());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn affected_rows_of_insert(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();

    let affected = conn
        .just_execute(&format!("INSERT INTO {table_name} (a) VALUES (1), (2)"), 0)
        .unwrap();

    assert_eq!(Some(2), affected);
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn temporal_values(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["d DATE", "t TIME", "ts TIMESTAMP"])
        .unwrap();
    let date = Date::new(2021, 3, 14);
    let time = Time::new(15, 9, 26);
    let timestamp = Timestamp::new(Date::new(1999, 12, 31), Time::new(23, 59, 58), 0);

    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (d, t, ts) VALUES (?, ?, ?)"), 0)
        .unwrap();
    insert.bind_date(0, date).unwrap();
    insert.bind_time(1, time).unwrap();
    insert.bind_timestamp(2, timestamp).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT d, t, ts FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(date, cursor.get_date("d").unwrap());
    assert_eq!(time, cursor.get_time("t").unwrap());
    assert_eq!(timestamp, cursor.get_timestamp("ts").unwrap());
    // A date widens to a timestamp at midnight
    assert_eq!(
        Timestamp::from(date),
        cursor.get_timestamp("d").unwrap()
    );
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn every_value_variant_survives_a_round_trip(profile: &Profile) {
    let table_name = table_name!();
    let blob = format!("k {}", profile.blob_type);
    let conn = profile
        .setup_empty_table(
            &table_name,
            &[
                "a SMALLINT",
                "b INTEGER",
                "c INTEGER",
                "d BIGINT",
                "e REAL",
                "f DOUBLE PRECISION",
                "g VARCHAR(20)",
                "h DATE",
                "i TIME",
                "j TIMESTAMP",
                blob.as_str(),
                "l INTEGER",
            ],
        )
        .unwrap();
    let date = Date::new(2020, 2, 29);
    let time = Time::new(7, 30, 0);
    let timestamp = Timestamp::new(date, time, 0);
    let mut insert = conn
        .prepare(
            &format!(
                "INSERT INTO {table_name} (a, b, c, d, e, f, g, h, i, j, k, l) \
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            0,
        )
        .unwrap();
    insert.bind_i16(0, -32_000).unwrap();
    insert.bind_u16(1, 65_000).unwrap();
    insert.bind_i32(2, -2_000_000_000).unwrap();
    insert.bind_i64(3, 9_000_000_000_000).unwrap();
    insert.bind_f32(4, -0.5).unwrap();
    insert.bind_f64(5, 1e100).unwrap();
    insert.bind_str(6, "Grüße").unwrap();
    insert.bind_date(7, date).unwrap();
    insert.bind_time(8, time).unwrap();
    insert.bind_timestamp(9, timestamp).unwrap();
    insert.bind_bytes(10, &[0, 1, 254, 255]).unwrap();
    insert.bind_null(11).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a, b, c, d, e, f, g, h, i, j, k, l FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());

    assert_eq!(-32_000, cursor.get_i16("a").unwrap());
    assert_eq!(65_000, cursor.get_u16("b").unwrap());
    assert_eq!(-2_000_000_000, cursor.get_i32("c").unwrap());
    assert_eq!(9_000_000_000_000, cursor.get_i64("d").unwrap());
    assert_eq!(-0.5, cursor.get_f32("e").unwrap());
    assert_eq!(1e100, cursor.get_f64("f").unwrap());
    assert_eq!("Grüße", cursor.get_string("g").unwrap());
    assert_eq!(date, cursor.get_date("h").unwrap());
    assert_eq!(time, cursor.get_time("i").unwrap());
    assert_eq!(timestamp, cursor.get_timestamp("j").unwrap());
    assert_eq!(vec![0, 1, 254, 255], cursor.get_bytes("k").unwrap());
    assert!(cursor.is_null("l").unwrap());
    assert!(!cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn select_bound_parameters(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut query = conn.prepare("SELECT ? AS a, ? AS b, ? AS c", 0).unwrap();
    query.bind_i32(0, 42).unwrap();
    query.bind_str(1, "forty two").unwrap();
    query.bind_null(2).unwrap();

    let mut cursor = query.execute(0).unwrap();
    assert!(cursor.next().unwrap());

    assert_eq!(42, cursor.get_i32("a").unwrap());
    assert_eq!("forty two", cursor.get_string("b").unwrap());
    assert!(cursor.is_null("c").unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn floating_point_values(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a DOUBLE PRECISION", "b REAL"])
        .unwrap();
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a, b) VALUES (?, ?)"), 0)
        .unwrap();
    insert.bind_f64(0, 0.125).unwrap();
    insert.bind_f32(1, 2.5).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a, b FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(0.125, cursor.get_f64(0).unwrap());
    assert_eq!(2.5, cursor.get_f32(1).unwrap());
    assert_eq!(2.5, cursor.get_f64(1).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn binary_values(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &[format!("a {}", profile.blob_type).as_str()])
        .unwrap();
    let payload: Vec<u8> = (0..=255).cycle().take(10_000).collect();
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a) VALUES (?)"), 0)
        .unwrap();
    insert.bind_bytes(0, &payload).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());

    assert_eq!(payload, cursor.get_bytes(0).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn text_larger_than_a_chunk(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a TEXT"])
        .unwrap();
    let text: String = "Löwe 老虎 Léopard ".repeat(500);
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a) VALUES (?)"), 0)
        .unwrap();
    insert.bind_str(0, &text).unwrap();
    insert.execute(0).unwrap();
    insert.bind_str(0, "").unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name} ORDER BY a"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!("", cursor.get_string(0).unwrap());
    assert!(cursor.next().unwrap());
    assert_eq!(text, cursor.get_string(0).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn integers_read_as_bool(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut cursor = conn.execute("SELECT 1 AS a, 0 AS b, 2 AS c", 0).unwrap();
    assert!(cursor.next().unwrap());

    assert!(cursor.get_bool("a").unwrap());
    assert!(!cursor.get_bool("b").unwrap());
    assert_eq!(ErrorKind::InvalidType, cursor.get_bool("c").unwrap_err().kind());
}

#[test_case(SQLITE_3; "SQLite 3")]
fn bind_bool(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();
    let mut insert = conn
        .prepare(&format!("INSERT INTO {table_name} (a) VALUES (?)"), 0)
        .unwrap();
    insert.bind_bool(0, true).unwrap();
    insert.execute(0).unwrap();

    let mut cursor = conn
        .execute(&format!("SELECT a FROM {table_name}"), 0)
        .unwrap();
    assert!(cursor.next().unwrap());

    assert!(cursor.get_bool(0).unwrap());
    assert_eq!(1, cursor.get_i32(0).unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn statement_without_result_set_has_no_columns(profile: &Profile) {
    let table_name = table_name!();
    let conn = profile
        .setup_empty_table(&table_name, &["a INTEGER"])
        .unwrap();

    let mut cursor = conn
        .execute(&format!("INSERT INTO {table_name} (a) VALUES (1)"), 0)
        .unwrap();

    assert_eq!(0, cursor.column_count());
    assert!(cursor.has_affected_rows());
    assert!(!cursor.next().unwrap());
}

#[test_case(SQLITE_3; "SQLite 3")]
#[test_case(POSTGRES; "PostgreSQL")]
fn raw_values(profile: &Profile) {
    let conn = profile.connection().unwrap();
    let mut cursor = conn.execute("SELECT 5 AS a, NULL AS b", 0).unwrap();
    assert!(cursor.next().unwrap());

    assert!(!cursor.value(0).unwrap().is_null());
    assert_eq!(&Value::Null, cursor.value(1).unwrap());
    assert_eq!(5, cursor.get_or("b", 5).unwrap());
}

#[test]
fn list_drivers() {
    let drivers = ENV.drivers().unwrap();
    // The integration tests require at least the SQLite driver
    assert!(drivers
        .iter()
        .any(|driver| driver.description.contains("SQLite")));
}

#[test]
fn list_data_sources() -> Result<(), anyhow::Error> {
    let data_sources = ENV.data_sources()?;
    // Which data sources are configured depends on the machine, but none may have an empty name.
    assert!(data_sources
        .iter()
        .all(|data_source| !data_source.server_name.is_empty()));
    Ok(())
}

#[test]
fn database_name_of_postgres_connection() -> Result<(), anyhow::Error> {
    let conn = POSTGRES.connection()?;
    assert_eq!("test", conn.database_name()?);
    conn.disconnect()?;
    Ok(())
}
