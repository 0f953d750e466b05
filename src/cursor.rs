use std::mem::size_of;

use log::debug;
use odbc_sys::{CDataType, FetchOrientation, Len, Pointer, NULL_DATA};

use crate::{
    conversion::FromValue,
    error::ExtendResult,
    handles::{self, slice_to_utf8, ColumnDescription, DataType, Nullability, SqlResult, State},
    value::{Date, Time, Timestamp, Value},
    Error, Statement,
};

/// Size of the chunks in which variable sized columns are retrieved.
const CHUNK_SIZE: usize = 4096;

/// Where the statement of a cursor lives. Cursors created by [`crate::Connection::execute`] own
/// their statement, cursors returned by [`Statement::execute`] borrow it.
pub(crate) enum CursorSource<'s, 'env> {
    Owned(Statement<'env>),
    Borrowed(&'s mut Statement<'env>),
}

impl<'env> CursorSource<'_, 'env> {
    fn statement(&self) -> &Statement<'env> {
        match self {
            CursorSource::Owned(statement) => statement,
            CursorSource::Borrowed(statement) => &**statement,
        }
    }
}

/// Where the cursor is relative to the rows of the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Initial position after execution. Call [`ResultCursor::next`] to move to the first row.
    BeforeFirst,
    /// Positioned on the row with this zero based index.
    OnRow(usize),
    /// Moved past the last row.
    AfterLast,
}

/// Metadata of a result set column, as reported by the driver right after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Column name or alias. Empty if the driver does not know one.
    pub name: String,
    /// Data source specific name of the column type, e.g. `"VARCHAR"` or `"int identity"`.
    pub type_name: String,
    pub data_type: DataType,
    pub nullability: Nullability,
}

impl ColumnMetadata {
    /// Numeric `SQL_*` type code of the column.
    pub fn sql_type(&self) -> i16 {
        self.data_type.data_type().0
    }

    /// Column size, e.g. the maximum length in characters for text or the precision for numbers.
    pub fn size(&self) -> usize {
        self.data_type.column_size()
    }

    /// Scale of numeric columns, or fractional seconds precision of time and timestamp columns.
    pub fn decimal_digits(&self) -> i16 {
        self.data_type.decimal_digits()
    }
}

/// Something which identifies a column of a result set. Either its zero based ordinal (`usize`) or
/// its name (`&str`). Names are compared exactly, the first matching column wins.
pub trait ColumnIndex {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Result<usize, Error>;
}

impl ColumnIndex for usize {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Result<usize, Error> {
        if *self < columns.len() {
            Ok(*self)
        } else {
            Err(Error::IndexOutOfRange {
                what: format!("Column {self}"),
                detail: format!("The result set has {} columns.", columns.len()),
            })
        }
    }
}

impl ColumnIndex for str {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Result<usize, Error> {
        columns
            .iter()
            .position(|column| column.name == self)
            .ok_or_else(|| Error::IndexOutOfRange {
                what: format!("Column '{self}'"),
                detail: "No column in the result set has this name.".to_owned(),
            })
    }
}

impl ColumnIndex for String {
    fn resolve(&self, columns: &[ColumnMetadata]) -> Result<usize, Error> {
        self.as_str().resolve(columns)
    }
}

impl<T> ColumnIndex for &T
where
    T: ColumnIndex + ?Sized,
{
    fn resolve(&self, columns: &[ColumnMetadata]) -> Result<usize, Error> {
        (**self).resolve(columns)
    }
}

/// Result set of an executed statement.
///
/// Starts positioned before the first row. Every move which lands on a row reads all of its
/// columns, so the getters never talk to the driver and can be called in any order and repeatedly.
/// Statements which do not produce a result set yield a cursor with zero columns, which is useful
/// for [`Self::affected_rows`].
///
/// Any movement other than [`Self::next`] requires a scrollable cursor, see
/// [`Statement::set_scrollable`].
pub struct ResultCursor<'s, 'env> {
    source: CursorSource<'s, 'env>,
    columns: Vec<ColumnMetadata>,
    current: RowState,
    /// As reported by `SQLRowCount` right after execution.
    affected_rows: Option<usize>,
}

/// Where a cursor is, together with the values of the row it is on.
#[derive(Debug)]
struct RowState {
    position: Position,
    row: Vec<Value>,
    /// Number of rows in the result set, once it is known.
    row_count: Option<usize>,
    /// Highest zero based row index visited plus one.
    rows_seen: usize,
}

impl RowState {
    fn new() -> Self {
        Self {
            position: Position::BeforeFirst,
            row: Vec::new(),
            row_count: None,
            rows_seen: 0,
        }
    }

    /// Moves onto the row `index` with the values returned by `read`. If `read` fails, the state
    /// stays as it has been.
    fn land_on(
        &mut self,
        index: usize,
        read: impl FnOnce() -> Result<Vec<Value>, Error>,
    ) -> Result<bool, Error> {
        self.row = read()?;
        self.position = Position::OnRow(index);
        self.rows_seen = self.rows_seen.max(index + 1);
        Ok(true)
    }

    fn fall_off(&mut self, position: Position) -> bool {
        self.position = position;
        self.row.clear();
        false
    }

    fn position(&self) -> i64 {
        match self.position {
            Position::BeforeFirst => -1,
            Position::OnRow(index) => index as i64,
            Position::AfterLast => self.row_count.unwrap_or(self.rows_seen) as i64,
        }
    }
}

impl Drop for ResultCursor<'_, '_> {
    fn drop(&mut self) {
        // Owned statements are freed as a whole. A borrowed one must be ready for reexecution.
        if let CursorSource::Borrowed(statement) = &mut self.source {
            if let Err(error) = statement.close_cursor() {
                debug!("Closing cursor failed: {error}");
            }
        }
    }
}

impl<'s, 'env> ResultCursor<'s, 'env> {
    pub(crate) fn new(source: CursorSource<'s, 'env>) -> Result<Self, Error> {
        let (columns, affected_rows) = source.statement().with_handle(|handle| {
            let affected_rows = handle.row_count().into_result(handle)?;
            let num_cols = handle.num_result_cols().into_result(handle)?;
            let mut description = ColumnDescription::default();
            let mut type_name = Vec::new();
            let mut columns = Vec::with_capacity(num_cols.max(0) as usize);
            for column_number in 1..=num_cols.max(0) as u16 {
                handle
                    .describe_col(column_number, &mut description)
                    .into_result(handle)?;
                handle
                    .col_type_name(column_number, &mut type_name)
                    .into_result(handle)?;
                columns.push(ColumnMetadata {
                    name: description.name_to_string(),
                    type_name: slice_to_utf8(&type_name),
                    data_type: description.data_type,
                    nullability: description.nullability,
                });
            }
            // -1 signals the driver does not know.
            Ok((columns, usize::try_from(affected_rows).ok()))
        })?;
        Ok(Self {
            source,
            columns,
            current: RowState::new(),
            affected_rows,
        })
    }

    /// Advances to the next row. `false` if there is none, in which case the cursor is positioned
    /// after the last row. Works for any cursor type.
    pub fn next(&mut self) -> Result<bool, Error> {
        let index = match self.current.position {
            Position::BeforeFirst => 0,
            Position::OnRow(index) => index + 1,
            Position::AfterLast => return Ok(false),
        };
        if self.columns.is_empty() {
            self.current.row_count = Some(0);
            return Ok(self.fall_off(Position::AfterLast));
        }
        if self.with_handle(|handle| handle.fetch().into_result(handle))? {
            self.land_on(index)
        } else {
            self.current.row_count = Some(index);
            Ok(self.fall_off(Position::AfterLast))
        }
    }

    /// Moves to the previous row. `false` if there is none, in which case the cursor is positioned
    /// before the first row.
    pub fn prior(&mut self) -> Result<bool, Error> {
        if self.scroll(FetchOrientation::Prior, 0)? {
            let guess = match self.current.position {
                Position::OnRow(index) => index.checked_sub(1),
                Position::AfterLast => self.current.row_count.and_then(|n| n.checked_sub(1)),
                Position::BeforeFirst => None,
            };
            let index = self.driver_row_index().or(guess).unwrap_or(0);
            self.land_on(index)
        } else {
            Ok(self.fall_off(Position::BeforeFirst))
        }
    }

    /// Moves to the first row. `false` if the result set is empty.
    pub fn first(&mut self) -> Result<bool, Error> {
        if self.scroll(FetchOrientation::First, 0)? {
            self.land_on(0)
        } else {
            self.current.row_count = Some(0);
            Ok(self.fall_off(Position::AfterLast))
        }
    }

    /// Moves to the last row. `false` if the result set is empty.
    pub fn last(&mut self) -> Result<bool, Error> {
        if !self.scroll(FetchOrientation::Last, 0)? {
            self.current.row_count = Some(0);
            return Ok(self.fall_off(Position::AfterLast));
        }
        let index = match self.driver_row_index() {
            Some(index) => index,
            None => {
                let row_count = match self.known_row_count() {
                    Some(row_count) => row_count,
                    None => self.count_rows_by_walking()?,
                };
                row_count.saturating_sub(1)
            }
        };
        self.current.row_count = Some(index + 1);
        self.land_on(index)
    }

    /// Moves to the row with the zero based index `row`. `false` if there is no such row, in which
    /// case the cursor is positioned after the last row.
    pub fn move_to(&mut self, row: usize) -> Result<bool, Error> {
        let absolute = isize::try_from(row)
            .ok()
            .and_then(|row| row.checked_add(1))
            .ok_or_else(|| Error::IndexOutOfRange {
                what: format!("Row {row}"),
                detail: "Row index exceeds the range of the driver's fetch offset.".to_owned(),
            })?;
        if self.scroll(FetchOrientation::Absolute, absolute)? {
            self.land_on(row)
        } else {
            self.fall_off_end()
        }
    }

    /// Moves `rows` rows relative to the current position. Negative values move backwards.
    /// `false` if the cursor left the result set, in which case it is positioned before the first
    /// or after the last row, depending on the direction.
    pub fn skip(&mut self, rows: isize) -> Result<bool, Error> {
        if self.scroll(FetchOrientation::Relative, rows)? {
            let guess = match self.current.position {
                Position::BeforeFirst => rows.checked_sub(1),
                Position::OnRow(index) => isize::try_from(index)
                    .ok()
                    .and_then(|index| index.checked_add(rows)),
                Position::AfterLast => self
                    .current.row_count
                    .and_then(|n| isize::try_from(n).ok())
                    .and_then(|n| n.checked_add(rows)),
            }
            .and_then(|index| usize::try_from(index).ok());
            let index = self.driver_row_index().or(guess).unwrap_or(0);
            self.land_on(index)
        } else if rows < 0 {
            Ok(self.fall_off(Position::BeforeFirst))
        } else {
            self.fall_off_end()
        }
    }

    /// Current position. See [`Self::position`] for a numeric representation.
    pub fn state(&self) -> Position {
        self.current.position
    }

    /// `-1` before the first row, the zero based index of the current row, or the number of rows
    /// once the cursor moved past the last row.
    pub fn position(&self) -> i64 {
        self.current.position()
    }

    /// `true` once the cursor has moved past the last row.
    pub fn at_end(&self) -> bool {
        self.current.position == Position::AfterLast
    }

    /// Number of rows in the result set. `None` if neither the driver reported it, nor has the
    /// cursor been moved past the last row yet.
    pub fn row_count(&self) -> Option<usize> {
        self.current.row_count.or_else(|| self.known_row_count())
    }

    /// Number of rows inserted, updated or deleted by the statement. `None` if the driver does not
    /// know, which is often the case for `SELECT` statements.
    pub fn affected_rows(&self) -> Option<usize> {
        self.affected_rows
    }

    /// `true` if the statement reported at least one affected row.
    pub fn has_affected_rows(&self) -> bool {
        self.affected_rows.is_some_and(|n| n > 0)
    }

    /// Number of columns in the result set. `0` for statements which do not produce one.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Zero based ordinal of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Result<usize, Error> {
        name.resolve(&self.columns)
    }

    pub fn column_name(&self, column: impl ColumnIndex) -> Result<&str, Error> {
        Ok(&self.column(column)?.name)
    }

    pub fn column_type_name(&self, column: impl ColumnIndex) -> Result<&str, Error> {
        Ok(&self.column(column)?.type_name)
    }

    pub fn column_sql_type(&self, column: impl ColumnIndex) -> Result<i16, Error> {
        Ok(self.column(column)?.sql_type())
    }

    pub fn column_data_type(&self, column: impl ColumnIndex) -> Result<DataType, Error> {
        Ok(self.column(column)?.data_type)
    }

    pub fn column_size(&self, column: impl ColumnIndex) -> Result<usize, Error> {
        Ok(self.column(column)?.size())
    }

    pub fn column_decimal_digits(&self, column: impl ColumnIndex) -> Result<i16, Error> {
        Ok(self.column(column)?.decimal_digits())
    }

    pub fn column_nullability(&self, column: impl ColumnIndex) -> Result<Nullability, Error> {
        Ok(self.column(column)?.nullability)
    }

    /// Raw value of a column in the current row. [`Value::Null`] for `NULL`.
    pub fn value(&self, column: impl ColumnIndex) -> Result<&Value, Error> {
        let index = column.resolve(&self.columns)?;
        if !matches!(self.current.position, Position::OnRow(_)) {
            return Err(Error::Programming(
                "The cursor is not positioned on a row. Call `next` before accessing values."
                    .to_owned(),
            ));
        }
        self.current.row.get(index).ok_or_else(|| {
            Error::General("The current row could not be retrieved from the driver.".to_owned())
        })
    }

    pub fn is_null(&self, column: impl ColumnIndex) -> Result<bool, Error> {
        Ok(self.value(column)?.is_null())
    }

    /// Value of `column` in the current row, coerced to `T`. Fails with [`Error::NullAccess`] if
    /// the value is `NULL`.
    pub fn get<T: FromValue>(&self, column: impl ColumnIndex) -> Result<T, Error> {
        let index = column.resolve(&self.columns)?;
        match self.value(index)? {
            Value::Null => Err(Error::NullAccess { column: index }),
            value => T::from_value(value),
        }
    }

    /// Like [`Self::get`], but `NULL` is mapped to `None`.
    pub fn get_nullable<T: FromValue>(&self, column: impl ColumnIndex) -> Result<Option<T>, Error> {
        match self.value(column)? {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }

    /// Like [`Self::get`], but `NULL` is mapped to `fallback`.
    pub fn get_or<T: FromValue>(&self, column: impl ColumnIndex, fallback: T) -> Result<T, Error> {
        Ok(self.get_nullable(column)?.unwrap_or(fallback))
    }

    pub fn get_i16(&self, column: impl ColumnIndex) -> Result<i16, Error> {
        self.get(column)
    }

    pub fn get_u16(&self, column: impl ColumnIndex) -> Result<u16, Error> {
        self.get(column)
    }

    pub fn get_i32(&self, column: impl ColumnIndex) -> Result<i32, Error> {
        self.get(column)
    }

    pub fn get_i64(&self, column: impl ColumnIndex) -> Result<i64, Error> {
        self.get(column)
    }

    pub fn get_f32(&self, column: impl ColumnIndex) -> Result<f32, Error> {
        self.get(column)
    }

    pub fn get_f64(&self, column: impl ColumnIndex) -> Result<f64, Error> {
        self.get(column)
    }

    pub fn get_string(&self, column: impl ColumnIndex) -> Result<String, Error> {
        self.get(column)
    }

    pub fn get_bool(&self, column: impl ColumnIndex) -> Result<bool, Error> {
        self.get(column)
    }

    pub fn get_bytes(&self, column: impl ColumnIndex) -> Result<Vec<u8>, Error> {
        self.get(column)
    }

    pub fn get_date(&self, column: impl ColumnIndex) -> Result<Date, Error> {
        self.get(column)
    }

    pub fn get_time(&self, column: impl ColumnIndex) -> Result<Time, Error> {
        self.get(column)
    }

    pub fn get_timestamp(&self, column: impl ColumnIndex) -> Result<Timestamp, Error> {
        self.get(column)
    }

    fn column(&self, column: impl ColumnIndex) -> Result<&ColumnMetadata, Error> {
        let index = column.resolve(&self.columns)?;
        Ok(&self.columns[index])
    }

    fn with_handle<R>(
        &self,
        f: impl FnOnce(&mut handles::Statement) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.source.statement().with_handle(f)
    }

    fn scroll(&mut self, orientation: FetchOrientation, offset: isize) -> Result<bool, Error> {
        self.with_handle(|handle| handle.fetch_scroll(orientation, offset).into_result(handle))
    }

    /// Reads the row the driver is positioned on. The cursor is only updated if every column could
    /// be read.
    fn land_on(&mut self, index: usize) -> Result<bool, Error> {
        let Self {
            source,
            columns,
            current,
            ..
        } = self;
        current.land_on(index, || {
            source
                .statement()
                .with_handle(|handle| read_row(handle, columns))
        })
    }

    /// Positions the cursor after the last row, once the driver moved past the end of the result
    /// set. Learns the row count first, so [`Self::position`] reports it.
    fn fall_off_end(&mut self) -> Result<bool, Error> {
        if self.current.row_count.is_none() {
            let row_count = match self.known_row_count() {
                Some(row_count) => row_count,
                None => self.count_rows_from_last()?,
            };
            self.current.row_count = Some(row_count);
        }
        Ok(self.fall_off(Position::AfterLast))
    }

    /// Counts the rows by moving to the last one. Leaves the driver after the last row.
    fn count_rows_from_last(&mut self) -> Result<usize, Error> {
        if !self.scroll(FetchOrientation::Last, 0)? {
            return Ok(0);
        }
        let row_count = match self.driver_row_index() {
            Some(index) => index + 1,
            None => self.count_rows_by_walking()?,
        };
        self.scroll(FetchOrientation::Next, 0)?;
        Ok(row_count)
    }

    fn fall_off(&mut self, position: Position) -> bool {
        self.current.fall_off(position)
    }

    /// Zero based index of the current row according to the driver, if it supports reporting it.
    fn driver_row_index(&self) -> Option<usize> {
        self.with_handle(|handle| match handle.row_number() {
            SqlResult::Success(n) | SqlResult::SuccessWithInfo(n) => Ok(n.checked_sub(1)),
            _ => Ok(None),
        })
        .ok()
        .flatten()
    }

    /// Row count reported by the driver for the result set. Only trusted if positive, since many
    /// drivers report `0` or `-1` for queries.
    fn known_row_count(&self) -> Option<usize> {
        if self.columns.is_empty() {
            None
        } else {
            self.affected_rows.filter(|&n| n > 0)
        }
    }

    /// Counts the rows from the start. Leaves the cursor on the last row.
    fn count_rows_by_walking(&mut self) -> Result<usize, Error> {
        let mut row_count = 0;
        if self.scroll(FetchOrientation::First, 0)? {
            row_count = 1;
            while self.scroll(FetchOrientation::Next, 0)? {
                row_count += 1;
            }
        }
        self.scroll(FetchOrientation::Last, 0)?;
        Ok(row_count)
    }
}

/// Reads every column of the row the statement is positioned on.
fn read_row(
    handle: &mut handles::Statement,
    columns: &[ColumnMetadata],
) -> Result<Vec<Value>, Error> {
    let mut row = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        // Ordinals of result set columns fit into an `i16`.
        let column_number = (index + 1) as u16;
        let value = read_column(handle, column_number, &column.data_type)
            .provide_context_for_diagnostic(|record, function| {
                if record.state == State::RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION
                    || record.state == State::NUMERIC_VALUE_OUT_OF_RANGE
                {
                    Error::invalid_type(
                        format!("column {index} of type '{}'", column.type_name),
                        "the driver's native representation",
                    )
                } else if record.state == State::INDICATOR_VARIABLE_REQUIRED_BUT_NOT_SUPPLIED {
                    Error::NullAccess { column: index }
                } else {
                    Error::Diagnostics { record, function }
                }
            })?;
        row.push(value);
    }
    Ok(row)
}

/// Retrieves a single column in the C type best matching its SQL type. Numeric and decimal values
/// are retrieved as text to avoid losing precision.
fn read_column(
    handle: &mut handles::Statement,
    column_number: u16,
    data_type: &DataType,
) -> Result<Value, Error> {
    let value = match data_type {
        DataType::SmallInt | DataType::TinyInt => {
            read_fixed::<i16>(handle, column_number, CDataType::SShort)?.map(Value::I16)
        }
        DataType::Integer => {
            read_fixed::<i32>(handle, column_number, CDataType::SLong)?.map(Value::I32)
        }
        DataType::BigInt => {
            read_fixed::<i64>(handle, column_number, CDataType::SBigInt)?.map(Value::I64)
        }
        DataType::Real => {
            read_fixed::<f32>(handle, column_number, CDataType::Float)?.map(Value::F32)
        }
        DataType::Float { .. } | DataType::Double => {
            read_fixed::<f64>(handle, column_number, CDataType::Double)?.map(Value::F64)
        }
        DataType::Bit => read_fixed::<u8>(handle, column_number, CDataType::Bit)?
            .map(|bit| Value::Bool(bit != 0)),
        DataType::Date => read_fixed::<odbc_sys::Date>(handle, column_number, CDataType::TypeDate)?
            .map(|date| Value::Date(date.into())),
        DataType::Time { .. } => {
            read_fixed::<odbc_sys::Time>(handle, column_number, CDataType::TypeTime)?
                .map(|time| Value::Time(time.into()))
        }
        DataType::Timestamp { .. } => {
            read_fixed::<odbc_sys::Timestamp>(handle, column_number, CDataType::TypeTimestamp)?
                .map(|timestamp| Value::Timestamp(timestamp.into()))
        }
        binary if binary.is_binary() => {
            read_variadic(handle, column_number, CDataType::Binary, 0)?.map(Value::Bytes)
        }
        _ => match read_variadic(handle, column_number, CDataType::WChar, 2)? {
            Some(bytes) => Some(Value::Text(utf16_to_string(&bytes).ok_or_else(|| {
                Error::invalid_type(
                    format!("text in column {} which is not valid UTF-16", column_number - 1),
                    "String",
                )
            })?)),
            None => None,
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Decodes the bytes of a `SQL_C_WCHAR` buffer. `None` if they do not form valid UTF-16.
fn utf16_to_string(bytes: &[u8]) -> Option<String> {
    let utf16: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&utf16).ok()
}

/// `None` for `NULL`.
fn read_fixed<T: Default>(
    handle: &mut handles::Statement,
    column_number: u16,
    target_type: CDataType,
) -> Result<Option<T>, Error> {
    let mut value = T::default();
    let mut indicator: Len = 0;
    // Safety: `value` is a valid buffer of the size of `T`, which matches `target_type`.
    let has_data = unsafe {
        handle.get_data(
            column_number,
            target_type,
            &mut value as *mut T as Pointer,
            size_of::<T>() as Len,
            &mut indicator,
        )
    }
    .into_result(handle)?;
    if !has_data {
        return Err(Error::General(format!(
            "Driver reported no data for column {column_number}, which has not been read yet."
        )));
    }
    Ok((indicator != NULL_DATA).then_some(value))
}

/// Retrieves a variable sized column in chunks. `None` for `NULL`. `terminator` is the size of the
/// terminating zero the driver appends in bytes.
fn read_variadic(
    handle: &mut handles::Statement,
    column_number: u16,
    target_type: CDataType,
    terminator: usize,
) -> Result<Option<Vec<u8>>, Error> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let capacity = CHUNK_SIZE - terminator;
    let mut bytes = Vec::new();
    loop {
        let mut indicator: Len = 0;
        // Safety: `chunk` is a valid buffer of `CHUNK_SIZE` bytes.
        let result = unsafe {
            handle.get_data(
                column_number,
                target_type,
                chunk.as_mut_ptr() as Pointer,
                CHUNK_SIZE as Len,
                &mut indicator,
            )
        };
        let has_data = match result {
            // String data right truncation is expected for all chunks but the last one.
            SqlResult::SuccessWithInfo(has_data) => has_data,
            other => other.into_result(handle)?,
        };
        if !has_data {
            break;
        }
        if indicator == NULL_DATA {
            return Ok(None);
        }
        match usize::try_from(indicator) {
            Ok(len) if len <= capacity => {
                bytes.extend_from_slice(&chunk[..len]);
                break;
            }
            // Either `NO_TOTAL` or more data than fits the chunk. In both cases it is full.
            _ => bytes.extend_from_slice(&chunk[..capacity]),
        }
    }
    Ok(Some(bytes))
}
