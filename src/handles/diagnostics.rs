use super::{
    as_handle::AsHandle,
    buffer::{clamp_small_int, mut_buf_ptr},
    slice_to_utf8, SqlChar,
};
use log::{debug, warn, Level};
use odbc_sys::{SQLGetDiagRecW, SqlReturn, SQLSTATE_SIZE};
use std::fmt;

/// Characters reserved for a diagnostic message up front. Longer messages are fetched a second
/// time into a buffer of the reported size.
const MESSAGE_CAPACITY: usize = 512;

/// Five character SQLSTATE of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(pub [u8; SQLSTATE_SIZE]);

impl State {
    /// Can be returned from SQLDisconnect
    pub const INVALID_STATE_TRANSACTION: State = State(*b"25000");
    /// Given the specified Attribute value, an invalid value was specified in ValuePtr.
    pub const INVALID_ATTRIBUTE_VALUE: State = State(*b"HY024");
    /// An invalid data type has been bound to a statement.
    pub const INVALID_SQL_DATA_TYPE: State = State(*b"HY004");
    /// String or binary data returned for a column resulted in the truncation of nonblank character
    /// or non-NULL binary data. If it was a string value, it was right-truncated.
    pub const STRING_DATA_RIGHT_TRUNCATION: State = State(*b"01004");
    /// StrLen_or_IndPtr was a null pointer and NULL data was retrieved.
    pub const INDICATOR_VARIABLE_REQUIRED_BUT_NOT_SUPPLIED: State = State(*b"22002");
    /// The data value of a column could not be converted to the requested C data type.
    pub const RESTRICTED_DATA_TYPE_ATTRIBUTE_VIOLATION: State = State(*b"07006");
    /// Returning the value would have caused a numeric value to be truncated or overflow.
    pub const NUMERIC_VALUE_OUT_OF_RANGE: State = State(*b"22003");
    /// A parameter or column number exceeded the number of markers or columns.
    pub const INVALID_DESCRIPTOR_INDEX: State = State(*b"07009");
    /// The cursor type does not support the requested fetch orientation.
    pub const FETCH_TYPE_OUT_OF_RANGE: State = State(*b"HY106");

    /// State from the wide characters written by `SQLGetDiagRecW`. Anything after the fifth
    /// character, i.e. the terminating zero, is ignored. Non ASCII characters become `?`.
    pub fn from_wide(code: &[SqlChar]) -> Self {
        let mut state = [b'?'; SQLSTATE_SIZE];
        for (ascii, &wide) in state.iter_mut().zip(code) {
            *ascii = u8::try_from(wide)
                .ok()
                .filter(u8::is_ascii)
                .unwrap_or(b'?');
        }
        State(state)
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }
}

/// A single diagnostic record, as reported by the driver manager or the driver.
///
/// Use `std::fmt::Display` to retrieve status code and other information.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Record {
    /// SQLSTATE of the record.
    pub state: State,
    /// Error code returned by Driver manager or driver
    pub native_error: i32,
    /// Message text without terminating zero.
    pub message: Vec<SqlChar>,
}

impl Record {
    pub fn new(state: State, native_error: i32, message: &str) -> Self {
        Self {
            state,
            native_error,
            message: message.encode_utf16().collect(),
        }
    }

    /// Diagnostic message decoded as UTF-8.
    pub fn message_to_string(&self) -> String {
        slice_to_utf8(&self.message)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {}, Native error: {}, Message: {}",
            self.state.as_str(),
            self.native_error,
            self.message_to_string(),
        )
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Diagnostic records left behind by the last ODBC call made with a handle.
pub trait Diagnostics {
    /// Record number `rec_number`, counting from `1`. `None` if there is no such record or if it
    /// could not be retrieved.
    fn diagnostic_record(&self, rec_number: i16) -> Option<Record>;

    /// Every record in order, starting with the first one.
    fn diagnostic_records(&self) -> DiagnosticRecords<'_, Self> {
        DiagnosticRecords {
            handle: self,
            next: Some(1),
        }
    }
}

/// Iterator returned by [`Diagnostics::diagnostic_records`]. Ends at the first missing record, or
/// once record numbers would exceed `i16::MAX`.
pub struct DiagnosticRecords<'h, D: ?Sized> {
    handle: &'h D,
    next: Option<i16>,
}

impl<D: Diagnostics + ?Sized> Iterator for DiagnosticRecords<'_, D> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let rec_number = self.next?;
        let record = self.handle.diagnostic_record(rec_number);
        self.next = if record.is_some() {
            rec_number.checked_add(1)
        } else {
            None
        };
        record
    }
}

impl<T: AsHandle + ?Sized> Diagnostics for T {
    fn diagnostic_record(&self, rec_number: i16) -> Option<Record> {
        if rec_number < 1 {
            return None;
        }
        let mut message: Vec<SqlChar> = vec![0; MESSAGE_CAPACITY];
        loop {
            let mut state = [0; SQLSTATE_SIZE + 1];
            let mut native_error = 0;
            let mut text_length = 0;
            // Safety: All buffers are valid for writes of the sizes passed.
            let ret = unsafe {
                SQLGetDiagRecW(
                    self.handle_type(),
                    self.as_handle(),
                    rec_number,
                    state.as_mut_ptr(),
                    &mut native_error,
                    mut_buf_ptr(&mut message),
                    clamp_small_int(message.len()),
                    &mut text_length,
                )
            };
            match ret {
                SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO => (),
                SqlReturn::NO_DATA => return None,
                other => {
                    debug!("SQLGetDiagRecW returned {other:?} for record {rec_number}.");
                    return None;
                }
            }
            let text_length = text_length.max(0) as usize;
            // The message has been truncated, unless there has been room for the terminating zero.
            let limit = i16::MAX as usize;
            if text_length >= message.len() && message.len() < limit {
                message.resize((text_length + 1).min(limit), 0);
                continue;
            }
            message.truncate(text_length);
            // Some drivers pad the message with zeroes.
            while message.last() == Some(&0) {
                message.pop();
            }
            return Some(Record {
                state: State::from_wide(&state),
                native_error,
                message,
            });
        }
    }
}

/// Logs every diagnostic record of `handle` as a warning.
pub fn log_diagnostics(handle: &(impl Diagnostics + ?Sized)) {
    if log::max_level() < Level::Warn {
        return;
    }
    for record in handle.diagnostic_records() {
        warn!("{record}");
    }
}
