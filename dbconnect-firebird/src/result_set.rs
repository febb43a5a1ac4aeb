//! The server-side cursor `ResultSet`: every row is fetched one at a time with
//! `isc_dsql_fetch` against the statement handle transferred in from
//! [`crate::statement::FbPreparedStatement::execute_query`].
//!
//! Split into two types for the reentrancy this needs: [`FbResultSetShared`] is the
//! part the `Connection` keeps a weak reference to and can drive closed from inside its
//! own transaction-end path, wrapped in a mutex shared with nobody else; [`FbResultSet`]
//! is the thin `Box<dyn ResultSet>` handle a caller holds, which is just an `Arc` around
//! the shared part.

use std::ffi::c_char;
use std::os::raw::c_short;
use std::sync::{Arc, Mutex, Weak};

use dbconnect_core::blob::Blob;
use dbconnect_core::common::STATEMENT_FREE_SETTLE_DELAY;
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::io::input_stream::InputStream;
use dbconnect_core::result_set::{find_column_by_name, ResultSet};

use crate::blob::FbBlob;
use crate::connection::FbConnection;
use crate::dates;
use crate::sys::{self, isc_stmt_handle, ISC_QUAD, ISC_STATUS_ARRAY, XSQLVAR};
use crate::xsqlda::{buffer_size_for, XsqlDa};

fn base_sql_type(full: c_short) -> c_short {
    full & !1
}

/// What the statement's `isc_dsql_describe` reported for one output column — captured
/// at prepare time so the result set can build its own fetch buffers independently of
/// the `XsqlDa` the statement used only to discover them.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sqltype: c_short,
    pub sqlscale: c_short,
    pub sqlsubtype: c_short,
    pub sqllen: c_short,
}

/// Mutable fetch state, guarded by one mutex so a row's buffers, its null indicators,
/// and the statement handle they were fetched through never drift out of sync.
struct Fetch {
    handle: isc_stmt_handle,
    da: XsqlDa,
    buffers: Vec<Vec<u8>>,
    indicators: Vec<c_short>,
    row: u64,
    after_last: bool,
    closed: bool,
    last_was_null: bool,
}

/// The registered, closable half of a cursor result set.
///
/// Holds the vendor statement handle transferred in from [`crate::statement::FbPreparedStatement`]
/// and owns it from here on: released either by an explicit [`FbResultSet::close`] or by
/// the connection's transaction-end path via [`FbResultSetShared::close_internal`],
/// whichever comes first (both paths are idempotent).
pub struct FbResultSetShared {
    connection: Weak<FbConnection>,
    dialect: u16,
    columns: Vec<ColumnDescriptor>,
    fetch: Mutex<Fetch>,
}

impl FbResultSetShared {
    pub(crate) fn new(
        connection: Arc<FbConnection>,
        handle: isc_stmt_handle,
        dialect: u16,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<Arc<Self>> {
        let (da, buffers, indicators) = build_output_da(&columns);
        let shared = Arc::new(FbResultSetShared {
            connection: Arc::downgrade(&connection),
            dialect,
            columns,
            fetch: Mutex::new(Fetch {
                handle,
                da,
                buffers,
                indicators,
                row: 0,
                after_last: false,
                closed: false,
                last_was_null: false,
            }),
        });
        connection.register_result_set(&shared);
        Ok(shared)
    }

    /// Frees the vendor statement handle if still held. Called either from
    /// [`FbResultSet::close`] or from the owning connection's transaction-end sweep;
    /// either caller may win the race, the other observes `closed` already set and
    /// returns immediately.
    pub(crate) fn close_internal(&self) {
        let (conn, mut stmt) = {
            let mut fetch = self.fetch.lock().expect("result set mutex poisoned");
            if fetch.closed {
                return;
            }
            fetch.closed = true;
            if fetch.handle == 0 {
                return;
            }
            let Some(conn) = self.connection.upgrade() else {
                fetch.handle = 0;
                return;
            };
            let stmt = fetch.handle;
            fetch.handle = 0;
            (conn, stmt)
        };

        let result = conn.with_handles(|_db, _tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_dsql_free_statement(status.as_mut_ptr(), &mut stmt, sys::DSQL_drop) };
            crate::status::check(&status, ErrorKind::ExecFailed)
        });
        if let Err(err) = result {
            tracing::warn!(target: "dbconnect::firebird::result_set", error = %err, "failed to free cursor statement during close");
        }
        std::thread::sleep(STATEMENT_FREE_SETTLE_DELAY);
    }

    fn is_closed(&self) -> bool {
        self.fetch.lock().expect("result set mutex poisoned").closed
    }

    fn next(&self) -> Result<bool> {
        let conn = self.connection.upgrade().ok_or_else(Error::conn_closed)?;
        let mut fetch = self.fetch.lock().expect("result set mutex poisoned");
        if fetch.closed {
            return Err(Error::new(ErrorKind::ExecFailed, "result set is closed"));
        }
        let mut stmt = fetch.handle;
        let dialect = self.dialect;
        let da_ptr = fetch.da.as_ptr();
        let rc = conn.with_handles(|_db, _tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            let rc = unsafe { sys::isc_dsql_fetch(status.as_mut_ptr(), &mut stmt, dialect, da_ptr) };
            if rc != 0 && rc != sys::SQL_NO_DATA {
                crate::status::check(&status, ErrorKind::ExecFailed)?;
            }
            Ok(rc)
        })?;
        fetch.handle = stmt;
        if rc == sys::SQL_NO_DATA {
            fetch.after_last = true;
            Ok(false)
        } else {
            fetch.row += 1;
            Ok(true)
        }
    }

    fn row(&self) -> u64 {
        self.fetch.lock().expect("result set mutex poisoned").row
    }

    fn column_count(&self) -> i32 {
        self.columns.len() as i32
    }

    fn column_name(&self, index: i32) -> Result<String> {
        self.column(index).map(|col| col.name.clone())
    }

    fn find_column(&self, name: &str) -> Result<i32> {
        let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        find_column_by_name(&names, name).ok_or_else(|| Error::column_not_found(name))
    }

    fn column(&self, index: i32) -> Result<&ColumnDescriptor> {
        let count = self.columns.len();
        if index < 1 || index as usize > count {
            return Err(Error::column_index(index, count));
        }
        Ok(&self.columns[(index - 1) as usize])
    }

    fn was_null(&self) -> bool {
        self.fetch.lock().expect("result set mutex poisoned").last_was_null
    }

    fn is_before_first(&self) -> bool {
        let fetch = self.fetch.lock().expect("result set mutex poisoned");
        fetch.row == 0 && !fetch.after_last
    }

    fn is_after_last(&self) -> bool {
        self.fetch.lock().expect("result set mutex poisoned").after_last
    }

    /// Runs `f` with the described column's raw bytes and null flag, positioned on the
    /// currently fetched row. Records the null flag for a subsequent [`Self::was_null`].
    fn with_column<R>(&self, index: i32, f: impl FnOnce(&ColumnDescriptor, &[u8], bool) -> Result<R>) -> Result<R> {
        let col = self.column(index)?.clone();
        let mut fetch = self.fetch.lock().expect("result set mutex poisoned");
        if fetch.row == 0 || fetch.after_last {
            return Err(Error::new(ErrorKind::ExecFailed, "result set is not positioned on a row"));
        }
        let idx = (index - 1) as usize;
        let is_null = fetch.indicators[idx] == -1;
        fetch.last_was_null = is_null;
        let bytes = fetch.buffers[idx].clone();
        drop(fetch);
        f(&col, &bytes, is_null)
    }

    fn get_string(&self, index: i32) -> Result<String> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(String::new());
            }
            let base = base_sql_type(col.sqltype);
            match base {
                sys::SQL_TEXT | sys::SQL_VARYING => Ok(String::from_utf8_lossy(&decode_text(base, bytes)).into_owned()),
                sys::SQL_SHORT | sys::SQL_LONG | sys::SQL_INT64 | sys::SQL_FLOAT | sys::SQL_DOUBLE | sys::SQL_D_FLOAT => {
                    Ok(format_numeric(base, col.sqlscale, bytes))
                }
                sys::SQL_BOOLEAN => Ok(if bytes[0] != 0 { "true" } else { "false" }.to_string()),
                sys::SQL_TYPE_DATE => Ok(dates::format_date(i32::from_le_bytes(bytes[..4].try_into().unwrap()))),
                sys::SQL_TYPE_TIME => Ok(dates::format_time(u32::from_le_bytes(bytes[..4].try_into().unwrap()))),
                sys::SQL_TIMESTAMP => {
                    let date = i32::from_le_bytes(bytes[..4].try_into().unwrap());
                    let time = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
                    Ok(dates::format_timestamp(date, time))
                }
                sys::SQL_BLOB => {
                    let blob_id = decode_blob_id(bytes);
                    let conn = self.connection.upgrade().ok_or_else(Error::conn_closed)?;
                    let payload = conn.read_blob(blob_id)?;
                    Ok(String::from_utf8_lossy(&payload).into_owned())
                }
                other => Err(Error::new(ErrorKind::Convert, format!("cannot read SQL type {other} as a string"))),
            }
        })
    }

    fn get_long(&self, index: i32) -> Result<i64> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(0);
            }
            let base = base_sql_type(col.sqltype);
            if base == sys::SQL_TEXT || base == sys::SQL_VARYING {
                let text = String::from_utf8_lossy(&decode_text(base, bytes)).into_owned();
                return text
                    .trim()
                    .parse()
                    .map_err(|_| Error::new(ErrorKind::Convert, format!("not a long: {text:?}")));
            }
            Ok(decode_numeric(base, col.sqlscale, bytes)?.round() as i64)
        })
    }

    fn get_int(&self, index: i32) -> Result<i32> {
        self.get_long(index).map(|v| v as i32)
    }

    fn get_double(&self, index: i32) -> Result<f64> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(0.0);
            }
            let base = base_sql_type(col.sqltype);
            if base == sys::SQL_TEXT || base == sys::SQL_VARYING {
                let text = String::from_utf8_lossy(&decode_text(base, bytes)).into_owned();
                return text
                    .trim()
                    .parse()
                    .map_err(|_| Error::new(ErrorKind::Convert, format!("not a double: {text:?}")));
            }
            decode_numeric(base, col.sqlscale, bytes)
        })
    }

    fn get_boolean(&self, index: i32) -> Result<bool> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(false);
            }
            let base = base_sql_type(col.sqltype);
            match base {
                sys::SQL_BOOLEAN => Ok(bytes[0] != 0),
                sys::SQL_TEXT | sys::SQL_VARYING => {
                    let text = String::from_utf8_lossy(&decode_text(base, bytes)).into_owned();
                    match text.trim() {
                        "t" | "true" | "TRUE" | "True" | "1" => Ok(true),
                        "f" | "false" | "FALSE" | "False" | "0" => Ok(false),
                        other => Err(Error::new(ErrorKind::Convert, format!("not a boolean: {other:?}"))),
                    }
                }
                _ => Ok(decode_numeric(base, 0, bytes)? != 0.0),
            }
        })
    }

    fn get_date(&self, index: i32) -> Result<i32> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(0);
            }
            let base = base_sql_type(col.sqltype);
            match base {
                sys::SQL_TYPE_DATE | sys::SQL_TIMESTAMP => {
                    let firebird_date = i32::from_le_bytes(bytes[..4].try_into().unwrap());
                    Ok(dates::firebird_to_unix_days(firebird_date))
                }
                _ => Err(Error::new(ErrorKind::Convert, format!("SQL type {base} has no date component"))),
            }
        })
    }

    fn get_timestamp(&self, index: i32) -> Result<i64> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(0);
            }
            let base = base_sql_type(col.sqltype);
            match base {
                sys::SQL_TIMESTAMP => {
                    let date = i32::from_le_bytes(bytes[..4].try_into().unwrap());
                    let time = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
                    Ok(dates::firebird_timestamp_to_unix_micros(date, time))
                }
                sys::SQL_TYPE_DATE => {
                    let date = i32::from_le_bytes(bytes[..4].try_into().unwrap());
                    Ok(dates::firebird_timestamp_to_unix_micros(date, 0))
                }
                _ => Err(Error::new(ErrorKind::Convert, format!("SQL type {base} has no timestamp representation"))),
            }
        })
    }

    fn get_time(&self, index: i32) -> Result<i64> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(0);
            }
            let base = base_sql_type(col.sqltype);
            match base {
                sys::SQL_TYPE_TIME => Ok(dates::firebird_time_to_micros(u32::from_le_bytes(bytes[..4].try_into().unwrap()))),
                sys::SQL_TIMESTAMP => Ok(dates::firebird_time_to_micros(u32::from_le_bytes(bytes[4..8].try_into().unwrap()))),
                _ => Err(Error::new(ErrorKind::Convert, format!("SQL type {base} has no time-of-day component"))),
            }
        })
    }

    fn get_blob(&self, index: i32) -> Result<Box<dyn Blob>> {
        let col = self.column(index)?.clone();
        let base = base_sql_type(col.sqltype);
        if base != sys::SQL_BLOB {
            return Err(Error::new(ErrorKind::Convert, format!("SQL type {base} is not a BLOB")));
        }
        self.with_column(index, |_col, bytes, is_null| {
            if is_null {
                return Ok(Box::new(FbBlob::empty()) as Box<dyn Blob>);
            }
            let blob_id = decode_blob_id(bytes);
            Ok(Box::new(FbBlob::from_blob_id(self.connection.clone(), blob_id)) as Box<dyn Blob>)
        })
    }

    fn get_bytes(&self, index: i32) -> Result<Vec<u8>> {
        self.with_column(index, |col, bytes, is_null| {
            if is_null {
                return Ok(Vec::new());
            }
            let base = base_sql_type(col.sqltype);
            if base == sys::SQL_BLOB {
                let blob_id = decode_blob_id(bytes);
                let conn = self.connection.upgrade().ok_or_else(Error::conn_closed)?;
                return conn.read_blob(blob_id);
            }
            Ok(decode_text(base, bytes))
        })
    }
}

/// Allocates the `XsqlDa` + backing buffers a cursor fetches into, described exactly
/// as the server described the statement's output at prepare time.
fn build_output_da(columns: &[ColumnDescriptor]) -> (XsqlDa, Vec<Vec<u8>>, Vec<c_short>) {
    let count = columns.len();
    let mut da = XsqlDa::new(count);
    unsafe {
        (*da.as_ptr()).sqld = count as c_short;
    }
    let mut buffers = Vec::with_capacity(count);
    for (i, col) in columns.iter().enumerate() {
        let var: *mut XSQLVAR = da.var(i);
        let base = base_sql_type(col.sqltype);
        unsafe {
            (*var).sqltype = col.sqltype;
            (*var).sqlscale = col.sqlscale;
            (*var).sqlsubtype = col.sqlsubtype;
            (*var).sqllen = col.sqllen;
        }
        buffers.push(vec![0u8; buffer_size_for(base, col.sqllen)]);
    }
    let mut indicators = vec![0 as c_short; count];
    for i in 0..count {
        let var = da.var(i);
        unsafe {
            (*var).sqldata = buffers[i].as_mut_ptr() as *mut c_char;
            (*var).sqlind = &mut indicators[i] as *mut c_short;
        }
    }
    (da, buffers, indicators)
}

fn decode_text(base: c_short, bytes: &[u8]) -> Vec<u8> {
    match base {
        sys::SQL_VARYING => {
            let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
            bytes[2..2 + len.min(bytes.len().saturating_sub(2))].to_vec()
        }
        sys::SQL_TEXT => {
            let trimmed = bytes.iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
            bytes[..trimmed].to_vec()
        }
        _ => bytes.to_vec(),
    }
}

fn decode_numeric(base: c_short, scale: c_short, bytes: &[u8]) -> Result<f64> {
    let raw = match base {
        sys::SQL_SHORT => i16::from_le_bytes(bytes[..2].try_into().unwrap()) as i64,
        sys::SQL_LONG => i32::from_le_bytes(bytes[..4].try_into().unwrap()) as i64,
        sys::SQL_INT64 => i64::from_le_bytes(bytes[..8].try_into().unwrap()),
        sys::SQL_BOOLEAN => bytes[0] as i64,
        sys::SQL_FLOAT => return Ok(f32::from_le_bytes(bytes[..4].try_into().unwrap()) as f64),
        sys::SQL_DOUBLE | sys::SQL_D_FLOAT => return Ok(f64::from_le_bytes(bytes[..8].try_into().unwrap())),
        other => return Err(Error::new(ErrorKind::Convert, format!("SQL type {other} is not numeric"))),
    };
    Ok(if scale == 0 {
        raw as f64
    } else {
        raw as f64 * 10f64.powi(scale as i32)
    })
}

fn format_numeric(base: c_short, scale: c_short, bytes: &[u8]) -> String {
    match decode_numeric(base, scale, bytes) {
        Ok(value) if scale < 0 => format!("{:.*}", (-scale) as usize, value),
        Ok(value) => {
            if value.fract() == 0.0 {
                format!("{value:.0}")
            } else {
                value.to_string()
            }
        }
        Err(_) => String::new(),
    }
}

pub(crate) fn decode_blob_id(bytes: &[u8]) -> ISC_QUAD {
    ISC_QUAD {
        gds_quad_high: i32::from_le_bytes(bytes[..4].try_into().unwrap()),
        gds_quad_low: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
    }
}

/// The public `Box<dyn ResultSet>` handle: a thin wrapper over the registered,
/// closable [`FbResultSetShared`].
pub struct FbResultSet {
    shared: Arc<FbResultSetShared>,
}

impl FbResultSet {
    pub(crate) fn new(shared: Arc<FbResultSetShared>) -> Self {
        FbResultSet { shared }
    }
}

impl ResultSet for FbResultSet {
    fn next(&mut self) -> Result<bool> {
        self.shared.next()
    }

    fn get_string(&mut self, index: i32) -> Result<String> {
        self.shared.get_string(index)
    }

    fn get_int(&mut self, index: i32) -> Result<i32> {
        self.shared.get_int(index)
    }

    fn get_long(&mut self, index: i32) -> Result<i64> {
        self.shared.get_long(index)
    }

    fn get_double(&mut self, index: i32) -> Result<f64> {
        self.shared.get_double(index)
    }

    fn get_boolean(&mut self, index: i32) -> Result<bool> {
        self.shared.get_boolean(index)
    }

    fn get_date(&mut self, index: i32) -> Result<i32> {
        self.shared.get_date(index)
    }

    fn get_timestamp(&mut self, index: i32) -> Result<i64> {
        self.shared.get_timestamp(index)
    }

    fn get_time(&mut self, index: i32) -> Result<i64> {
        self.shared.get_time(index)
    }

    fn get_blob(&mut self, index: i32) -> Result<Box<dyn Blob>> {
        self.shared.get_blob(index)
    }

    fn get_bytes(&mut self, index: i32) -> Result<Vec<u8>> {
        self.shared.get_bytes(index)
    }

    fn get_binary_stream(&mut self, index: i32) -> Result<InputStream> {
        Ok(InputStream::new(self.shared.get_bytes(index)?))
    }

    fn was_null(&self) -> bool {
        self.shared.was_null()
    }

    fn is_before_first(&self) -> bool {
        self.shared.is_before_first()
    }

    fn is_after_last(&self) -> bool {
        self.shared.is_after_last()
    }

    fn get_row(&self) -> u64 {
        self.shared.row()
    }

    fn column_count(&self) -> i32 {
        self.shared.column_count()
    }

    fn column_name(&self, index: i32) -> Result<String> {
        self.shared.column_name(index)
    }

    fn find_column(&self, name: &str) -> Result<i32> {
        self.shared.find_column(name)
    }

    fn close(&mut self) {
        self.shared.close_internal();
    }

    fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_trims_trailing_spaces() {
        assert_eq!(decode_text(sys::SQL_TEXT, b"abc   "), b"abc".to_vec());
    }

    #[test]
    fn decode_text_reads_varying_length_prefix() {
        let mut bytes = 3u16.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abcxx");
        assert_eq!(decode_text(sys::SQL_VARYING, &bytes), b"abc".to_vec());
    }

    #[test]
    fn decode_numeric_applies_negative_scale() {
        let bytes = 1234i32.to_le_bytes();
        let value = decode_numeric(sys::SQL_LONG, -2, &bytes).unwrap();
        assert!((value - 12.34).abs() < 1e-9);
    }

    #[test]
    fn format_numeric_keeps_decimal_places_for_scaled_columns() {
        let bytes = 1235i32.to_le_bytes();
        assert_eq!(format_numeric(sys::SQL_LONG, -2, &bytes), "12.35");
    }
}
