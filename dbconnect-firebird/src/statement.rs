//! `isc_dsql_*` statement lifecycle: allocate, prepare (with the probe-then-redescribe
//! dance both the input and output `XSQLDA`s need since neither side knows its own
//! column/parameter count until the server has been asked once), bind, execute, fetch
//! metadata setup, and free.
//!
//! Parameter binding writes scaled/typed bytes directly into the same buffers the
//! `XSQLDA` the statement was described with points at — there is no separate "staged
//! value" representation the way the materialised driver's `Option<Vec<u8>>` params are,
//! because the wire format here is the same fixed-width binary `isc_dsql_execute` reads.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use libc::c_short;

use dbconnect_core::blob::Blob;
use dbconnect_core::common::STATEMENT_FREE_SETTLE_DELAY;
use dbconnect_core::connection::Connection as _;
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::io::input_stream::InputStream;
use dbconnect_core::result_set::ResultSet;
use dbconnect_core::statement::PreparedStatement;
use dbconnect_core::types::Types;

use crate::connection::FbConnection;
use crate::dates;
use crate::dpb::SQL_DIALECT;
use crate::result_set::{ColumnDescriptor, FbResultSet, FbResultSetShared};
use crate::sys::{self, isc_stmt_handle, ISC_QUAD, ISC_STATUS_ARRAY, XSQLVAR};
use crate::xsqlda::{buffer_size_for, column_name, XsqlDa};

fn base_sql_type(full: c_short) -> c_short {
    full & !1
}

/// One bound input parameter's own data buffer. `sqldata` for this slot's `XSQLVAR`
/// points directly at `buffer`'s heap storage; never resized after
/// [`wire_bound_params`] wires that pointer.
struct ParamSlot {
    buffer: Vec<u8>,
}

/// The input `XSQLDA` this statement was described with, plus the owned storage its
/// `sqldata`/`sqlind` pointers point into. Lives behind a single mutex so a slot's
/// buffer, its null indicator, and the `XSQLDA` describing it never drift out of sync.
struct BoundParams {
    da: XsqlDa,
    slots: Vec<ParamSlot>,
    indicators: Vec<c_short>,
}

struct StmtState {
    handle: isc_stmt_handle,
    bound: BoundParams,
}

pub struct FbPreparedStatement {
    connection: Weak<FbConnection>,
    dialect: u16,
    columns: Vec<ColumnDescriptor>,
    state: Mutex<StmtState>,
    invalidated: AtomicBool,
    closed: AtomicBool,
}

impl FbPreparedStatement {
    pub(crate) fn prepare(connection: Weak<FbConnection>, sql: &str) -> Result<Arc<FbPreparedStatement>> {
        let conn = connection.upgrade().ok_or_else(Error::conn_closed)?;
        let dialect = SQL_DIALECT as u16;
        let c_sql =
            CString::new(sql).map_err(|_| Error::new(ErrorKind::BadArgs, "sql contains an embedded NUL"))?;

        let (handle, columns, bound) = conn.with_handles(|db, tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            let mut stmt: isc_stmt_handle = 0;
            unsafe { sys::isc_dsql_allocate_statement(status.as_mut_ptr(), db, &mut stmt) };
            crate::status::check(&status, ErrorKind::PrepareFailed)?;

            let mut out_da = XsqlDa::new(10);
            let mut prepare_status: ISC_STATUS_ARRAY = [0; 20];
            unsafe {
                sys::isc_dsql_prepare(
                    prepare_status.as_mut_ptr(),
                    tr,
                    &mut stmt,
                    c_sql.as_bytes().len() as u16,
                    c_sql.as_ptr(),
                    dialect,
                    out_da.as_ptr(),
                )
            };
            crate::status::check(&prepare_status, ErrorKind::PrepareFailed)?;

            if out_da.described_count() as usize > out_da.capacity() {
                out_da = XsqlDa::new(out_da.described_count() as usize);
                let mut redescribe_status: ISC_STATUS_ARRAY = [0; 20];
                unsafe { sys::isc_dsql_describe(redescribe_status.as_mut_ptr(), &mut stmt, dialect, out_da.as_ptr()) };
                crate::status::check(&redescribe_status, ErrorKind::PrepareFailed)?;
            }
            let columns = build_column_descriptors(&out_da);

            let mut in_da = XsqlDa::new(10);
            let mut bind_status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_dsql_describe_bind(bind_status.as_mut_ptr(), &mut stmt, dialect, in_da.as_ptr()) };
            crate::status::check(&bind_status, ErrorKind::PrepareFailed)?;
            if in_da.described_count() as usize > in_da.capacity() {
                in_da = XsqlDa::new(in_da.described_count() as usize);
                let mut redescribe_bind_status: ISC_STATUS_ARRAY = [0; 20];
                unsafe {
                    sys::isc_dsql_describe_bind(redescribe_bind_status.as_mut_ptr(), &mut stmt, dialect, in_da.as_ptr())
                };
                crate::status::check(&redescribe_bind_status, ErrorKind::PrepareFailed)?;
            }
            let bound = wire_bound_params(in_da);

            Ok((stmt, columns, bound))
        })?;

        Ok(Arc::new(FbPreparedStatement {
            connection,
            dialect,
            columns,
            state: Mutex::new(StmtState { handle, bound }),
            invalidated: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }))
    }

    pub(crate) fn mark_invalidated(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    /// Frees the vendor statement handle behind DDL's back, leaving `closed` untouched
    /// so a later operation reports `STMT_INVALIDATED` rather than `STMT_CLOSED`.
    /// Idempotent, same as `close`.
    pub(crate) fn free_vendor_handle(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let Some(conn) = self.connection.upgrade() else {
            return;
        };
        let mut guard = self.state.lock().expect("statement mutex poisoned");
        if guard.handle == 0 {
            return;
        }
        let mut stmt = guard.handle;
        let result = conn.with_handles(|_db, _tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_dsql_free_statement(status.as_mut_ptr(), &mut stmt, sys::DSQL_drop) };
            crate::status::check(&status, ErrorKind::ExecFailed)
        });
        guard.handle = 0;
        drop(guard);

        if let Err(err) = result {
            tracing::warn!(target: "dbconnect::firebird::statement", error = %err, "failed to free prepared statement's vendor handle during invalidation");
        }
        std::thread::sleep(STATEMENT_FREE_SETTLE_DELAY);
    }

    fn check_usable(&self) -> Result<Arc<FbConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::stmt_closed());
        }
        if self.invalidated.load(Ordering::Acquire) {
            return Err(Error::stmt_invalidated());
        }
        self.connection.upgrade().ok_or_else(Error::conn_closed)
    }

    /// Looks up parameter `index`'s described `XSQLVAR` and hands the caller its data
    /// buffer and null indicator, both still wired into the statement's live `XSQLDA`.
    fn with_param<R>(
        &self,
        index: i32,
        f: impl FnOnce(*mut XSQLVAR, &mut [u8], &mut c_short) -> Result<R>,
    ) -> Result<R> {
        self.check_usable()?;
        let mut guard = self.state.lock().expect("statement mutex poisoned");
        let count = guard.bound.da.described_count().max(0) as i32;
        if index < 1 || index > count {
            return Err(Error::param_index(index));
        }
        let idx = (index - 1) as usize;
        let var = guard.bound.da.var(idx);
        let BoundParams { slots, indicators, .. } = &mut guard.bound;
        let buffer = slots[idx].buffer.as_mut_slice();
        let indicator = &mut indicators[idx];
        f(var, buffer, indicator)
    }

    fn execute_internal(&self) -> Result<()> {
        let conn = self.check_usable()?;
        let mut guard = self.state.lock().expect("statement mutex poisoned");
        if guard.handle == 0 {
            return Err(Error::stmt_closed());
        }
        let mut stmt = guard.handle;
        let dialect = self.dialect;
        let in_ptr = guard.bound.da.as_ptr();
        conn.with_handles(|_db, tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_dsql_execute(status.as_mut_ptr(), tr, &mut stmt, dialect, in_ptr) };
            crate::status::check(&status, ErrorKind::ExecFailed)
        })?;
        guard.handle = stmt;
        Ok(())
    }
}

impl PreparedStatement for FbPreparedStatement {
    fn set_int(&self, index: i32, value: i32) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let (base, scale) = unsafe { (base_sql_type((*var).sqltype), (*var).sqlscale) };
            encode_integer(buffer, base, scale, value as i64)?;
            *indicator = 0;
            Ok(())
        })
    }

    fn set_long(&self, index: i32, value: i64) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let (base, scale) = unsafe { (base_sql_type((*var).sqltype), (*var).sqlscale) };
            encode_integer(buffer, base, scale, value)?;
            *indicator = 0;
            Ok(())
        })
    }

    fn set_double(&self, index: i32, value: f64) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let (base, scale) = unsafe { (base_sql_type((*var).sqltype), (*var).sqlscale) };
            encode_double(buffer, base, scale, value)?;
            *indicator = 0;
            Ok(())
        })
    }

    fn set_string(&self, index: i32, value: &str) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let (base, sqllen) = unsafe { (base_sql_type((*var).sqltype), (*var).sqllen) };
            encode_string(buffer, base, sqllen, value.as_bytes())?;
            *indicator = 0;
            Ok(())
        })
    }

    fn set_boolean(&self, index: i32, value: bool) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let base = unsafe { base_sql_type((*var).sqltype) };
            if base == sys::SQL_BOOLEAN {
                buffer[0] = if value { 1 } else { 0 };
            } else {
                encode_integer(buffer, base, 0, if value { 1 } else { 0 })?;
            }
            *indicator = 0;
            Ok(())
        })
    }

    fn set_date(&self, index: i32, value: i32) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let base = unsafe { base_sql_type((*var).sqltype) };
            let firebird_date = dates::unix_days_to_firebird(value);
            match base {
                sys::SQL_TYPE_DATE => buffer[..4].copy_from_slice(&firebird_date.to_le_bytes()),
                sys::SQL_TIMESTAMP => {
                    buffer[..4].copy_from_slice(&firebird_date.to_le_bytes());
                    buffer[4..8].copy_from_slice(&0u32.to_le_bytes());
                }
                _ => return Err(Error::new(ErrorKind::Convert, format!("cannot bind a date into SQL type {base}"))),
            }
            *indicator = 0;
            Ok(())
        })
    }

    fn set_timestamp(&self, index: i32, value: i64) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let base = unsafe { base_sql_type((*var).sqltype) };
            let (firebird_date, firebird_time) = dates::unix_micros_to_firebird_timestamp(value);
            match base {
                sys::SQL_TIMESTAMP => {
                    buffer[..4].copy_from_slice(&firebird_date.to_le_bytes());
                    buffer[4..8].copy_from_slice(&firebird_time.to_le_bytes());
                }
                sys::SQL_TYPE_DATE => buffer[..4].copy_from_slice(&firebird_date.to_le_bytes()),
                sys::SQL_TYPE_TIME => buffer[..4].copy_from_slice(&firebird_time.to_le_bytes()),
                _ => {
                    return Err(Error::new(
                        ErrorKind::Convert,
                        format!("cannot bind a timestamp into SQL type {base}"),
                    ))
                }
            }
            *indicator = 0;
            Ok(())
        })
    }

    fn set_time(&self, index: i32, value: i64) -> Result<()> {
        self.with_param(index, |var, buffer, indicator| {
            let base = unsafe { base_sql_type((*var).sqltype) };
            let firebird_time = dates::micros_to_firebird_time(value);
            match base {
                sys::SQL_TYPE_TIME => buffer[..4].copy_from_slice(&firebird_time.to_le_bytes()),
                sys::SQL_TIMESTAMP => {
                    buffer[..4].copy_from_slice(&0i32.to_le_bytes());
                    buffer[4..8].copy_from_slice(&firebird_time.to_le_bytes());
                }
                _ => return Err(Error::new(ErrorKind::Convert, format!("cannot bind a time into SQL type {base}"))),
            }
            *indicator = 0;
            Ok(())
        })
    }

    fn set_blob(&self, index: i32, blob: &dyn Blob) -> Result<()> {
        let len = blob.length()?;
        let bytes = blob.get_bytes(0, len)?;
        self.set_bytes(index, &bytes)
    }

    fn set_bytes(&self, index: i32, value: &[u8]) -> Result<()> {
        let conn = self.check_usable()?;
        let (base, sqllen) = {
            let guard = self.state.lock().expect("statement mutex poisoned");
            let count = guard.bound.da.described_count().max(0) as i32;
            if index < 1 || index > count {
                return Err(Error::param_index(index));
            }
            let var = guard.bound.da.var((index - 1) as usize);
            unsafe { (base_sql_type((*var).sqltype), (*var).sqllen) }
        };

        let idx = (index - 1) as usize;
        if base == sys::SQL_BLOB {
            let blob_id = conn.write_blob(value)?;
            let mut guard = self.state.lock().expect("statement mutex poisoned");
            let BoundParams { slots, indicators, .. } = &mut guard.bound;
            encode_blob_id(slots[idx].buffer.as_mut_slice(), blob_id);
            indicators[idx] = 0;
        } else {
            let mut guard = self.state.lock().expect("statement mutex poisoned");
            let BoundParams { slots, indicators, .. } = &mut guard.bound;
            encode_string(slots[idx].buffer.as_mut_slice(), base, sqllen, value)?;
            indicators[idx] = 0;
        }
        Ok(())
    }

    fn set_binary_stream(&self, index: i32, mut stream: InputStream) -> Result<()> {
        self.set_bytes(index, &drain_stream(&mut stream))
    }

    fn set_binary_stream_with_length(&self, index: i32, mut stream: InputStream, length: u64) -> Result<()> {
        let mut bytes = drain_stream(&mut stream);
        bytes.truncate(length as usize);
        self.set_bytes(index, &bytes)
    }

    fn set_null(&self, index: i32, _hint: Types) -> Result<()> {
        // Every parameter's server-side type is already pinned down by
        // `isc_dsql_describe_bind`; unlike the materialised driver there is no
        // untyped placeholder to steer, so `hint` only documents caller intent.
        self.with_param(index, |_var, _buffer, indicator| {
            *indicator = -1;
            Ok(())
        })
    }

    fn execute_query(&self) -> Result<Box<dyn ResultSet>> {
        self.execute_internal()?;
        let conn = self.check_usable()?;
        let handle = {
            let mut guard = self.state.lock().expect("statement mutex poisoned");
            let handle = guard.handle;
            // The result set takes ownership of the vendor statement handle from here;
            // zero it so this statement's own `close` never tries to free it again.
            guard.handle = 0;
            handle
        };
        let shared = FbResultSetShared::new(conn, handle, self.dialect, self.columns.clone())?;
        Ok(Box::new(FbResultSet::new(shared)))
    }

    fn execute_update(&self) -> Result<u64> {
        let conn = self.check_usable()?;
        let result = self.execute_internal().and_then(|()| {
            let mut guard = self.state.lock().expect("statement mutex poisoned");
            let mut stmt = guard.handle;
            let affected = conn.with_handles(|_db, _tr| {
                let items = [sys::ISC_INFO_SQL_RECORDS];
                let mut buffer = vec![0u8; 64];
                let mut status: ISC_STATUS_ARRAY = [0; 20];
                unsafe {
                    sys::isc_dsql_sql_info(
                        status.as_mut_ptr(),
                        &mut stmt,
                        items.len() as i16,
                        items.as_ptr() as *const c_char,
                        buffer.len() as i16,
                        buffer.as_mut_ptr() as *mut c_char,
                    )
                };
                crate::status::check(&status, ErrorKind::ExecFailed)?;
                Ok(crate::infobuf::parse_affected_rows(&buffer))
            });
            guard.handle = stmt;
            affected
        });

        // Autocommit here means each statement completes its own unit of work:
        // commit to make the change visible on success, roll back to leave the
        // shared perpetual transaction clean for whatever runs next on failure.
        if conn.get_auto_commit().unwrap_or(false) {
            match &result {
                Ok(_) => conn.commit()?,
                Err(_) => conn.rollback()?,
            }
        }
        result
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(conn) = self.connection.upgrade() else {
            return;
        };
        let mut guard = self.state.lock().expect("statement mutex poisoned");
        if guard.handle == 0 {
            return;
        }
        let mut stmt = guard.handle;
        let result = conn.with_handles(|_db, _tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_dsql_free_statement(status.as_mut_ptr(), &mut stmt, sys::DSQL_drop) };
            crate::status::check(&status, ErrorKind::ExecFailed)
        });
        guard.handle = 0;
        drop(guard);

        if let Err(err) = result {
            tracing::warn!(target: "dbconnect::firebird::statement", error = %err, "failed to free prepared statement during close");
        }
        std::thread::sleep(STATEMENT_FREE_SETTLE_DELAY);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn build_column_descriptors(da: &XsqlDa) -> Vec<ColumnDescriptor> {
    let count = da.described_count().max(0) as usize;
    let mut columns = Vec::with_capacity(count);
    for i in 0..count {
        let var = da.var(i);
        unsafe {
            columns.push(ColumnDescriptor {
                name: column_name(var),
                sqltype: (*var).sqltype,
                sqlscale: (*var).sqlscale,
                sqlsubtype: (*var).sqlsubtype,
                sqllen: (*var).sqllen,
            });
        }
    }
    columns
}

fn wire_bound_params(mut da: XsqlDa) -> BoundParams {
    let count = da.described_count().max(0) as usize;
    let mut slots = Vec::with_capacity(count);
    for i in 0..count {
        let var = da.var(i);
        let (sqltype, sqllen) = unsafe { ((*var).sqltype, (*var).sqllen) };
        let size = buffer_size_for(base_sql_type(sqltype), sqllen);
        slots.push(ParamSlot { buffer: vec![0u8; size] });
    }
    let mut indicators = vec![-1 as c_short; count];
    for i in 0..count {
        let var = da.var(i);
        unsafe {
            (*var).sqldata = slots[i].buffer.as_mut_ptr() as *mut c_char;
            (*var).sqlind = &mut indicators[i] as *mut c_short;
        }
    }
    BoundParams { da, slots, indicators }
}

fn scaled_integer(value: f64, scale: c_short) -> i64 {
    if scale == 0 {
        value.round() as i64
    } else {
        (value * 10f64.powi(-(scale as i32))).round() as i64
    }
}

fn encode_integer(buffer: &mut [u8], base: c_short, scale: c_short, value: i64) -> Result<()> {
    let scaled = if scale == 0 { value } else { scaled_integer(value as f64, scale) };
    match base {
        sys::SQL_SHORT => buffer[..2].copy_from_slice(&(scaled as i16).to_le_bytes()),
        sys::SQL_LONG => buffer[..4].copy_from_slice(&(scaled as i32).to_le_bytes()),
        sys::SQL_INT64 => buffer[..8].copy_from_slice(&scaled.to_le_bytes()),
        sys::SQL_FLOAT => buffer[..4].copy_from_slice(&(value as f32).to_le_bytes()),
        sys::SQL_DOUBLE | sys::SQL_D_FLOAT => buffer[..8].copy_from_slice(&(value as f64).to_le_bytes()),
        sys::SQL_BOOLEAN => buffer[0] = if value != 0 { 1 } else { 0 },
        _ => return Err(Error::new(ErrorKind::Convert, format!("cannot bind an integer into SQL type {base}"))),
    }
    Ok(())
}

fn encode_double(buffer: &mut [u8], base: c_short, scale: c_short, value: f64) -> Result<()> {
    match base {
        sys::SQL_DOUBLE | sys::SQL_D_FLOAT => buffer[..8].copy_from_slice(&value.to_le_bytes()),
        sys::SQL_FLOAT => buffer[..4].copy_from_slice(&(value as f32).to_le_bytes()),
        sys::SQL_SHORT | sys::SQL_LONG | sys::SQL_INT64 => {
            let scaled = scaled_integer(value, scale);
            return encode_integer(buffer, base, 0, scaled);
        }
        _ => return Err(Error::new(ErrorKind::Convert, format!("cannot bind a double into SQL type {base}"))),
    }
    Ok(())
}

fn encode_string(buffer: &mut [u8], base: c_short, sqllen: c_short, bytes: &[u8]) -> Result<()> {
    match base {
        sys::SQL_VARYING => {
            let max = sqllen as usize;
            let n = bytes.len().min(max);
            buffer[..2].copy_from_slice(&(n as u16).to_le_bytes());
            buffer[2..2 + n].copy_from_slice(&bytes[..n]);
        }
        sys::SQL_TEXT => {
            let max = sqllen as usize;
            let n = bytes.len().min(max);
            buffer[..n].copy_from_slice(&bytes[..n]);
            buffer[n..max].fill(b' ');
        }
        _ => return Err(Error::new(ErrorKind::Convert, format!("cannot bind text into SQL type {base}"))),
    }
    Ok(())
}

fn encode_blob_id(buffer: &mut [u8], blob_id: ISC_QUAD) {
    buffer[..4].copy_from_slice(&blob_id.gds_quad_high.to_le_bytes());
    buffer[4..8].copy_from_slice(&blob_id.gds_quad_low.to_le_bytes());
}

/// Reads a stream to exhaustion into an owned `Vec<u8>`.
fn drain_stream(stream: &mut InputStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            n if n > 0 => out.extend_from_slice(&chunk[..n as usize]),
            _ => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_integer_matches_round_half_up_for_two_decimal_places() {
        // set_double(12.345) on a DECIMAL(10,2) column (scale -2) stores
        // round(12.345 * 100) == 1235, i.e. 12.35 read back.
        assert_eq!(scaled_integer(12.345, -2), 1235);
        assert_eq!(scaled_integer(12.34, -2), 1234);
        assert_eq!(scaled_integer(-12.345, -2), -1235);
    }

    #[test]
    fn scaled_integer_is_identity_at_scale_zero() {
        assert_eq!(scaled_integer(42.0, 0), 42);
    }

    #[test]
    fn encode_integer_rejects_non_numeric_sql_type() {
        let mut buffer = vec![0u8; 8];
        let err = encode_integer(&mut buffer, sys::SQL_VARYING, 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Convert);
    }

    #[test]
    fn encode_integer_scales_into_a_long_buffer() {
        let mut buffer = vec![0u8; 4];
        encode_integer(&mut buffer, sys::SQL_LONG, -2, 1235).unwrap();
        assert_eq!(i32::from_le_bytes(buffer[..4].try_into().unwrap()), 123500);
    }

    #[test]
    fn encode_string_pads_fixed_text_with_spaces() {
        let mut buffer = vec![0u8; 6];
        encode_string(&mut buffer, sys::SQL_TEXT, 6, b"ab").unwrap();
        assert_eq!(&buffer, b"ab    ");
    }

    #[test]
    fn encode_string_writes_varying_length_prefix() {
        let mut buffer = vec![0u8; 8];
        encode_string(&mut buffer, sys::SQL_VARYING, 6, b"abc").unwrap();
        assert_eq!(u16::from_le_bytes(buffer[..2].try_into().unwrap()), 3);
        assert_eq!(&buffer[2..5], b"abc");
    }

    #[test]
    fn encode_string_truncates_to_the_declared_max_length() {
        let mut buffer = vec![0u8; 4];
        encode_string(&mut buffer, sys::SQL_VARYING, 2, b"abcdef").unwrap();
        assert_eq!(u16::from_le_bytes(buffer[..2].try_into().unwrap()), 2);
        assert_eq!(&buffer[2..4], b"ab");
    }

    #[test]
    fn encode_blob_id_round_trips_through_decode_blob_id() {
        let mut buffer = vec![0u8; 8];
        let id = ISC_QUAD {
            gds_quad_high: 7,
            gds_quad_low: 0xDEAD_BEEF,
        };
        encode_blob_id(&mut buffer, id);
        let decoded = crate::result_set::decode_blob_id(&buffer);
        assert_eq!(decoded.gds_quad_high, 7);
        assert_eq!(decoded.gds_quad_low, 0xDEAD_BEEF);
    }
}
