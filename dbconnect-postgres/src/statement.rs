use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use dbconnect_core::blob::Blob;
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::io::input_stream::InputStream;
use dbconnect_core::result_set::ResultSet;
use dbconnect_core::statement::PreparedStatement;
use dbconnect_core::types::Types;

use crate::blob::to_hex_literal;
use crate::connection::{result_error_message, PgConnection};
use crate::dates::{format_date, format_time, format_timestamp};
use crate::result_set::PgResultSet;

/// A server-side prepared statement on a [`PgConnection`], named via `PQprepare` and
/// replayed with `PQexecPrepared`.
///
/// Holds no handle of its own: every bound parameter lives in this struct, and
/// execution borrows the owning connection's raw `PGconn*` for the duration of the
/// call. `?` parameter markers are rewritten to PostgreSQL's `$1, $2, ...` form at
/// prepare time (see [`crate::placeholders::rewrite`]); the parameter count recorded
/// here is how many markers that rewrite found.
pub struct PgPreparedStatement {
    connection: Weak<PgConnection>,
    name: String,
    param_count: i32,
    params: Mutex<Vec<Option<Vec<u8>>>>,
    invalidated: AtomicBool,
    closed: AtomicBool,
}

impl PgPreparedStatement {
    pub(crate) fn new(connection: Weak<PgConnection>, name: String, param_count: i32) -> Self {
        PgPreparedStatement {
            connection,
            name,
            param_count,
            params: Mutex::new(vec![None; param_count.max(0) as usize]),
            invalidated: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn mark_invalidated(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    fn check_usable(&self) -> Result<Arc<PgConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::stmt_closed());
        }
        if self.invalidated.load(Ordering::Acquire) {
            return Err(Error::stmt_invalidated());
        }
        self.connection.upgrade().ok_or_else(Error::conn_closed)
    }

    fn bind(&self, index: i32, value: Option<Vec<u8>>) -> Result<()> {
        self.check_usable()?;
        if index < 1 || index > self.param_count {
            return Err(Error::param_index(index));
        }
        let mut params = self.params.lock().expect("parameter mutex poisoned");
        params[(index - 1) as usize] = value;
        Ok(())
    }

    /// Runs the statement, returning the raw result the caller is responsible for
    /// inspecting and clearing.
    fn execute_internal(&self) -> Result<*mut pq_sys::PGresult> {
        let connection = self.check_usable()?;
        let params = self.params.lock().expect("parameter mutex poisoned").clone();

        let mut owned: Vec<Option<CString>> = Vec::with_capacity(params.len());
        for value in &params {
            match value {
                Some(bytes) => {
                    let c = CString::new(bytes.clone()).map_err(|_| {
                        Error::new(ErrorKind::BadArgs, "parameter value contains an embedded NUL")
                    })?;
                    owned.push(Some(c));
                }
                None => owned.push(None),
            }
        }
        let pointers: Vec<*const libc::c_char> = owned
            .iter()
            .map(|c| c.as_ref().map(CString::as_ptr).unwrap_or(std::ptr::null()))
            .collect();

        let name = self.name.clone();
        connection.with_raw(|raw| {
            let c_name = CString::new(name.clone()).expect("generated statement name never contains a NUL");
            let res = unsafe {
                pq_sys::PQexecPrepared(
                    raw,
                    c_name.as_ptr(),
                    pointers.len() as libc::c_int,
                    pointers.as_ptr(),
                    std::ptr::null(),
                    std::ptr::null(),
                    0,
                )
            };
            Ok(res)
        })
    }
}

impl PreparedStatement for PgPreparedStatement {
    fn set_int(&self, index: i32, value: i32) -> Result<()> {
        self.bind(index, Some(value.to_string().into_bytes()))
    }

    fn set_long(&self, index: i32, value: i64) -> Result<()> {
        self.bind(index, Some(value.to_string().into_bytes()))
    }

    fn set_double(&self, index: i32, value: f64) -> Result<()> {
        self.bind(index, Some(value.to_string().into_bytes()))
    }

    fn set_string(&self, index: i32, value: &str) -> Result<()> {
        self.bind(index, Some(value.as_bytes().to_vec()))
    }

    fn set_boolean(&self, index: i32, value: bool) -> Result<()> {
        self.bind(index, Some(if value { b"t".to_vec() } else { b"f".to_vec() }))
    }

    fn set_date(&self, index: i32, value: i32) -> Result<()> {
        self.bind(index, Some(format_date(value).into_bytes()))
    }

    fn set_timestamp(&self, index: i32, value: i64) -> Result<()> {
        self.bind(index, Some(format_timestamp(value).into_bytes()))
    }

    fn set_time(&self, index: i32, value: i64) -> Result<()> {
        self.bind(index, Some(format_time(value).into_bytes()))
    }

    fn set_blob(&self, index: i32, blob: &dyn Blob) -> Result<()> {
        let len = blob.length()?;
        let bytes = blob.get_bytes(0, len)?;
        self.bind(index, Some(to_hex_literal(&bytes).into_bytes()))
    }

    fn set_bytes(&self, index: i32, value: &[u8]) -> Result<()> {
        self.bind(index, Some(to_hex_literal(value).into_bytes()))
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
        // libpq infers the parameter's server-side type from the prepared statement's
        // own query context (it was prepared with an empty paramTypes array), so there
        // is no OID to attach to a NULL the way the cursor driver's XSQLDA binding
        // needs one.
        self.bind(index, None)
    }

    fn execute_query(&self) -> Result<Box<dyn ResultSet>> {
        let result = self.execute_internal();
        self.close();
        let res = result?;
        PgResultSet::from_raw_result(res)
    }

    fn execute_update(&self) -> Result<u64> {
        let result = self.execute_internal();
        self.close();
        let res = result?;
        let status = unsafe { pq_sys::PQresultStatus(res) };
        let rows = match status {
            s if s == pq_sys::PGRES_COMMAND_OK => {
                let ptr = unsafe { pq_sys::PQcmdTuples(res) };
                if ptr.is_null() {
                    0
                } else {
                    unsafe { std::ffi::CStr::from_ptr(ptr) }
                        .to_string_lossy()
                        .parse::<u64>()
                        .unwrap_or(0)
                }
            }
            s if s == pq_sys::PGRES_TUPLES_OK => unsafe { pq_sys::PQntuples(res) as u64 },
            _ => {
                let message = result_error_message(res);
                unsafe { pq_sys::PQclear(res) };
                return Err(Error::new(ErrorKind::ExecFailed, message));
            }
        };
        unsafe { pq_sys::PQclear(res) };
        Ok(rows)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        let name = self.name.clone();
        let result = connection.with_raw(|raw| {
            let sql = format!("DEALLOCATE \"{name}\"");
            let c_sql = CString::new(sql).expect("generated DEALLOCATE sql never contains a NUL");
            let res = unsafe { pq_sys::PQexec(raw, c_sql.as_ptr()) };
            unsafe { pq_sys::PQclear(res) };
            Ok::<(), Error>(())
        });
        if let Err(err) = result {
            tracing::warn!(target: "dbconnect::postgres::statement", error = %err, "failed to deallocate prepared statement during close");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
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
