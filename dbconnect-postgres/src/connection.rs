use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use dbconnect_core::common::is_ddl_statement;
use dbconnect_core::connection::Connection;
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::registry::Registry;
use dbconnect_core::result_set::ResultSet;
use dbconnect_core::statement::PreparedStatement;
use dbconnect_core::types::IsolationLevel;

use crate::conninfo::build_conninfo;
use crate::placeholders;
use crate::result_set::PgResultSet;
use crate::statement::PgPreparedStatement;

/// Wraps a raw `PGconn*` so it can live inside a `Mutex` shared across threads.
///
/// libpq allows only one command in flight per connection at a time but has no
/// affinity to the thread that issues it, so serialising access with a mutex (rather
/// than pinning the connection to a dedicated thread, as the cursor driver's recursive
/// mutex design does for a different reason) is all that's required here.
struct RawConn(*mut pq_sys::PGconn);

unsafe impl Send for RawConn {}

impl RawConn {
    fn finish(&mut self) {
        if !self.0.is_null() {
            unsafe { pq_sys::PQfinish(self.0) };
            self.0 = std::ptr::null_mut();
        }
    }
}

impl Drop for RawConn {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A session against one PostgreSQL server, speaking to it exclusively through libpq.
pub struct PgConnection {
    conn: Mutex<RawConn>,
    statements: Registry<PgPreparedStatement>,
    closed: AtomicBool,
    auto_commit: AtomicBool,
    in_transaction: AtomicBool,
    isolation: Mutex<IsolationLevel>,
    next_stmt_id: AtomicU64,
    self_weak: Weak<PgConnection>,
}

impl PgConnection {
    pub fn connect(url: &str, properties: &HashMap<String, String>) -> Result<Arc<PgConnection>> {
        let conninfo = build_conninfo(url, properties)?;
        let c_conninfo = CString::new(conninfo)
            .map_err(|_| Error::new(ErrorKind::BadArgs, "connection string contains an embedded NUL"))?;

        let raw = unsafe { pq_sys::PQconnectdb(c_conninfo.as_ptr()) };
        if raw.is_null() {
            return Err(Error::new(ErrorKind::ConnectFailed, "libpq returned a null connection handle"));
        }

        let status = unsafe { pq_sys::PQstatus(raw) };
        if status != pq_sys::CONNECTION_OK {
            let message = conn_error_message(raw);
            unsafe { pq_sys::PQfinish(raw) };
            return Err(Error::new(ErrorKind::ConnectFailed, message));
        }

        tracing::debug!(target: "dbconnect::postgres::connection", "connected");

        Ok(Arc::new_cyclic(|weak| PgConnection {
            conn: Mutex::new(RawConn(raw)),
            statements: Registry::new(),
            closed: AtomicBool::new(false),
            auto_commit: AtomicBool::new(true),
            in_transaction: AtomicBool::new(false),
            isolation: Mutex::new(IsolationLevel::ReadCommitted),
            next_stmt_id: AtomicU64::new(0),
            self_weak: weak.clone(),
        }))
    }

    /// Runs `f` with the raw connection handle, holding the connection mutex for the
    /// duration. Used by [`PgPreparedStatement`], which has no handle of its own —
    /// every prepared statement executes through its owning connection.
    pub(crate) fn with_raw<R>(&self, f: impl FnOnce(*mut pq_sys::PGconn) -> Result<R>) -> Result<R> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::conn_closed());
        }
        let guard = self.conn.lock().expect("connection mutex poisoned");
        f(guard.0)
    }

    fn exec_simple(&self, sql: &str) -> Result<()> {
        self.with_raw(|raw| {
            let c_sql = CString::new(sql).expect("static SQL never contains a NUL");
            let res = unsafe { pq_sys::PQexec(raw, c_sql.as_ptr()) };
            let status = unsafe { pq_sys::PQresultStatus(res) };
            let ok = status == pq_sys::PGRES_COMMAND_OK || status == pq_sys::PGRES_TUPLES_OK;
            let message = if ok { String::new() } else { result_error_message(res) };
            unsafe { pq_sys::PQclear(res) };
            if ok {
                Ok(())
            } else {
                Err(Error::new(ErrorKind::ExecFailed, message))
            }
        })
    }

    fn invalidate_statements(&self) {
        for statement in self.statements.live_children() {
            statement.mark_invalidated();
        }
    }

    /// Opens a transaction if manual (auto-commit off) mode has none active yet.
    /// Called ahead of every statement dispatch, per the connection's contract that
    /// `prepare_statement`/`execute_query`/`execute_update` open a transaction on
    /// first use rather than requiring an explicit `begin_transaction()` call.
    fn ensure_transaction_for_statement(&self) -> Result<()> {
        if !self.auto_commit.load(Ordering::Acquire) && !self.in_transaction.load(Ordering::Acquire) {
            self.begin_transaction()?;
        }
        Ok(())
    }

    /// Runs `sql` (expected to return exactly one row, one column) and hands back the
    /// raw text value libpq returned, or `None` for SQL NULL.
    fn query_single_text(&self, sql: &str) -> Result<Option<String>> {
        self.with_raw(|raw| {
            let c_sql = CString::new(sql).expect("static SQL never contains a NUL");
            let res = unsafe { pq_sys::PQexec(raw, c_sql.as_ptr()) };
            let status = unsafe { pq_sys::PQresultStatus(res) };
            if status != pq_sys::PGRES_TUPLES_OK {
                let message = result_error_message(res);
                unsafe { pq_sys::PQclear(res) };
                return Err(Error::new(ErrorKind::ExecFailed, message));
            }
            let is_null = unsafe { pq_sys::PQgetisnull(res, 0, 0) } != 0;
            let value = if is_null {
                None
            } else {
                let ptr = unsafe { pq_sys::PQgetvalue(res, 0, 0) };
                Some(unsafe { std::ffi::CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
            };
            unsafe { pq_sys::PQclear(res) };
            Ok(value)
        })
    }
}

impl Connection for PgConnection {
    fn prepare_statement(&self, sql: &str) -> Result<Arc<dyn PreparedStatement>> {
        self.ensure_transaction_for_statement()?;
        let (rewritten, param_count) = placeholders::rewrite(sql);
        let stmt_id = self.next_stmt_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("dbconnect_stmt_{stmt_id}");

        self.with_raw(|raw| {
            let c_name = CString::new(name.clone())
                .map_err(|_| Error::new(ErrorKind::BadArgs, "statement name contains a NUL"))?;
            let c_sql = CString::new(rewritten.clone())
                .map_err(|_| Error::new(ErrorKind::BadArgs, "sql contains an embedded NUL"))?;
            let res = unsafe { pq_sys::PQprepare(raw, c_name.as_ptr(), c_sql.as_ptr(), 0, std::ptr::null()) };
            let status = unsafe { pq_sys::PQresultStatus(res) };
            let ok = status == pq_sys::PGRES_COMMAND_OK;
            let message = if ok { String::new() } else { result_error_message(res) };
            unsafe { pq_sys::PQclear(res) };
            if ok {
                Ok(())
            } else {
                Err(Error::new(ErrorKind::PrepareFailed, message))
            }
        })?;

        let statement = Arc::new(PgPreparedStatement::new(
            self.self_weak.clone(),
            name,
            param_count,
        ));
        self.statements.register(Arc::downgrade(&statement));
        Ok(statement)
    }

    fn execute_query(&self, sql: &str) -> Result<Box<dyn ResultSet>> {
        self.ensure_transaction_for_statement()?;
        self.with_raw(|raw| {
            let c_sql = CString::new(sql)
                .map_err(|_| Error::new(ErrorKind::BadArgs, "sql contains an embedded NUL"))?;
            let res = unsafe { pq_sys::PQexec(raw, c_sql.as_ptr()) };
            PgResultSet::from_raw_result(res)
        })
    }

    fn execute_update(&self, sql: &str) -> Result<u64> {
        if is_ddl_statement(sql) {
            self.invalidate_statements();
        }
        self.ensure_transaction_for_statement()?;
        self.with_raw(|raw| {
            let c_sql = CString::new(sql)
                .map_err(|_| Error::new(ErrorKind::BadArgs, "sql contains an embedded NUL"))?;
            let res = unsafe { pq_sys::PQexec(raw, c_sql.as_ptr()) };
            let status = unsafe { pq_sys::PQresultStatus(res) };
            let rows = match status {
                s if s == pq_sys::PGRES_COMMAND_OK => affected_rows(res),
                s if s == pq_sys::PGRES_TUPLES_OK => unsafe { pq_sys::PQntuples(res) as u64 },
                _ => {
                    let message = result_error_message(res);
                    unsafe { pq_sys::PQclear(res) };
                    return Err(Error::new(ErrorKind::ExecFailed, message));
                }
            };
            unsafe { pq_sys::PQclear(res) };
            Ok(rows)
        })
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        if self.auto_commit.load(Ordering::Acquire) == auto_commit {
            return Ok(());
        }
        if self.in_transaction.load(Ordering::Acquire) {
            self.commit()?;
        }
        self.auto_commit.store(auto_commit, Ordering::Release);
        Ok(())
    }

    fn get_auto_commit(&self) -> Result<bool> {
        Ok(self.auto_commit.load(Ordering::Acquire))
    }

    fn begin_transaction(&self) -> Result<()> {
        if self.auto_commit.load(Ordering::Acquire) {
            return Err(Error::new(
                ErrorKind::TxBeginFailed,
                "cannot begin a manual transaction while auto-commit is enabled",
            ));
        }
        if self.in_transaction.load(Ordering::Acquire) {
            return Ok(());
        }
        self.exec_simple("BEGIN")?;
        // Forces snapshot acquisition immediately under SERIALIZABLE rather than at the
        // first real statement, so a connection handed out of a pool can't observe a
        // newer snapshot than the caller expects.
        if *self.isolation.lock().expect("isolation mutex poisoned") == IsolationLevel::Serializable {
            self.exec_simple("SELECT 1")?;
        }
        self.in_transaction.store(true, Ordering::Release);
        Ok(())
    }

    fn transaction_active(&self) -> Result<bool> {
        Ok(self.in_transaction.load(Ordering::Acquire))
    }

    fn commit(&self) -> Result<()> {
        if !self.in_transaction.load(Ordering::Acquire) {
            return Ok(());
        }
        self.exec_simple("COMMIT").map_err(|err| {
            Error::new(ErrorKind::TxCommitFailed, err.message().to_string())
        })?;
        self.in_transaction.store(false, Ordering::Release);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        if !self.in_transaction.load(Ordering::Acquire) {
            return Ok(());
        }
        self.exec_simple("ROLLBACK").map_err(|err| {
            Error::new(ErrorKind::TxRollbackFailed, err.message().to_string())
        })?;
        self.in_transaction.store(false, Ordering::Release);
        Ok(())
    }

    fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<()> {
        if *self.isolation.lock().expect("isolation mutex poisoned") == level {
            return Ok(());
        }
        let was_active = self.in_transaction.load(Ordering::Acquire);
        let auto_commit = self.auto_commit.load(Ordering::Acquire);
        if was_active {
            if auto_commit {
                self.commit()?;
            } else {
                self.rollback()?;
            }
        }

        *self.isolation.lock().expect("isolation mutex poisoned") = level;
        self.exec_simple(&format!(
            "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL {}",
            level.to_postgres_sql()
        ))?;

        if was_active && auto_commit {
            if level == IsolationLevel::Serializable {
                // Restart with an explicit isolation level on the `BEGIN` itself and
                // force snapshot acquisition with a dummy read, rather than letting the
                // first real statement acquire the snapshot lazily.
                self.exec_simple(&format!(
                    "BEGIN TRANSACTION ISOLATION LEVEL {}",
                    level.to_postgres_sql()
                ))?;
                self.exec_simple("SELECT 1")?;
                self.in_transaction.store(true, Ordering::Release);
            } else {
                self.begin_transaction()?;
            }
        }
        Ok(())
    }

    fn get_transaction_isolation(&self) -> Result<IsolationLevel> {
        let setting = self.query_single_text("SHOW transaction_isolation")?;
        let level = setting
            .as_deref()
            .and_then(IsolationLevel::from_postgres_setting)
            .unwrap_or(IsolationLevel::ReadCommitted);
        *self.isolation.lock().expect("isolation mutex poisoned") = level;
        Ok(level)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.invalidate_statements();
        let mut guard = self.conn.lock().expect("connection mutex poisoned");
        guard.finish();
        std::thread::sleep(dbconnect_core::common::CONNECTION_CLOSE_SETTLE_DELAY);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn return_to_pool(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::conn_closed());
        }
        if self.in_transaction.load(Ordering::Acquire) {
            self.rollback()?;
        }
        self.auto_commit.store(true, Ordering::Release);
        Ok(())
    }
}

pub(crate) fn conn_error_message(raw: *mut pq_sys::PGconn) -> String {
    unsafe {
        let ptr = pq_sys::PQerrorMessage(raw);
        if ptr.is_null() {
            return String::new();
        }
        std::ffi::CStr::from_ptr(ptr).to_string_lossy().trim().to_string()
    }
}

pub(crate) fn result_error_message(res: *mut pq_sys::PGresult) -> String {
    unsafe {
        let ptr = pq_sys::PQresultErrorMessage(res);
        if ptr.is_null() {
            return String::new();
        }
        std::ffi::CStr::from_ptr(ptr).to_string_lossy().trim().to_string()
    }
}

fn affected_rows(res: *mut pq_sys::PGresult) -> u64 {
    unsafe {
        let ptr = pq_sys::PQcmdTuples(res);
        if ptr.is_null() {
            return 0;
        }
        std::ffi::CStr::from_ptr(ptr)
            .to_string_lossy()
            .parse::<u64>()
            .unwrap_or(0)
    }
}
