use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;

use dbconnect_core::common::{is_create_database_statement, is_ddl_statement, CONNECTION_CLOSE_SETTLE_DELAY};
use dbconnect_core::connection::Connection;
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::registry::Registry;
use dbconnect_core::result_set::ResultSet;
use dbconnect_core::statement::PreparedStatement;
use dbconnect_core::types::IsolationLevel;

use crate::dpb::{DpbBuilder, SQL_DIALECT};
use crate::result_set::FbResultSetShared;
use crate::statement::FbPreparedStatement;
use crate::sys::{self, isc_db_handle, isc_tr_handle, ISC_QUAD, ISC_STATUS_ARRAY};
use crate::tpb;
use crate::{DEFAULT_PORT, SCHEME};

/// Attachment and transaction state, copied in and out under the shared lock rather
/// than borrowed — every field here is `Copy`, so two reentrant calls taking turns
/// with the mutex never need a `RefCell`'s runtime borrow tracking, which would panic
/// the moment a reentrant call (e.g. `commit` → `end_transaction` →
/// `close_all_result_sets`) tried to borrow a second time on the same thread.
#[derive(Clone, Copy)]
struct ConnState {
    db: isc_db_handle,
    tr: isc_tr_handle,
    closed: bool,
    auto_commit: bool,
    isolation: IsolationLevel,
}

/// A live attachment to one Firebird database, speaking to it through the `isc_*`
/// client API.
///
/// Unlike the materialised driver's per-operation mutex, every statement and result
/// set derived from this connection shares one [`parking_lot::ReentrantMutex`] with
/// it: Firebird's server-side cursors tie a fetch to the transaction that
/// opened it, so there is no profit in letting two operations on the same attachment
/// run concurrently, and a recursive lock lets the teardown chain (close a result set
/// from inside the commit that's ending its transaction) take the lock twice on one
/// thread without deadlocking.
pub struct FbConnection {
    lock: ReentrantMutex<Cell<ConnState>>,
    statements: Registry<FbPreparedStatement>,
    result_sets: Registry<FbResultSetShared>,
    self_weak: Weak<FbConnection>,
    charset: String,
}

impl FbConnection {
    pub fn connect(url: &str, properties: &HashMap<String, String>) -> Result<Arc<FbConnection>> {
        let parsed = dbconnect_core::url::parse(url, SCHEME)?;
        let charset = properties.get("charset").cloned().unwrap_or_else(|| "UTF8".to_string());

        let db_name = match &parsed.host {
            Some(host) => format!("{host}/{}:{}", parsed.port.unwrap_or(DEFAULT_PORT), parsed.database),
            None => parsed.database.clone(),
        };

        let mut dpb_builder = DpbBuilder::new().charset(&charset).sql_dialect(SQL_DIALECT);
        if let Some(user) = properties.get("user") {
            dpb_builder = dpb_builder.user_name(user);
        }
        if let Some(password) = properties.get("password") {
            dpb_builder = dpb_builder.password(password);
        }
        let dpb = dpb_builder.build();

        let c_db_name = CString::new(db_name)
            .map_err(|_| Error::new(ErrorKind::BadArgs, "database name contains an embedded NUL"))?;

        let mut status: ISC_STATUS_ARRAY = [0; 20];
        let mut db: isc_db_handle = 0;
        unsafe {
            sys::isc_attach_database(
                status.as_mut_ptr(),
                c_db_name.as_bytes().len() as i16,
                c_db_name.as_ptr(),
                &mut db,
                dpb.len() as i16,
                dpb.as_ptr() as *const c_char,
            )
        };
        crate::status::check(&status, ErrorKind::ConnectFailed)?;

        tracing::debug!(target: "dbconnect::firebird::connection", "attached");

        let connection = Arc::new_cyclic(|weak| FbConnection {
            lock: ReentrantMutex::new(Cell::new(ConnState {
                db,
                tr: 0,
                closed: false,
                auto_commit: true,
                isolation: IsolationLevel::ReadCommitted,
            })),
            statements: Registry::new(),
            result_sets: Registry::new(),
            self_weak: weak.clone(),
            charset,
        });

        // The invariant this driver maintains for autocommit: a transaction is always
        // open while it's on, since Firebird has no server-side autocommit of its own.
        connection.begin_tx_locked(IsolationLevel::ReadCommitted)?;

        Ok(connection)
    }

    pub(crate) fn charset(&self) -> &str {
        &self.charset
    }

    /// Runs `f` with the attachment's current db/transaction handles, holding the
    /// shared lock for the duration. Any change `f` makes to either handle (normal
    /// after a commit/rollback reopens the transaction) is written back before
    /// returning.
    pub(crate) fn with_handles<R>(
        &self,
        f: impl FnOnce(&mut isc_db_handle, &mut isc_tr_handle) -> Result<R>,
    ) -> Result<R> {
        let guard = self.lock.lock();
        let mut state = guard.get();
        if state.closed {
            return Err(Error::conn_closed());
        }
        let mut db = state.db;
        let mut tr = state.tr;
        let result = f(&mut db, &mut tr);
        state.db = db;
        state.tr = tr;
        guard.set(state);
        result
    }

    fn invalidate_statements(&self) {
        for statement in self.statements.live_children() {
            statement.mark_invalidated();
            statement.free_vendor_handle();
        }
    }

    /// Closes every registered cursor ResultSet. Open cursors must be torn down before
    /// the transaction fetching through them ends. The live set is
    /// collected while the registry lock is held, then driven with that lock released,
    /// since each result set unregisters itself from inside its own `close_internal`.
    fn close_all_result_sets(&self) {
        for result_set in self.result_sets.live_children() {
            result_set.close_internal();
        }
    }

    /// Runs `CREATE DATABASE`/`CREATE SCHEMA` through `isc_dsql_execute_immediate`
    /// rather than the normal prepare/execute path — on the Firebird wire these can't
    /// be prepared as an ordinary DSQL statement the way DML/most DDL can.
    fn execute_immediate(&self, sql: &str) -> Result<u64> {
        let dialect = SQL_DIALECT as u16;
        let c_sql =
            CString::new(sql).map_err(|_| Error::new(ErrorKind::BadArgs, "sql contains an embedded NUL"))?;
        self.with_handles(|db, tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe {
                sys::isc_dsql_execute_immediate(
                    status.as_mut_ptr(),
                    db,
                    tr,
                    c_sql.as_bytes().len() as u16,
                    c_sql.as_ptr(),
                    dialect,
                    std::ptr::null_mut(),
                )
            };
            crate::status::check(&status, ErrorKind::ExecFailed)
        })?;
        Ok(0)
    }

    fn begin_tx_locked(&self, isolation: IsolationLevel) -> Result<()> {
        let tpb = tpb::for_isolation(isolation);
        self.with_handles(|db, tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe {
                sys::isc_start_transaction(
                    status.as_mut_ptr(),
                    tr,
                    1,
                    db as *mut isc_db_handle,
                    tpb.len() as u32,
                    tpb.as_ptr() as *const c_char,
                )
            };
            crate::status::check(&status, ErrorKind::TxBeginFailed)
        })
    }

    fn end_transaction(&self, commit: bool) -> Result<()> {
        self.close_all_result_sets();
        self.with_handles(|_db, tr| {
            if *tr == 0 {
                return Ok(());
            }
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            unsafe {
                if commit {
                    sys::isc_commit_transaction(status.as_mut_ptr(), tr)
                } else {
                    sys::isc_rollback_transaction(status.as_mut_ptr(), tr)
                }
            };
            let kind = if commit {
                ErrorKind::TxCommitFailed
            } else {
                ErrorKind::TxRollbackFailed
            };
            crate::status::check(&status, kind)?;
            *tr = 0;
            Ok(())
        })?;

        let state = self.lock.lock().get();
        if state.auto_commit {
            // Perpetual-transaction invariant: autocommit always keeps one open.
            self.begin_tx_locked(state.isolation)?;
        }
        Ok(())
    }
}

impl Connection for FbConnection {
    fn prepare_statement(&self, sql: &str) -> Result<Arc<dyn PreparedStatement>> {
        let state = self.lock.lock().get();
        if !state.auto_commit && state.tr == 0 {
            self.begin_tx_locked(state.isolation)?;
        }
        let statement = FbPreparedStatement::prepare(self.self_weak.clone(), sql)?;
        self.statements.register(Arc::downgrade(&statement));
        Ok(statement)
    }

    fn execute_query(&self, sql: &str) -> Result<Box<dyn ResultSet>> {
        let statement = self.prepare_statement(sql)?;
        statement.execute_query()
    }

    fn execute_update(&self, sql: &str) -> Result<u64> {
        if is_create_database_statement(sql) {
            return self.execute_immediate(sql);
        }
        if is_ddl_statement(sql) {
            // Invalidate and free every live prepared statement's vendor handle, then
            // commit and reopen the transaction, before the DDL itself runs — Firebird
            // won't grant the metadata lock a DDL statement needs while older
            // statements still hold one from inside this transaction.
            self.invalidate_statements();
            self.end_transaction(true)?;
        }
        let statement = self.prepare_statement(sql)?;
        let affected = statement.execute_update()?;
        if is_ddl_statement(sql) {
            // Commit the DDL itself so subsequently prepared statements see the new
            // metadata.
            self.end_transaction(true)?;
        }
        Ok(affected)
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        let current = self.lock.lock().get().auto_commit;
        if current == auto_commit {
            return Ok(());
        }
        if !auto_commit {
            let mut state = self.lock.lock().get();
            state.auto_commit = false;
            self.lock.lock().set(state);
            return Ok(());
        }
        let mut state = self.lock.lock().get();
        state.auto_commit = true;
        self.lock.lock().set(state);
        self.commit()
    }

    fn get_auto_commit(&self) -> Result<bool> {
        Ok(self.lock.lock().get().auto_commit)
    }

    fn begin_transaction(&self) -> Result<()> {
        let state = self.lock.lock().get();
        if state.auto_commit {
            return Err(Error::new(
                ErrorKind::TxBeginFailed,
                "cannot begin a manual transaction while auto-commit is enabled",
            ));
        }
        if state.tr != 0 {
            return Ok(());
        }
        self.begin_tx_locked(state.isolation)
    }

    fn transaction_active(&self) -> Result<bool> {
        Ok(self.lock.lock().get().tr != 0)
    }

    fn commit(&self) -> Result<()> {
        self.end_transaction(true)
    }

    fn rollback(&self) -> Result<()> {
        self.end_transaction(false)
    }

    fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<()> {
        let mut state = self.lock.lock().get();
        if state.isolation == level {
            return Ok(());
        }
        let was_active = state.tr != 0;
        let auto_commit = state.auto_commit;
        state.isolation = level;
        self.lock.lock().set(state);

        if was_active {
            if auto_commit {
                self.commit()?;
            } else {
                self.rollback()?;
            }
        }
        Ok(())
    }

    fn get_transaction_isolation(&self) -> Result<IsolationLevel> {
        Ok(self.lock.lock().get().isolation)
    }

    fn close(&self) {
        let already_closed = {
            let mut state = self.lock.lock().get();
            let was_closed = state.closed;
            state.closed = true;
            self.lock.lock().set(state);
            was_closed
        };
        if already_closed {
            return;
        }

        self.invalidate_statements();
        self.close_all_result_sets();

        let guard = self.lock.lock();
        let mut state = guard.get();
        let mut status: ISC_STATUS_ARRAY = [0; 20];
        if state.tr != 0 {
            unsafe { sys::isc_rollback_transaction(status.as_mut_ptr(), &mut state.tr) };
            state.tr = 0;
        }
        if state.db != 0 {
            let mut close_status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_detach_database(close_status.as_mut_ptr(), &mut state.db) };
            state.db = 0;
        }
        guard.set(state);
        drop(guard);

        std::thread::sleep(CONNECTION_CLOSE_SETTLE_DELAY);
    }

    fn is_closed(&self) -> bool {
        self.lock.lock().get().closed
    }

    /// Never fails: ends the current unit of work best-effort, then forces autocommit
    /// back on and restores the perpetual-transaction invariant with a fresh
    /// transaction, regardless of what mode the last borrower left the connection in.
    fn return_to_pool(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let was_auto_commit = self.lock.lock().get().auto_commit;
        let end_result = if was_auto_commit { self.commit() } else { self.rollback() };
        if let Err(err) = end_result {
            tracing::warn!(target: "dbconnect::firebird::connection", error = %err, "failed to end transaction while returning connection to pool");
        }

        let mut state = self.lock.lock().get();
        state.auto_commit = true;
        let isolation = state.isolation;
        let needs_tx = state.tr == 0;
        self.lock.lock().set(state);

        if needs_tx {
            if let Err(err) = self.begin_tx_locked(isolation) {
                tracing::warn!(target: "dbconnect::firebird::connection", error = %err, "failed to reopen a transaction while returning connection to pool");
            }
        }
        Ok(())
    }
}

impl FbConnection {
    /// Reads `blob_id` to completion in 32 KiB segments, inside the attachment's
    /// current transaction. Used by [`crate::blob::FbBlob`]'s lazy load.
    pub(crate) fn read_blob(&self, blob_id: ISC_QUAD) -> Result<Vec<u8>> {
        self.with_handles(|db, tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            let mut blob_handle: sys::isc_blob_handle = 0;
            let mut blob_id = blob_id;
            unsafe {
                sys::isc_open_blob2(
                    status.as_mut_ptr(),
                    db,
                    tr,
                    &mut blob_handle,
                    &mut blob_id,
                    0,
                    std::ptr::null(),
                )
            };
            crate::status::check(&status, ErrorKind::BlobIo)?;

            const SEGMENT_SIZE: u16 = 32 * 1024;
            let mut out = Vec::new();
            let mut buf = vec![0u8; SEGMENT_SIZE as usize];
            loop {
                let mut actual_length: u16 = 0;
                let mut segment_status: ISC_STATUS_ARRAY = [0; 20];
                let rc = unsafe {
                    sys::isc_get_segment(
                        segment_status.as_mut_ptr(),
                        &mut blob_handle,
                        &mut actual_length,
                        SEGMENT_SIZE,
                        buf.as_mut_ptr() as *mut c_char,
                    )
                };
                out.extend_from_slice(&buf[..actual_length as usize]);

                if rc == sys::ISC_SEGSTR_EOF {
                    break;
                }
                if rc != 0 && rc != sys::ISC_SEGMENT && crate::status::is_error(&segment_status) {
                    unsafe { sys::isc_close_blob(segment_status.as_mut_ptr(), &mut blob_handle) };
                    return Err(Error::new(ErrorKind::BlobIo, crate::status::interpret(&segment_status)));
                }
                if rc == 0 && actual_length < SEGMENT_SIZE {
                    break;
                }
            }

            let mut close_status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_close_blob(close_status.as_mut_ptr(), &mut blob_handle) };
            crate::status::check(&close_status, ErrorKind::BlobIo)?;
            Ok(out)
        })
    }

    /// Writes `bytes` as a brand-new server-side BLOB in 32 KiB segments, returning
    /// its identifier. Firebird BLOBs are write-once: there is no in-place update, so
    /// every [`crate::blob::FbBlob::save`] and every BLOB parameter bind creates a
    /// fresh one.
    pub(crate) fn write_blob(&self, bytes: &[u8]) -> Result<ISC_QUAD> {
        self.with_handles(|db, tr| {
            let mut status: ISC_STATUS_ARRAY = [0; 20];
            let mut blob_handle: sys::isc_blob_handle = 0;
            let mut blob_id = ISC_QUAD {
                gds_quad_high: 0,
                gds_quad_low: 0,
            };
            unsafe {
                sys::isc_create_blob2(
                    status.as_mut_ptr(),
                    db,
                    tr,
                    &mut blob_handle,
                    &mut blob_id,
                    0,
                    std::ptr::null(),
                )
            };
            crate::status::check(&status, ErrorKind::BlobIo)?;

            const SEGMENT_SIZE: usize = 32 * 1024;
            for chunk in bytes.chunks(SEGMENT_SIZE) {
                let mut put_status: ISC_STATUS_ARRAY = [0; 20];
                unsafe {
                    sys::isc_put_segment(
                        put_status.as_mut_ptr(),
                        &mut blob_handle,
                        chunk.len() as u16,
                        chunk.as_ptr() as *const c_char,
                    )
                };
                if crate::status::is_error(&put_status) {
                    unsafe { sys::isc_close_blob(put_status.as_mut_ptr(), &mut blob_handle) };
                    return Err(Error::new(ErrorKind::BlobIo, crate::status::interpret(&put_status)));
                }
            }

            let mut close_status: ISC_STATUS_ARRAY = [0; 20];
            unsafe { sys::isc_close_blob(close_status.as_mut_ptr(), &mut blob_handle) };
            crate::status::check(&close_status, ErrorKind::BlobIo)?;
            Ok(blob_id)
        })
    }

    pub(crate) fn register_result_set(&self, result_set: &Arc<FbResultSetShared>) {
        self.result_sets.register(Arc::downgrade(result_set));
    }
}
