use std::sync::Arc;

use crate::error::Result;
use crate::result_set::ResultSet;
use crate::statement::PreparedStatement;
use crate::types::IsolationLevel;

/// A live session against one database.
///
/// `Connection` is the hub both driver implementations are built around: it owns the
/// underlying vendor handle (a libpq `PGconn*`, or an `isc_db_handle`/`isc_tr_handle`
/// pair), serialises access to it behind a mutex appropriate to its driver's
/// concurrency model, and tracks every [`PreparedStatement`] it has handed out so it
/// can invalidate them ahead of DDL.
///
/// Implementations are shared behind `Arc` — a statement holds a weak back-reference to
/// its owning connection, and the connection holds weak references forward to its
/// statements, so neither side keeps the other alive past its last strong holder.
pub trait Connection: Send + Sync {
    /// Precompiles `sql` against the server, returning a statement registered with this
    /// connection so it can be invalidated on a future DDL operation.
    fn prepare_statement(&self, sql: &str) -> Result<Arc<dyn PreparedStatement>>;

    /// Runs `sql` directly (no parameters, no caching) as a query.
    fn execute_query(&self, sql: &str) -> Result<Box<dyn ResultSet>>;

    /// Runs `sql` directly as an update/DDL command, returning the affected row count.
    ///
    /// A DDL prefix (`DROP`/`ALTER`/`CREATE`/`RECREATE`) triggers invalidation of every
    /// other live statement on this connection before the command runs.
    fn execute_update(&self, sql: &str) -> Result<u64>;

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()>;

    fn get_auto_commit(&self) -> Result<bool>;

    /// Starts a manual transaction. Only valid while auto-commit is off.
    fn begin_transaction(&self) -> Result<()>;

    fn transaction_active(&self) -> Result<bool>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<()>;

    fn get_transaction_isolation(&self) -> Result<IsolationLevel>;

    /// Releases the connection's server-side resources. Idempotent; never fails —
    /// failures on this path are logged, not propagated.
    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Called by an external pool before handing this connection back out to a new
    /// borrower. A cheap revalidation (`is_closed`), not a forced transaction — only
    /// [`Connection::return_to_pool`] forces the cursor driver's perpetual-transaction
    /// invariant back open.
    fn prepare_for_borrow(&self) -> Result<()> {
        if self.is_closed() {
            return Err(crate::error::Error::conn_closed());
        }
        Ok(())
    }

    /// Called by an external pool when a borrower gives this connection back. Rolls
    /// back any open work and, for drivers that require a perpetually-open transaction
    /// to serve cursor fetches, starts a fresh one.
    fn return_to_pool(&self) -> Result<()>;
}
