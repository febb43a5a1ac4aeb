use crate::blob::Blob;
use crate::error::Result;
use crate::io::input_stream::InputStream;
use crate::result_set::ResultSet;
use crate::types::Types;

/// A precompiled, parameterised SQL statement bound to one connection.
///
/// Implementations are not required to be `Clone`; a statement is meant to be held
/// behind a single `Arc` shared between the caller and the connection's registry.
/// Parameter indices are 1-based, matching the rest of this crate's column/parameter
/// numbering.
///
/// A statement can be invalidated out from under its holder — a DDL statement run on
/// the owning connection (`DROP`/`ALTER`/`CREATE`/`RECREATE`) marks every other live
/// statement invalid. Every method here must check that flag first and return
/// [`crate::error::ErrorKind::StmtInvalidated`] rather than attempt to use a stale
/// server-side handle.
pub trait PreparedStatement: Send + Sync {
    fn set_int(&self, index: i32, value: i32) -> Result<()>;

    fn set_long(&self, index: i32, value: i64) -> Result<()>;

    fn set_double(&self, index: i32, value: f64) -> Result<()>;

    fn set_string(&self, index: i32, value: &str) -> Result<()>;

    fn set_boolean(&self, index: i32, value: bool) -> Result<()>;

    /// `value` is the number of days since the epoch, matching `time::Date`'s Julian
    /// day convention as used by the drivers.
    fn set_date(&self, index: i32, value: i32) -> Result<()>;

    /// `value` is microseconds since the epoch.
    fn set_timestamp(&self, index: i32, value: i64) -> Result<()>;

    /// `value` is microseconds since midnight (time-of-day only, no date component).
    fn set_time(&self, index: i32, value: i64) -> Result<()>;

    fn set_blob(&self, index: i32, blob: &dyn Blob) -> Result<()>;

    /// Binds a raw byte string directly, with no server-side BLOB indirection unless
    /// the parameter's server type requires one (the Firebird driver promotes this to
    /// a create-then-substitute-OID BLOB when the target column is one; the
    /// PostgreSQL driver always sends it as a `bytea` literal).
    fn set_bytes(&self, index: i32, value: &[u8]) -> Result<()>;

    /// Binds the stream's entire remaining contents.
    fn set_binary_stream(&self, index: i32, stream: InputStream) -> Result<()>;

    /// Binds at most `length` bytes of the stream's remaining contents.
    fn set_binary_stream_with_length(&self, index: i32, stream: InputStream, length: u64) -> Result<()>;

    /// Binds SQL NULL; `hint` tells the driver what server-side type to bind it as,
    /// since there's no value to infer one from.
    fn set_null(&self, index: i32, hint: Types) -> Result<()>;

    /// Runs the statement as a query, returning the result set it produces.
    ///
    /// For the cursor driver the returned result set borrows the connection's shared
    /// transaction and must not outlive it; for the materialised driver the result set
    /// is fully self-contained.
    fn execute_query(&self) -> Result<Box<dyn ResultSet>>;

    /// Runs the statement as an update/DDL command, returning the affected row count.
    fn execute_update(&self) -> Result<u64>;

    /// Releases the statement's server-side resources. Idempotent; never fails.
    fn close(&self);

    fn is_closed(&self) -> bool;
}
