//! The materialised-result-set driver: wraps libpq via `pq-sys`.
//!
//! Every query this driver runs is fetched to completion by libpq before
//! [`PgPreparedStatement::execute_query`] returns — there is no server-side cursor
//! involved, so a [`result_set::PgResultSet`] has no lifetime tie to its connection's
//! transaction the way the Firebird driver's does. That's the defining difference
//! between the two drivers this workspace ships.

mod blob;
mod conninfo;
mod connection;
mod dates;
mod driver;
mod placeholders;
mod result_set;
mod statement;

pub use blob::PgBlob;
pub use connection::PgConnection;
pub use driver::PgDriver;
pub use result_set::PgResultSet;
pub use statement::PgPreparedStatement;

/// The URL scheme this driver answers to: `dbconnect:postgresql://host:port/database`.
pub const SCHEME: &str = "postgresql";

/// libpq's default port, used when a connection URL doesn't specify one.
pub const DEFAULT_PORT: u16 = 5432;
