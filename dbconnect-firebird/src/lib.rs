//! Firebird `isc_*` client API driver: the server-side cursor half of `dbconnect`.
//!
//! Every statement and result set derived from a [`connection::FbConnection`] shares
//! that connection's recursive mutex — Firebird ties a cursor to the
//! transaction that opened it, so there is no profit in letting two operations on one
//! attachment interleave, and the teardown chain (`commit` closing cursors closing
//! themselves) needs the reentrancy a plain mutex can't give it.

mod blob;
mod connection;
mod dates;
mod dpb;
mod driver;
mod infobuf;
mod result_set;
mod statement;
mod status;
mod sys;
mod tpb;
mod xsqlda;

pub use blob::FbBlob;
pub use connection::FbConnection;
pub use driver::FbDriver;
pub use result_set::FbResultSet;
pub use statement::FbPreparedStatement;

/// The URL scheme this driver answers to: `dbconnect:firebird://host:port/database`
/// or `dbconnect:firebird:///path/to/database.fdb`.
pub const SCHEME: &str = "firebird";

/// Firebird's default `isc_*` service port, used when a connection URL doesn't
/// specify one.
pub const DEFAULT_PORT: u16 = 3050;
