//! `dbconnect`: a uniform JDBC-style access layer over native relational-database
//! client libraries.
//!
//! This crate is a thin facade: it re-exports the driver runtime from
//! [`dbconnect_core`] and whichever concrete driver crates are enabled via the
//! `postgres`/`firebird` Cargo features. There is no process-wide `DriverManager`
//! registry here — that's an external collaborator — but [`registry::lookup_driver`]
//! covers the common case of picking the right [`Driver`] for a URL among whichever
//! drivers this build was compiled with.

pub use dbconnect_core::{
    Blob, Capabilities, Connection, Driver, Error, ErrorKind, IsolationLevel, MemoryBlob,
    OutputStream, PreparedStatement, Result, ResultSet, Types,
};

#[cfg(feature = "postgres")]
pub use dbconnect_postgres::{PgBlob, PgConnection, PgDriver, PgPreparedStatement, PgResultSet};

#[cfg(feature = "firebird")]
pub use dbconnect_firebird::{FbBlob, FbConnection, FbDriver, FbPreparedStatement, FbResultSet};

pub mod registry;
