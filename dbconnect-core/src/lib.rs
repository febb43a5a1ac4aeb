//! Driver-agnostic runtime shared by `dbconnect`'s relational-database drivers.
//!
//! This crate has no vendor client library dependency of its own; it defines the
//! `Driver`/`Connection`/`PreparedStatement`/`ResultSet`/`Blob` contract the
//! `dbconnect-postgres` and `dbconnect-firebird` crates implement, plus the small
//! amount of plumbing (error type, weak-reference child registry, URL grammar, DDL
//! sniffing) that's identical across both rather than duplicated in each.

pub mod blob;
pub mod common;
pub mod connection;
pub mod driver;
pub mod error;
pub mod io;
pub mod registry;
pub mod result_set;
pub mod statement;
pub mod types;
pub mod url;

pub use blob::{Blob, MemoryBlob};
pub use connection::Connection;
pub use driver::{Capabilities, Driver};
pub use error::{Error, ErrorKind, Result};
pub use io::byte_buffer::ByteBuffer;
pub use io::input_stream::InputStream;
pub use io::output_stream::OutputStream;
pub use registry::Registry;
pub use result_set::ResultSet;
pub use statement::PreparedStatement;
pub use types::{IsolationLevel, Types};
