use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::Result;

/// What a driver's underlying vendor client supports, queried so that shared
/// Connection-adjacent code (and callers) can branch on capability rather than on
/// driver identity.
///
/// Promoted out of the scattered `if` branches the two drivers would otherwise need
/// (e.g. DDL-invalidation handling only matters where statements hold server-side
/// metadata locks) into one queryable struct per driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether `ResultSet`s from this driver stream rows from an open server-side
    /// cursor (Firebird) rather than a fully materialised row set (PostgreSQL).
    pub supports_server_side_cursors: bool,
    /// Whether the vendor client exposes savepoints. Neither current driver does;
    /// this is here so a future driver can report it without a trait change.
    pub supports_savepoints: bool,
}

/// A registered database driver: the entry point that turns a connection URL into a
/// live [`Connection`].
///
/// Mirrors the JDBC `java.sql.Driver` shape rather than a full `DriverManager` — this
/// crate does not maintain a process-wide registry of drivers callers can look up by
/// URL alone (see the `dbconnect` facade crate for the small lookup table it builds
/// over the drivers its features enable).
pub trait Driver: Send + Sync {
    /// Short, stable identifier used in the connection URL scheme (e.g. `"postgresql"`,
    /// `"firebird"`) and in log targets.
    fn name(&self) -> &str;

    /// Whether this driver recognises `url` as one of its own.
    fn accepts_url(&self, url: &str) -> bool;

    /// Opens a new connection. `properties` carries driver-specific options (user,
    /// password, and anything else a particular driver needs) that don't belong in the
    /// URL grammar.
    fn connect(&self, url: &str, properties: &HashMap<String, String>) -> Result<Arc<dyn Connection>>;

    /// Runs a one-shot administrative command that doesn't go through a connection at
    /// all — currently only database creation (`CREATE DATABASE`), which both backing
    /// libraries expose as a pre-connection operation rather than SQL run against an
    /// existing session.
    fn command(&self, name: &str, properties: &HashMap<String, String>) -> Result<()>;

    /// What this driver's vendor client supports. Defaults to "neither" so a minimal
    /// driver implementation isn't forced to think about capabilities it doesn't have.
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_server_side_cursors: false,
            supports_savepoints: false,
        }
    }
}

/// Runs `register` exactly once per process, regardless of how many times this is
/// called — the pattern both drivers use for their `register()` entry point, since a
/// driver only needs to do process-wide setup (e.g. initialising its vendor client
/// library) the first time it's loaded.
pub fn register_once(once: &std::sync::Once, register: impl FnOnce()) {
    once.call_once(register);
}
