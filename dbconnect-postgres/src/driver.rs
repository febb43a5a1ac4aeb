use std::collections::HashMap;
use std::sync::Arc;

use dbconnect_core::connection::Connection;
use dbconnect_core::driver::{Capabilities, Driver};
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::url;

use crate::connection::PgConnection;
use crate::{DEFAULT_PORT, SCHEME};

/// The PostgreSQL entry point: turns a `dbconnect:postgresql://...` URL into a
/// [`PgConnection`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PgDriver;

impl PgDriver {
    pub fn new() -> Self {
        PgDriver
    }
}

impl Driver for PgDriver {
    fn name(&self) -> &str {
        SCHEME
    }

    fn accepts_url(&self, url: &str) -> bool {
        url::accepts_scheme(url, SCHEME)
    }

    fn connect(&self, url: &str, properties: &HashMap<String, String>) -> Result<Arc<dyn Connection>> {
        let connection = PgConnection::connect(url, properties)?;
        Ok(connection)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_server_side_cursors: false,
            supports_savepoints: false,
        }
    }

    /// Only `"create_database"` is supported — unlike Firebird, libpq has no
    /// pre-connection "create this database" call; it has to be done by connecting to
    /// an existing maintenance database (`postgres`) on the same server and running
    /// `CREATE DATABASE` as ordinary SQL.
    fn command(&self, name: &str, properties: &HashMap<String, String>) -> Result<()> {
        if name != "create_database" {
            return Err(Error::new(
                ErrorKind::UnknownCommand,
                format!("unknown driver command: {name:?}"),
            ));
        }

        let target_url = properties
            .get("url")
            .ok_or_else(|| Error::new(ErrorKind::BadArgs, "create_database requires a \"url\" property"))?;
        let parsed = url::parse(target_url, SCHEME)?;

        let authority = match (&parsed.host, parsed.port) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.clone(),
            (None, _) => format!("localhost:{DEFAULT_PORT}"),
        };
        let maintenance_url = format!("dbconnect:{SCHEME}://{authority}/postgres");

        let mut maintenance_properties = properties.clone();
        maintenance_properties.remove("url");

        let connection = PgConnection::connect(&maintenance_url, &maintenance_properties)?;
        let result = connection.execute_update(&format!("CREATE DATABASE {}", quote_identifier(&parsed.database)));
        connection.close();
        result.map(|_| ())
    }
}

/// Double-quotes a PostgreSQL identifier, doubling any embedded quote.
fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_its_own_scheme() {
        let driver = PgDriver::new();
        assert!(driver.accepts_url("dbconnect:postgresql://host/db"));
        assert!(!driver.accepts_url("dbconnect:firebird://host/db"));
    }

    #[test]
    fn quote_identifier_doubles_embedded_quotes() {
        assert_eq!(quote_identifier("app"), "\"app\"");
        assert_eq!(quote_identifier(r#"weird"name"#), "\"weird\"\"name\"");
    }
}
