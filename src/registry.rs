//! Picks the right [`Driver`] for a URL among whichever driver crates this build was
//! compiled with. Not a process-wide `DriverManager` — there is no global mutable
//! registration table here, just a lookup over the drivers the enabled features
//! compiled in.

use dbconnect_core::driver::Driver;
use dbconnect_core::error::{Error, ErrorKind, Result};

/// Returns the driver whose [`Driver::accepts_url`] matches `url`, among the drivers
/// enabled by this build's Cargo features.
///
/// `postgres`/`firebird` features off entirely omit that driver from the search, not
/// just its ability to connect — a build with neither feature enabled always returns
/// [`ErrorKind::UnknownCommand`] regardless of the URL given.
pub fn lookup_driver(url: &str) -> Result<Box<dyn Driver>> {
    #[cfg(feature = "postgres")]
    {
        let driver = dbconnect_postgres::PgDriver::new();
        if driver.accepts_url(url) {
            return Ok(Box::new(driver));
        }
    }

    #[cfg(feature = "firebird")]
    {
        let driver = dbconnect_firebird::FbDriver::new();
        if driver.accepts_url(url) {
            return Ok(Box::new(driver));
        }
    }

    let _ = url;
    Err(Error::new(
        ErrorKind::UnknownCommand,
        format!("no enabled driver accepts this URL: {url:?}"),
    ))
}

#[cfg(all(test, feature = "postgres"))]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_postgres_url_to_the_postgres_driver() {
        let driver = lookup_driver("dbconnect:postgresql://localhost/app").unwrap();
        assert_eq!(driver.name(), "postgresql");
    }

    #[test]
    fn rejects_a_url_no_enabled_driver_accepts() {
        assert!(lookup_driver("dbconnect:unknownvendor://localhost/app").is_err());
    }
}
