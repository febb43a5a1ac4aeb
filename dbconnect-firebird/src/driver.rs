use std::collections::HashMap;
use std::ffi::CString;
use std::sync::Arc;

use dbconnect_core::connection::Connection;
use dbconnect_core::driver::{Capabilities, Driver};
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::url;

use crate::connection::FbConnection;
use crate::dpb::{DpbBuilder, SQL_DIALECT};
use crate::sys::{self, isc_db_handle, ISC_STATUS_ARRAY};
use crate::{DEFAULT_PORT, SCHEME};

const DEFAULT_PAGE_SIZE: i32 = 4096;
const DEFAULT_CHARSET: &str = "UTF8";

/// The Firebird entry point: turns a `dbconnect:firebird://...` URL into a
/// [`FbConnection`], and (unlike the PostgreSQL driver) can create a new database
/// directly via `isc_create_database` — there's no maintenance-database indirection
/// needed for a file-based server.
#[derive(Debug, Default, Clone, Copy)]
pub struct FbDriver;

impl FbDriver {
    pub fn new() -> Self {
        FbDriver
    }
}

impl Driver for FbDriver {
    fn name(&self) -> &str {
        SCHEME
    }

    fn accepts_url(&self, url: &str) -> bool {
        url::accepts_scheme(url, SCHEME)
    }

    fn connect(&self, url: &str, properties: &HashMap<String, String>) -> Result<Arc<dyn Connection>> {
        let connection = FbConnection::connect(url, properties)?;
        Ok(connection)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_server_side_cursors: true,
            supports_savepoints: false,
        }
    }

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

        let user = properties
            .get("user")
            .ok_or_else(|| Error::new(ErrorKind::BadArgs, "create_database requires a \"user\" property"))?;
        let password = properties
            .get("password")
            .ok_or_else(|| Error::new(ErrorKind::BadArgs, "create_database requires a \"password\" property"))?;
        let charset = properties.get("charset").map(String::as_str).unwrap_or(DEFAULT_CHARSET);
        let page_size = properties
            .get("page_size")
            .map(|v| v.parse::<i32>())
            .transpose()
            .map_err(|_| Error::new(ErrorKind::BadArgs, "page_size must be an integer"))?
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let db_name = match &parsed.host {
            Some(host) => format!("{host}/{}:{}", parsed.port.unwrap_or(DEFAULT_PORT), parsed.database),
            None => parsed.database.clone(),
        };
        let c_db_name = CString::new(db_name)
            .map_err(|_| Error::new(ErrorKind::BadArgs, "database name contains an embedded NUL"))?;

        let dpb = DpbBuilder::new()
            .user_name(user)
            .password(password)
            .set_db_charset(charset)
            .page_size(page_size)
            .sql_dialect(SQL_DIALECT)
            .build();

        let mut status: ISC_STATUS_ARRAY = [0; 20];
        let mut db: isc_db_handle = 0;
        unsafe {
            sys::isc_create_database(
                status.as_mut_ptr(),
                c_db_name.as_bytes().len() as i16,
                c_db_name.as_ptr(),
                &mut db,
                dpb.len() as i16,
                dpb.as_ptr() as *const libc::c_char,
                0,
            )
        };
        crate::status::check(&status, ErrorKind::ConnectFailed)?;

        let mut detach_status: ISC_STATUS_ARRAY = [0; 20];
        unsafe { sys::isc_detach_database(detach_status.as_mut_ptr(), &mut db) };
        crate::status::check(&detach_status, ErrorKind::ConnectFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_its_own_scheme() {
        let driver = FbDriver::new();
        assert!(driver.accepts_url("dbconnect:firebird://host/db.fdb"));
        assert!(!driver.accepts_url("dbconnect:postgresql://host/db"));
    }

    #[test]
    fn advertises_server_side_cursor_support() {
        let driver = FbDriver::new();
        assert!(driver.capabilities().supports_server_side_cursors);
    }

    #[test]
    fn rejects_unknown_commands() {
        let driver = FbDriver::new();
        let err = driver.command("frobnicate", &HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
    }

    #[test]
    fn create_database_requires_credentials() {
        let driver = FbDriver::new();
        let mut properties = HashMap::new();
        properties.insert("url".to_string(), "dbconnect:firebird:///tmp/new.fdb".to_string());
        let err = driver.command("create_database", &properties).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadArgs);
    }
}
