use crate::error::{Error, ErrorKind, Result};

/// The pieces extracted from a driver connection URL.
///
/// `port` is `None` when the URL didn't specify one; callers apply their own
/// driver-specific default (5432 for PostgreSQL, 3050 for Firebird).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: String,
}

/// Parses `dbconnect:<scheme>://[host[:port]]/<database>` or the local-path variant
/// `dbconnect:<scheme>:///<absolute-path>`.
///
/// URL parsing proper is an external collaborator's job, but each driver still needs
/// *a* parser to implement `Driver::connect`,
/// so this lives here as a small shared helper rather than being duplicated in both
/// driver crates.
pub fn parse(url: &str, expected_scheme: &str) -> Result<ParsedUrl> {
    let prefix = "dbconnect:";
    let rest = url
        .strip_prefix(prefix)
        .ok_or_else(|| Error::new(ErrorKind::BadUrl, format!("missing {prefix:?} prefix")))?;

    let rest = rest.strip_prefix(expected_scheme).ok_or_else(|| {
        Error::new(
            ErrorKind::BadUrl,
            format!("expected scheme {expected_scheme:?}, got {url:?}"),
        )
    })?;

    let rest = rest
        .strip_prefix("://")
        .ok_or_else(|| Error::new(ErrorKind::BadUrl, format!("malformed url: {url:?}")))?;

    // `dbconnect:<scheme>:///absolute/path` — local database file, no host/port.
    if let Some(path) = rest.strip_prefix('/') {
        if path.is_empty() {
            return Err(Error::new(ErrorKind::BadUrl, "empty database path"));
        }
        return Ok(ParsedUrl {
            host: None,
            port: None,
            database: format!("/{path}"),
        });
    }

    let (authority, database) = rest
        .split_once('/')
        .ok_or_else(|| Error::new(ErrorKind::BadUrl, format!("missing database in url: {url:?}")))?;

    if database.is_empty() {
        return Err(Error::new(ErrorKind::BadUrl, "empty database name"));
    }

    if authority.is_empty() {
        return Ok(ParsedUrl {
            host: None,
            port: None,
            database: database.to_string(),
        });
    }

    let (host, port) = match authority.split_once(':') {
        Some((host, port_str)) => {
            let port: u16 = port_str
                .parse()
                .map_err(|_| Error::new(ErrorKind::BadUrl, format!("invalid port: {port_str:?}")))?;
            (host.to_string(), Some(port))
        }
        None => (authority.to_string(), None),
    };

    Ok(ParsedUrl {
        host: Some(host),
        port,
        database: database.to_string(),
    })
}

/// Pure prefix match against a driver's URL scheme — the contract `Driver::accepts_url`
/// reduces to.
pub fn accepts_scheme(url: &str, scheme: &str) -> bool {
    url.starts_with(&format!("dbconnect:{scheme}:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port_database() {
        let parsed = parse("dbconnect:postgresql://db.example:6543/app", "postgresql").unwrap();
        assert_eq!(parsed.host.as_deref(), Some("db.example"));
        assert_eq!(parsed.port, Some(6543));
        assert_eq!(parsed.database, "app");
    }

    #[test]
    fn parses_host_without_port() {
        let parsed = parse("dbconnect:firebird://db.example/app", "firebird").unwrap();
        assert_eq!(parsed.host.as_deref(), Some("db.example"));
        assert_eq!(parsed.port, None);
        assert_eq!(parsed.database, "app");
    }

    #[test]
    fn parses_local_absolute_path() {
        let parsed = parse("dbconnect:firebird:///var/lib/firebird/app.fdb", "firebird").unwrap();
        assert_eq!(parsed.host, None);
        assert_eq!(parsed.port, None);
        assert_eq!(parsed.database, "/var/lib/firebird/app.fdb");
    }

    #[test]
    fn rejects_wrong_scheme() {
        let err = parse("dbconnect:mysql://host/db", "postgresql").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadUrl);
    }

    #[test]
    fn accepts_scheme_is_a_pure_prefix_match() {
        assert!(accepts_scheme("dbconnect:postgresql://host/db", "postgresql"));
        assert!(!accepts_scheme("dbconnect:firebird://host/db", "postgresql"));
    }
}
