use std::collections::HashMap;

use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::url::parse;

use crate::{DEFAULT_PORT, SCHEME};

/// Default value for libpq's `client_encoding` conninfo key, used for the
/// driver-honoured `charset` option.
const DEFAULT_CHARSET: &str = "UTF8";

/// Default value for libpq's `gssencmode` conninfo key.
const DEFAULT_GSSENCMODE: &str = "disable";

/// Builds the `key=value ...` string `PQconnectdb` expects out of a connection URL and
/// a property bag (user, password, and anything else the caller wants to pass through
/// verbatim).
///
/// `charset` is translated to libpq's own `client_encoding` key (defaulting to UTF8);
/// `gssencmode` is passed through as-is, defaulting to `disable` when the caller
/// doesn't supply it — both connect options this driver honours explicitly.
pub fn build_conninfo(url: &str, properties: &HashMap<String, String>) -> Result<String> {
    let parsed = parse(url, SCHEME)?;

    let mut parts = Vec::new();
    if let Some(host) = &parsed.host {
        parts.push(format!("host={}", escape(host)));
    }
    parts.push(format!("port={}", parsed.port.unwrap_or(DEFAULT_PORT)));
    parts.push(format!("dbname={}", escape(&parsed.database)));

    let charset = properties.get("charset").map(String::as_str).unwrap_or(DEFAULT_CHARSET);
    parts.push(format!("client_encoding={}", escape(charset)));

    let gssencmode = properties
        .get("gssencmode")
        .map(String::as_str)
        .unwrap_or(DEFAULT_GSSENCMODE);
    parts.push(format!("gssencmode={}", escape(gssencmode)));

    for (key, value) in properties {
        if key.is_empty() || key == "charset" || key == "gssencmode" {
            continue;
        }
        if !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(Error::new(
                ErrorKind::BadArgs,
                format!("invalid connection property name: {key:?}"),
            ));
        }
        parts.push(format!("{key}={}", escape(value)));
    }

    Ok(parts.join(" "))
}

/// Quotes a conninfo value per libpq's `key = 'value'` grammar, escaping embedded
/// backslashes and quotes.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('\'');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_host_port_database() {
        let mut props = HashMap::new();
        props.insert("user".to_string(), "app".to_string());
        props.insert("password".to_string(), "s3cr3t".to_string());
        let conninfo = build_conninfo("dbconnect:postgresql://db.example:6543/app", &props).unwrap();
        assert!(conninfo.contains("host='db.example'"));
        assert!(conninfo.contains("port=6543"));
        assert!(conninfo.contains("dbname='app'"));
        assert!(conninfo.contains("user='app'"));
        assert!(conninfo.contains("password='s3cr3t'"));
    }

    #[test]
    fn defaults_the_port_when_missing() {
        let conninfo = build_conninfo("dbconnect:postgresql://db.example/app", &HashMap::new()).unwrap();
        assert!(conninfo.contains("port=5432"));
    }

    #[test]
    fn defaults_charset_and_gssencmode_when_not_supplied() {
        let conninfo = build_conninfo("dbconnect:postgresql://db.example/app", &HashMap::new()).unwrap();
        assert!(conninfo.contains("client_encoding='UTF8'"));
        assert!(conninfo.contains("gssencmode='disable'"));
    }

    #[test]
    fn translates_charset_property_to_client_encoding() {
        let mut props = HashMap::new();
        props.insert("charset".to_string(), "LATIN1".to_string());
        props.insert("gssencmode".to_string(), "require".to_string());
        let conninfo = build_conninfo("dbconnect:postgresql://db.example/app", &props).unwrap();
        assert!(conninfo.contains("client_encoding='LATIN1'"));
        assert!(conninfo.contains("gssencmode='require'"));
        assert!(!conninfo.contains("charset="));
    }

    #[test]
    fn escapes_embedded_quotes() {
        let mut props = HashMap::new();
        props.insert("password".to_string(), "a'b\\c".to_string());
        let conninfo = build_conninfo("dbconnect:postgresql://db.example/app", &props).unwrap();
        assert!(conninfo.contains(r"password='a\'b\\c'"));
    }

    #[test]
    fn rejects_unsafe_property_names() {
        let mut props = HashMap::new();
        props.insert("user=x sslmode".to_string(), "disable".to_string());
        let err = build_conninfo("dbconnect:postgresql://db.example/app", &props).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadArgs);
    }
}
