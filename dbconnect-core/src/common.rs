use std::time::Duration;

/// How long a driver sleeps after freeing a server-side statement handle, to let the
/// server finish tearing it down before the connection issues its next command.
pub const STATEMENT_FREE_SETTLE_DELAY: Duration = Duration::from_millis(25);

/// How long a driver sleeps after detaching/closing a connection, for the same reason.
pub const CONNECTION_CLOSE_SETTLE_DELAY: Duration = Duration::from_millis(5);

/// Statement prefixes that make a statement DDL: running one invalidates every other
/// live prepared statement on the connection first.
const DDL_PREFIXES: &[&str] = &["DROP", "ALTER", "CREATE", "RECREATE"];

/// Whether `sql` is a DDL statement per [`DDL_PREFIXES`], ignoring leading whitespace
/// and letter case.
pub fn is_ddl_statement(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    DDL_PREFIXES
        .iter()
        .any(|prefix| trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix))
}

/// Whether `sql` is a `CREATE DATABASE`/`CREATE SCHEMA` statement, which both drivers
/// route to a dedicated pre-connection command rather than ordinary statement
/// execution.
pub fn is_create_database_statement(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    let upper_prefix: String = trimmed.chars().take(32).collect::<String>().to_ascii_uppercase();
    upper_prefix.starts_with("CREATE DATABASE") || upper_prefix.starts_with("CREATE SCHEMA")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_ddl_prefixes_case_insensitively() {
        assert!(is_ddl_statement("drop table foo"));
        assert!(is_ddl_statement("  ALTER TABLE foo ADD COLUMN bar INT"));
        assert!(is_ddl_statement("Recreate Table foo"));
        assert!(!is_ddl_statement("select * from foo"));
        assert!(!is_ddl_statement("insert into foo values (1)"));
    }

    #[test]
    fn recognises_create_database_and_schema() {
        assert!(is_create_database_statement("CREATE DATABASE 'foo.fdb'"));
        assert!(is_create_database_statement("  create schema app"));
        assert!(is_ddl_statement("CREATE DATABASE 'foo.fdb'"));
        assert!(!is_create_database_statement("CREATE TABLE foo (id int)"));
    }
}
