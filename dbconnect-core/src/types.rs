/// The closed set of SQL types a caller can hint with in `set_null`.
///
/// This enum exists solely to steer the server-side type the driver should use when
/// binding a NULL parameter — there is no bytes payload to infer a type from, so the
/// caller must say what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Types {
    Integer,
    Long,
    Float,
    Double,
    Varchar,
    Date,
    Timestamp,
    Time,
    Boolean,
    Blob,
    Null,
}

/// The closed set of transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Parses the string the materialised driver gets back from `SHOW transaction_isolation`.
    pub fn from_postgres_setting(value: &str) -> Option<Self> {
        match value {
            "read uncommitted" => Some(IsolationLevel::ReadUncommitted),
            "read committed" => Some(IsolationLevel::ReadCommitted),
            "repeatable read" => Some(IsolationLevel::RepeatableRead),
            "serializable" => Some(IsolationLevel::Serializable),
            _ => None,
        }
    }

    pub fn to_postgres_sql(self) -> &'static str {
        match self {
            IsolationLevel::None => "READ COMMITTED",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_level_round_trips_through_postgres_strings() {
        for level in [
            IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable,
        ] {
            let sql = level.to_postgres_sql();
            let reparsed = IsolationLevel::from_postgres_setting(&sql.to_lowercase());
            assert_eq!(reparsed, Some(level));
        }
    }
}
