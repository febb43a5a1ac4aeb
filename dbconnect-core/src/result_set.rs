use crate::blob::Blob;
use crate::error::Result;
use crate::io::input_stream::InputStream;

/// A cursor over the rows produced by a query.
///
/// Two distinct implementations back this trait: a materialised result set (all rows
/// fetched up front, `next()` just advances an index) and a server-side cursor result
/// set (`next()` issues a fetch against the connection's open transaction). Both share
/// this contract so calling code never needs to know which one it holds.
///
/// Column indices are 1-based. A getter on a NULL column returns the type's default
/// (`0`, `0.0`, `false`, `""`) rather than an error — callers that need to distinguish
/// NULL from a real default value must call [`ResultSet::was_null`] immediately after.
pub trait ResultSet: Send {
    /// Advances to the next row. Returns `false` once exhausted; the result set is
    /// positioned before the first row until the first call.
    fn next(&mut self) -> Result<bool>;

    fn get_string(&mut self, index: i32) -> Result<String>;

    fn get_int(&mut self, index: i32) -> Result<i32>;

    fn get_long(&mut self, index: i32) -> Result<i64>;

    fn get_double(&mut self, index: i32) -> Result<f64>;

    fn get_boolean(&mut self, index: i32) -> Result<bool>;

    /// Days since the epoch.
    fn get_date(&mut self, index: i32) -> Result<i32>;

    /// Microseconds since the epoch.
    fn get_timestamp(&mut self, index: i32) -> Result<i64>;

    /// Microseconds since midnight (time-of-day only).
    fn get_time(&mut self, index: i32) -> Result<i64>;

    fn get_blob(&mut self, index: i32) -> Result<Box<dyn Blob>>;

    /// Raw column bytes, decoded independently of any `Blob` wrapper. On NULL,
    /// returns an empty vector (see the getter/NULL table in the component design).
    fn get_bytes(&mut self, index: i32) -> Result<Vec<u8>>;

    /// A stream over a copy of the column's raw bytes. On NULL, returns an empty
    /// stream rather than erroring.
    fn get_binary_stream(&mut self, index: i32) -> Result<InputStream> {
        Ok(InputStream::new(self.get_bytes(index)?))
    }

    /// `true` if the most recently fetched column (by either index or name) was SQL
    /// NULL. Only meaningful immediately after a getter call.
    fn was_null(&self) -> bool;

    /// `true` before the first call to [`ResultSet::next`] has been made.
    fn is_before_first(&self) -> bool;

    /// `true` once [`ResultSet::next`] has returned `false`.
    fn is_after_last(&self) -> bool;

    /// The 1-based number of the row currently positioned on, or the total row count
    /// once [`ResultSet::is_after_last`] is true. `0` before the first row.
    fn get_row(&self) -> u64;

    fn column_count(&self) -> i32;

    /// The alias-preferred display name of the given 1-based column.
    fn column_name(&self, index: i32) -> Result<String>;

    /// Resolves a column name to its 1-based index (case-sensitive exact match,
    /// aliased names preferred over raw column names for the cursor driver).
    fn find_column(&self, name: &str) -> Result<i32>;

    /// Releases the result set's resources (and, for the cursor driver, closes the
    /// server-side cursor it was fetching through). Idempotent; never fails.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Case-sensitive exact-match linear scan shared by both drivers' `find_column`
/// implementations — neither driver's catalog is large enough to warrant an index.
/// Column lookup by name is a case-sensitive exact match; callers that want
/// case-insensitive lookup must normalise the name themselves before calling this.
pub fn find_column_by_name(names: &[String], name: &str) -> Option<i32> {
    names
        .iter()
        .position(|candidate| candidate == name)
        .map(|pos| (pos + 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_column_by_name_is_case_sensitive() {
        let names = vec!["Id".to_string(), "Full_Name".to_string()];
        assert_eq!(find_column_by_name(&names, "Full_Name"), Some(2));
        assert_eq!(find_column_by_name(&names, "full_name"), None);
        assert_eq!(find_column_by_name(&names, "FULL_NAME"), None);
        assert_eq!(find_column_by_name(&names, "missing"), None);
    }
}
