use std::cell::Cell;
use std::ffi::CStr;

use dbconnect_core::blob::Blob;
use dbconnect_core::error::{Error, ErrorKind, Result};
use dbconnect_core::result_set::{find_column_by_name, ResultSet};

use crate::blob::{from_hex_literal, PgBlob};
use crate::connection::result_error_message;
use crate::dates::{parse_date, parse_time, parse_timestamp};

/// A fully-fetched row set: every row `PQexec`/`PQexecPrepared` returned is pulled out
/// of the `PGresult*` and copied into this struct before it's ever handed to a caller,
/// so `PQclear` runs immediately and this result set has no lifetime tie back to the
/// connection — unlike the cursor driver's.
pub struct PgResultSet {
    column_names: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    position: Option<usize>,
    last_was_null: Cell<bool>,
    closed: bool,
}

impl PgResultSet {
    /// Takes ownership of `res`, materialising its rows (or erroring out) and always
    /// calling `PQclear` before returning — the caller never needs to clear `res`
    /// itself, success or failure.
    pub(crate) fn from_raw_result(res: *mut pq_sys::PGresult) -> Result<Box<dyn ResultSet>> {
        if res.is_null() {
            return Err(Error::new(ErrorKind::ExecFailed, "libpq returned a null result"));
        }

        let status = unsafe { pq_sys::PQresultStatus(res) };
        if status != pq_sys::PGRES_TUPLES_OK && status != pq_sys::PGRES_COMMAND_OK {
            let message = result_error_message(res);
            unsafe { pq_sys::PQclear(res) };
            return Err(Error::new(ErrorKind::ExecFailed, message));
        }

        if status == pq_sys::PGRES_COMMAND_OK {
            unsafe { pq_sys::PQclear(res) };
            return Ok(Box::new(PgResultSet {
                column_names: Vec::new(),
                rows: Vec::new(),
                position: None,
                last_was_null: Cell::new(false),
                closed: false,
            }));
        }

        let nfields = unsafe { pq_sys::PQnfields(res) };
        let ntuples = unsafe { pq_sys::PQntuples(res) };

        let mut column_names = Vec::with_capacity(nfields.max(0) as usize);
        for col in 0..nfields {
            let name_ptr = unsafe { pq_sys::PQfname(res, col) };
            let name = if name_ptr.is_null() {
                String::new()
            } else {
                unsafe { CStr::from_ptr(name_ptr) }.to_string_lossy().into_owned()
            };
            column_names.push(name);
        }

        let mut rows = Vec::with_capacity(ntuples.max(0) as usize);
        for row in 0..ntuples {
            let mut values = Vec::with_capacity(nfields.max(0) as usize);
            for col in 0..nfields {
                let is_null = unsafe { pq_sys::PQgetisnull(res, row, col) } != 0;
                if is_null {
                    values.push(None);
                    continue;
                }
                let ptr = unsafe { pq_sys::PQgetvalue(res, row, col) };
                let len = unsafe { pq_sys::PQgetlength(res, row, col) };
                let bytes = unsafe { std::slice::from_raw_parts(ptr as *const u8, len.max(0) as usize) };
                values.push(Some(String::from_utf8_lossy(bytes).into_owned()));
            }
            rows.push(values);
        }

        unsafe { pq_sys::PQclear(res) };

        Ok(Box::new(PgResultSet {
            column_names,
            rows,
            position: None,
            last_was_null: Cell::new(false),
            closed: false,
        }))
    }

    fn current_value(&self, index: i32) -> Result<Option<String>> {
        let count = self.column_names.len();
        if index < 1 || index as usize > count {
            return Err(Error::column_index(index, count));
        }
        let row_index = self
            .position
            .filter(|&i| i < self.rows.len())
            .ok_or_else(|| Error::new(ErrorKind::ExecFailed, "result set is not positioned on a row"))?;
        Ok(self.rows[row_index][(index - 1) as usize].clone())
    }
}

impl ResultSet for PgResultSet {
    fn next(&mut self) -> Result<bool> {
        let next_index = match self.position {
            None => 0,
            Some(i) => i + 1,
        };
        if next_index >= self.rows.len() {
            self.position = Some(self.rows.len());
            return Ok(false);
        }
        self.position = Some(next_index);
        Ok(true)
    }

    fn get_string(&mut self, index: i32) -> Result<String> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        Ok(value.unwrap_or_default())
    }

    fn get_int(&mut self, index: i32) -> Result<i32> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(0),
            Some(text) => text
                .trim()
                .parse()
                .map_err(|_| Error::new(ErrorKind::Convert, format!("not an integer: {text:?}"))),
        }
    }

    fn get_long(&mut self, index: i32) -> Result<i64> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(0),
            Some(text) => text
                .trim()
                .parse()
                .map_err(|_| Error::new(ErrorKind::Convert, format!("not a long: {text:?}"))),
        }
    }

    fn get_double(&mut self, index: i32) -> Result<f64> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(0.0),
            Some(text) => text
                .trim()
                .parse()
                .map_err(|_| Error::new(ErrorKind::Convert, format!("not a double: {text:?}"))),
        }
    }

    fn get_boolean(&mut self, index: i32) -> Result<bool> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(false),
            Some(text) => match text.as_str() {
                "t" | "true" | "TRUE" | "True" | "1" => Ok(true),
                "f" | "false" | "FALSE" | "False" | "0" => Ok(false),
                other => Err(Error::new(ErrorKind::Convert, format!("not a boolean: {other:?}"))),
            },
        }
    }

    fn get_date(&mut self, index: i32) -> Result<i32> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(0),
            Some(text) => parse_date(&text),
        }
    }

    fn get_timestamp(&mut self, index: i32) -> Result<i64> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(0),
            Some(text) => parse_timestamp(&text),
        }
    }

    fn get_time(&mut self, index: i32) -> Result<i64> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        match value {
            None => Ok(0),
            Some(text) => parse_time(&text),
        }
    }

    fn get_blob(&mut self, index: i32) -> Result<Box<dyn Blob>> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        let bytes = value.map(|text| from_hex_literal(&text)).unwrap_or_default();
        Ok(Box::new(PgBlob::from_bytes(bytes)))
    }

    fn get_bytes(&mut self, index: i32) -> Result<Vec<u8>> {
        let value = self.current_value(index)?;
        self.last_was_null.set(value.is_none());
        Ok(value.map(|text| from_hex_literal(&text)).unwrap_or_default())
    }

    fn was_null(&self) -> bool {
        self.last_was_null.get()
    }

    fn is_before_first(&self) -> bool {
        self.position.is_none()
    }

    fn is_after_last(&self) -> bool {
        self.position == Some(self.rows.len())
    }

    fn get_row(&self) -> u64 {
        match self.position {
            None => 0,
            Some(i) if i < self.rows.len() => (i + 1) as u64,
            Some(_) => self.rows.len() as u64,
        }
    }

    fn column_count(&self) -> i32 {
        self.column_names.len() as i32
    }

    fn column_name(&self, index: i32) -> Result<String> {
        let count = self.column_names.len();
        if index < 1 || index as usize > count {
            return Err(Error::column_index(index, count));
        }
        Ok(self.column_names[(index - 1) as usize].clone())
    }

    fn find_column(&self, name: &str) -> Result<i32> {
        find_column_by_name(&self.column_names, name).ok_or_else(|| Error::column_not_found(name))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rows.clear();
        self.column_names.clear();
        self.position = None;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> PgResultSet {
        PgResultSet {
            column_names: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec![Some("1".to_string()), Some("alice".to_string())],
                vec![Some("2".to_string()), None],
            ],
            position: None,
            last_was_null: Cell::new(false),
            closed: false,
        }
    }

    #[test]
    fn position_reporting_tracks_next() {
        let mut rs = fixture();
        assert!(rs.is_before_first());
        assert_eq!(rs.get_row(), 0);

        assert!(rs.next().unwrap());
        assert!(!rs.is_before_first());
        assert!(!rs.is_after_last());
        assert_eq!(rs.get_row(), 1);

        assert!(rs.next().unwrap());
        assert_eq!(rs.get_row(), 2);

        assert!(!rs.next().unwrap());
        assert!(rs.is_after_last());
        assert_eq!(rs.get_row(), 2);
    }

    #[test]
    fn find_column_is_case_sensitive() {
        let rs = fixture();
        assert_eq!(rs.find_column("name").unwrap(), 2);
        assert!(rs.find_column("Name").is_err());
    }

    #[test]
    fn null_getters_return_type_defaults() {
        let mut rs = fixture();
        rs.next().unwrap();
        rs.next().unwrap();
        assert_eq!(rs.get_string(2).unwrap(), "");
        assert!(rs.was_null());
        assert_eq!(rs.get_int(2).unwrap(), 0);
        assert_eq!(rs.get_bytes(2).unwrap(), Vec::<u8>::new());
    }
}
