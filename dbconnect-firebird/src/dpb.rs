//! Database Parameter Buffer construction for `isc_attach_database`/`isc_create_database`.
//!
//! A DPB is a flat byte string: a one-byte version tag, followed by `(tag, length,
//! value)` triples. There is no struct to bind against on the Rust side — it's built
//! up with a small byte-vector builder, matching how the C client itself treats it.

const ISC_DPB_VERSION1: u8 = 1;

const ISC_DPB_PAGE_SIZE: u8 = 4;
const ISC_DPB_USER_NAME: u8 = 28;
const ISC_DPB_PASSWORD: u8 = 29;
const ISC_DPB_SQL_DIALECT: u8 = 65;
const ISC_DPB_LC_CTYPE: u8 = 48;
const ISC_DPB_SET_DB_CHARSET: u8 = 68;

/// The SQL dialect this driver always connects/creates with. Dialect 1 is Firebird's
/// legacy InterBase-compatible mode; dialect 3 is the modern one with `SQL_TYPE_DATE`/
/// `SQL_TYPE_TIME` as distinct types, which this driver's column decoding assumes.
pub const SQL_DIALECT: i32 = 3;

pub struct DpbBuilder {
    buf: Vec<u8>,
}

impl DpbBuilder {
    pub fn new() -> Self {
        DpbBuilder {
            buf: vec![ISC_DPB_VERSION1],
        }
    }

    fn push_string(&mut self, tag: u8, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(u8::MAX as usize);
        self.buf.push(tag);
        self.buf.push(len as u8);
        self.buf.extend_from_slice(&bytes[..len]);
    }

    fn push_int(&mut self, tag: u8, value: i32) {
        self.buf.push(tag);
        self.buf.push(4);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn user_name(mut self, user: &str) -> Self {
        self.push_string(ISC_DPB_USER_NAME, user);
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.push_string(ISC_DPB_PASSWORD, password);
        self
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.push_string(ISC_DPB_LC_CTYPE, charset);
        self
    }

    /// Only meaningful for `isc_create_database`; attaching to an existing database
    /// ignores it.
    pub fn set_db_charset(mut self, charset: &str) -> Self {
        self.push_string(ISC_DPB_SET_DB_CHARSET, charset);
        self
    }

    /// Only meaningful for `isc_create_database`.
    pub fn page_size(mut self, page_size: i32) -> Self {
        self.push_int(ISC_DPB_PAGE_SIZE, page_size);
        self
    }

    pub fn sql_dialect(mut self, dialect: i32) -> Self {
        self.push_int(ISC_DPB_SQL_DIALECT, dialect);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for DpbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_version_tag_then_triples() {
        let dpb = DpbBuilder::new().user_name("sysdba").password("masterkey").build();
        assert_eq!(dpb[0], ISC_DPB_VERSION1);
        assert_eq!(dpb[1], ISC_DPB_USER_NAME);
        assert_eq!(dpb[2], 6);
        assert_eq!(&dpb[3..9], b"sysdba");
        assert_eq!(dpb[9], ISC_DPB_PASSWORD);
        assert_eq!(dpb[10], 10);
        assert_eq!(&dpb[11..21], b"masterkey");
    }

    #[test]
    fn page_size_is_little_endian_four_bytes() {
        let dpb = DpbBuilder::new().page_size(8192).build();
        assert_eq!(&dpb[1..], &[ISC_DPB_PAGE_SIZE, 4, 0, 32, 0, 0]);
    }
}
