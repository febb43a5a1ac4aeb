use dbconnect_core::blob::Blob;
use dbconnect_core::error::Result;
use dbconnect_core::io::byte_buffer::ByteBuffer;

/// A `BYTEA` column's value.
///
/// Unlike the cursor driver's blob, this one holds no server-side handle: libpq
/// decodes the whole column value (hex or legacy-escape format, `PQgetvalue` already
/// handed us the unescaped bytes) at fetch time, so there's nothing left to lazily
/// load.
#[derive(Debug, Default, Clone)]
pub struct PgBlob {
    buffer: ByteBuffer,
}

impl PgBlob {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        PgBlob {
            buffer: ByteBuffer::from_vec(bytes),
        }
    }
}

impl Blob for PgBlob {
    fn length(&self) -> Result<u64> {
        Ok(self.buffer.len() as u64)
    }

    fn get_bytes(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        Ok(self.buffer.get_range(offset as usize, length as usize).to_vec())
    }

    fn set_bytes(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.buffer.set_range(offset as usize, bytes);
        Ok(())
    }

    fn truncate(&mut self, length: u64) -> Result<()> {
        self.buffer.truncate(length as usize);
        Ok(())
    }

    fn free(&mut self) {
        self.buffer = ByteBuffer::new();
    }
}

/// Encodes `bytes` as a PostgreSQL hex-format `bytea` literal body (without the
/// surrounding quotes) — the text-format parameter encoding this driver binds `BLOB`
/// parameters with.
pub fn to_hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str(r"\x");
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Decodes a `PQgetvalue` text-format `bytea` column (`\x`-prefixed hex, the format
/// every server since PostgreSQL 9.0 defaults to) back into raw bytes.
///
/// Falls back to treating the value as already-raw bytes if it doesn't carry the `\x`
/// prefix — older servers configured with `bytea_output = escape` emit backslash-octal
/// escapes instead, which this driver does not decode; querying `bytea_output` isn't
/// worth the extra round trip for a format PostgreSQL has defaulted away from for over
/// a decade.
pub fn from_hex_literal(text: &str) -> Vec<u8> {
    let Some(hex) = text.strip_prefix(r"\x") else {
        return text.as_bytes().to_vec();
    };
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    let mut chars = hex.chars();
    while let (Some(hi), Some(lo)) = (chars.next(), chars.next()) {
        if let (Some(hi), Some(lo)) = (hi.to_digit(16), lo.to_digit(16)) {
            bytes.push(((hi << 4) | lo) as u8);
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_literal_round_trips() {
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let literal = to_hex_literal(&bytes);
        assert_eq!(literal, r"\xdeadbeef");
        assert_eq!(from_hex_literal(&literal), bytes);
    }

    #[test]
    fn empty_bytes_round_trip() {
        assert_eq!(to_hex_literal(&[]), r"\x");
        assert_eq!(from_hex_literal(r"\x"), Vec::<u8>::new());
    }
}
