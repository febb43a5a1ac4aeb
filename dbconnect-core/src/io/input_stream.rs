/// A byte-sequence reader backed by an owned copy of a blob's bytes.
///
/// The copy is deliberate: a stream returned by `Blob::get_binary_stream` must outlive
/// the blob it was read from (the blob may be lazily-loaded driver-bound storage that
/// gets dropped, or re-loaded, independently of any stream a caller is still reading).
pub struct InputStream {
    bytes: Vec<u8>,
    position: usize,
}

impl InputStream {
    pub fn new(bytes: Vec<u8>) -> Self {
        InputStream { bytes, position: 0 }
    }

    /// Reads up to `buf.len()` bytes, returning the number of bytes read.
    ///
    /// Returns `-1` once the stream is exhausted, matching the classic "negative at EOF"
    /// contract (a 0-length read on an empty `buf` is not EOF; `-1` is only returned
    /// when there was nothing left to read _and_ the caller asked for more than zero).
    pub fn read(&mut self, buf: &mut [u8]) -> i64 {
        if self.position >= self.bytes.len() {
            return if buf.is_empty() { 0 } else { -1 };
        }
        let available = &self.bytes[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        n as i64
    }

    pub fn skip(&mut self, n: u64) -> u64 {
        let remaining = self.bytes.len().saturating_sub(self.position);
        let skipped = remaining.min(n as usize);
        self.position += skipped;
        skipped as u64
    }

    /// Idempotent; an `InputStream` owns no external resource beyond its byte copy.
    pub fn close(&mut self) {
        self.position = self.bytes.len();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_until_eof_then_returns_negative() {
        let mut stream = InputStream::new(vec![1, 2, 3]);
        let mut buf = [0u8; 2];
        assert_eq!(stream.read(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(stream.read(&mut buf), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(stream.read(&mut buf), -1);
    }

    #[test]
    fn skip_clamps_to_remaining_length() {
        let mut stream = InputStream::new(vec![1, 2, 3]);
        assert_eq!(stream.skip(2), 2);
        assert_eq!(stream.skip(10), 1);
        assert_eq!(stream.read(&mut [0u8; 1]), -1);
    }

    #[test]
    fn close_is_idempotent() {
        let mut stream = InputStream::new(vec![1, 2, 3]);
        stream.close();
        stream.close();
        assert_eq!(stream.read(&mut [0u8; 1]), -1);
    }
}
