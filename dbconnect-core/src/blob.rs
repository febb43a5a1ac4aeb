use crate::error::Result;
use crate::io::byte_buffer::ByteBuffer;
use crate::io::input_stream::InputStream;
use crate::io::output_stream::OutputStream;

/// A lazily-materialised byte container.
///
/// Two flavours exist: an in-memory blob ([`MemoryBlob`]) that a caller builds up
/// directly, and a driver-bound blob that lazy-loads its bytes from the server on
/// first read (see `PgBlob`/`FbBlob` in the driver crates). Both implement this trait.
pub trait Blob {
    fn length(&self) -> Result<u64>;

    fn get_bytes(&self, offset: u64, length: u64) -> Result<Vec<u8>>;

    fn set_bytes(&mut self, offset: u64, bytes: &[u8]) -> Result<()>;

    fn truncate(&mut self, length: u64) -> Result<()>;

    /// Returns a stream backed by a copy of the bytes — the stream's lifetime must not
    /// depend on this blob still being alive or unmodified.
    fn get_binary_stream(&self) -> Result<InputStream> {
        let len = self.length()?;
        Ok(InputStream::new(self.get_bytes(0, len)?))
    }

    /// Opens a write cursor starting at `offset`; each [`OutputStream::write`] call
    /// lands its bytes straight into this blob via [`Blob::set_bytes`]. The default
    /// impl is in terms of `set_bytes` alone, so no implementor needs to override it.
    fn set_binary_stream(&mut self, offset: u64) -> Result<OutputStream<'_>>
    where
        Self: Sized,
    {
        Ok(OutputStream::new(
            offset,
            Box::new(move |pos, bytes| self.set_bytes(pos, bytes)),
        ))
    }

    /// Releases any resources held by this blob. Idempotent; never fails — cleanup
    /// paths log and continue rather than propagate.
    fn free(&mut self);
}

/// A blob whose bytes live entirely in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlob {
    buffer: ByteBuffer,
}

impl MemoryBlob {
    pub fn new() -> Self {
        MemoryBlob::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoryBlob {
            buffer: ByteBuffer::from_vec(bytes),
        }
    }
}

impl Blob for MemoryBlob {
    fn length(&self) -> Result<u64> {
        Ok(self.buffer.len() as u64)
    }

    fn get_bytes(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        Ok(self
            .buffer
            .get_range(offset as usize, length as usize)
            .to_vec())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes() {
        let mut blob = MemoryBlob::new();
        blob.set_bytes(0, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let len = blob.length().unwrap();
        assert_eq!(len, 4);
        assert_eq!(blob.get_bytes(0, len).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn free_empties_the_blob() {
        let mut blob = MemoryBlob::from_bytes(vec![1, 2, 3]);
        blob.free();
        assert_eq!(blob.length().unwrap(), 0);
    }

    #[test]
    fn binary_stream_is_independent_of_further_mutation() {
        let mut blob = MemoryBlob::from_bytes(vec![1, 2, 3]);
        let mut stream = blob.get_binary_stream().unwrap();
        blob.set_bytes(0, &[9, 9, 9]).unwrap();
        let mut out = [0u8; 3];
        stream.read(&mut out);
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn set_binary_stream_writes_through_to_the_blob() {
        let mut blob = MemoryBlob::from_bytes(vec![0, 0, 0, 0, 0]);
        {
            let mut out = blob.set_binary_stream(2).unwrap();
            out.write(&[7, 8]).unwrap();
            out.write(&[9]).unwrap();
        }
        assert_eq!(blob.get_bytes(0, 5).unwrap(), vec![0, 0, 7, 8, 9]);
    }
}
