use crate::error::Result;

/// A write-only stream positioned at a fixed starting offset into a [`crate::blob::Blob`].
///
/// Unlike [`super::input_stream::InputStream`], this can't just hand back an owned copy
/// of the bytes: writes must land back in the blob they were opened against. It's built
/// from a small callback rather than an `&mut dyn Blob` so that `Blob::set_binary_stream`
/// stays object-safe — every concrete blob's `set_bytes` is captured by the closure at
/// construction time.
pub struct OutputStream<'a> {
    writer: Box<dyn FnMut(u64, &[u8]) -> Result<()> + 'a>,
    position: u64,
}

impl<'a> OutputStream<'a> {
    pub fn new(offset: u64, writer: Box<dyn FnMut(u64, &[u8]) -> Result<()> + 'a>) -> Self {
        OutputStream { writer, position: offset }
    }

    /// Writes `bytes` at the current position and advances it, so a sequence of
    /// `write` calls lays bytes down contiguously from the stream's starting offset.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (self.writer)(self.position, bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Idempotent; the underlying blob owns the real resource, this stream is just a
    /// cursor over it.
    pub fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_writes_advance_from_the_starting_offset() {
        let mut sink: Vec<(u64, Vec<u8>)> = Vec::new();
        {
            let mut stream = OutputStream::new(
                2,
                Box::new(|offset, bytes| {
                    sink.push((offset, bytes.to_vec()));
                    Ok(())
                }),
            );
            stream.write(&[1, 2]).unwrap();
            stream.write(&[3]).unwrap();
        }
        assert_eq!(sink, vec![(2, vec![1, 2]), (4, vec![3])]);
    }
}
