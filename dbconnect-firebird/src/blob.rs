//! Firebird BLOBs are write-once and server-resident: a [`FbBlob`] either wraps an
//! identifier the server already gave us (read from a fetched row) or starts empty,
//! awaiting bytes a caller stages with `set_bytes`/`truncate` before [`FbBlob::save`]
//! turns them into a brand-new server-side BLOB.

use std::cell::RefCell;
use std::sync::Weak;

use dbconnect_core::blob::Blob;
use dbconnect_core::error::{Error, Result};
use dbconnect_core::io::byte_buffer::ByteBuffer;

use crate::connection::FbConnection;
use crate::sys::ISC_QUAD;

/// A BLOB bound to a [`FbConnection`], lazily loading its bytes from the server the
/// first time they're needed. Loading is behind a `RefCell` rather than requiring
/// `&mut self` because the shared `Blob` trait's read methods (`length`, `get_bytes`)
/// only take `&self`.
pub struct FbBlob {
    connection: Weak<FbConnection>,
    blob_id: Option<ISC_QUAD>,
    staged: RefCell<ByteBuffer>,
    loaded: RefCell<bool>,
}

impl FbBlob {
    /// A blob whose bytes are already known to be on the server under `blob_id`,
    /// produced by [`crate::result_set::FbResultSetShared::get_blob`].
    pub(crate) fn from_blob_id(connection: Weak<FbConnection>, blob_id: ISC_QUAD) -> Self {
        FbBlob {
            connection,
            blob_id: Some(blob_id),
            staged: RefCell::new(ByteBuffer::new()),
            loaded: RefCell::new(false),
        }
    }

    /// A fresh, empty blob with no server-side identifier yet — stage bytes into it
    /// with [`Blob::set_bytes`] and call [`Self::save`] to create it.
    pub fn empty() -> Self {
        FbBlob {
            connection: Weak::new(),
            blob_id: None,
            staged: RefCell::new(ByteBuffer::new()),
            loaded: RefCell::new(true),
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if *self.loaded.borrow() {
            return Ok(());
        }
        let Some(blob_id) = self.blob_id else {
            *self.loaded.borrow_mut() = true;
            return Ok(());
        };
        let connection = self.connection.upgrade().ok_or_else(Error::conn_closed)?;
        let bytes = connection.read_blob(blob_id)?;
        *self.staged.borrow_mut() = ByteBuffer::from_vec(bytes);
        *self.loaded.borrow_mut() = true;
        Ok(())
    }

    /// Writes the staged bytes as a new server-side BLOB, returning its identifier.
    /// Not part of the `Blob` trait: nothing else on the shared contract needs a
    /// write-back, since both drivers create BLOBs exclusively through parameter
    /// binding (see [`crate::statement::FbPreparedStatement::set_bytes`]). Exposed
    /// for callers that build a `FbBlob` directly before passing it to `set_blob`.
    pub fn save(&mut self) -> Result<ISC_QUAD> {
        self.ensure_loaded()?;
        let connection = self.connection.upgrade().ok_or_else(Error::conn_closed)?;
        let blob_id = connection.write_blob(self.staged.borrow().as_slice())?;
        self.blob_id = Some(blob_id);
        Ok(blob_id)
    }
}

impl Blob for FbBlob {
    fn length(&self) -> Result<u64> {
        self.ensure_loaded()?;
        Ok(self.staged.borrow().len() as u64)
    }

    fn get_bytes(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.ensure_loaded()?;
        Ok(self.staged.borrow().get_range(offset as usize, length as usize).to_vec())
    }

    fn set_bytes(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.ensure_loaded()?;
        self.staged.borrow_mut().set_range(offset as usize, bytes);
        self.blob_id = None;
        Ok(())
    }

    fn truncate(&mut self, length: u64) -> Result<()> {
        self.ensure_loaded()?;
        self.staged.borrow_mut().truncate(length as usize);
        self.blob_id = None;
        Ok(())
    }

    fn free(&mut self) {
        *self.staged.borrow_mut() = ByteBuffer::new();
        *self.loaded.borrow_mut() = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_has_zero_length() {
        let blob = FbBlob::empty();
        assert_eq!(blob.length().unwrap(), 0);
    }

    #[test]
    fn staged_bytes_round_trip_before_save() {
        let mut blob = FbBlob::empty();
        blob.set_bytes(0, b"hello").unwrap();
        assert_eq!(blob.get_bytes(0, 5).unwrap(), b"hello");
        assert_eq!(blob.length().unwrap(), 5);
    }

    #[test]
    fn free_clears_staged_bytes() {
        let mut blob = FbBlob::empty();
        blob.set_bytes(0, b"hello").unwrap();
        blob.free();
        assert_eq!(blob.length().unwrap(), 0);
    }
}
