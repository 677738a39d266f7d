//! Chunks and the allocator that builds them from caller writes

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{DeviceError, Result};
use crate::transfer::CopyFromUser;

/// Immutable byte payload produced by one write call
///
/// Cloning is cheap: clones share the same bytes. A chunk stays alive as
/// long as the queue or any cursor still refers to it.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk(Arc<[u8]>);

impl Chunk {
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self(Arc::from(data))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// New chunk holding the bytes from `offset` to the end
    #[must_use]
    pub fn tail(&self, offset: usize) -> Self {
        Self::from_slice(&self.0[offset.min(self.0.len())..])
    }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk(len={}, {:?})", self.0.len(), String::from_utf8_lossy(&self.0))
    }
}

/// Builds chunks from inbound transfers, applying the size cap
#[derive(Debug, Clone, Copy)]
pub struct ChunkAllocator {
    max_chunk_size: usize,
}

impl ChunkAllocator {
    #[must_use]
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// Copy up to `requested_len` bytes from the caller into a new chunk
    ///
    /// The accepted length is `min(requested_len, max_chunk_size)`; bytes the
    /// transfer could not copy are cut off the end. A zero-length chunk is a
    /// valid result.
    ///
    /// # Errors
    /// `ResourceExhausted` if the chunk cannot be allocated, `TransferFault`
    /// if the transfer fails outright. No chunk exists in either case.
    pub fn build<S>(&self, source: &S, requested_len: usize) -> Result<Chunk>
    where
        S: CopyFromUser + ?Sized,
    {
        let accepted = requested_len.min(self.max_chunk_size);
        let mut data = Vec::new();
        data.try_reserve_exact(accepted).map_err(|e| {
            log::warn!("chunk: cannot allocate {accepted} byte(s): {e}");
            DeviceError::ResourceExhausted { capacity: accepted }
        })?;
        data.resize(accepted, 0);
        let uncopied = source.copy_from_user(&mut data)?;
        data.truncate(accepted.saturating_sub(uncopied));
        if uncopied > 0 {
            log::debug!("chunk: {uncopied} of {accepted} byte(s) not copied");
        }
        Ok(Chunk::from_slice(&data))
    }
}
