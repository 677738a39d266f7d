//! Non-destructive read position
//!
//! A cursor walks a queue forward without removing anything. It pins the
//! chunk it will deliver next by holding a shared reference, so a
//! destructive reader popping that chunk first does not invalidate it.
//! After delivering a chunk the cursor moves to the first chunk still
//! queued that was appended later; chunks popped in the meantime are
//! skipped.
//!
//! Once the cursor runs past the tail it stays exhausted: chunks appended
//! afterwards are only seen by a cursor created by a new open.

use std::fmt;

use crate::chunk::Chunk;
use crate::config::RemainderPolicy;
use crate::error::{DeviceError, Result};
use crate::queue::{FifoQueue, Seq};
use crate::transfer::CopyToUser;

struct Pinned {
    seq: Seq,
    chunk: Chunk,
    offset: usize,
}

#[derive(Default)]
pub struct Cursor {
    current: Option<Pinned>,
}

impl Cursor {
    /// Cursor positioned on the queue's current head
    ///
    /// An empty queue gives an exhausted cursor.
    #[must_use]
    pub fn at_head(fifo: &FifoQueue) -> Self {
        Self {
            current: fifo.peek_front().map(|(seq, chunk)| Pinned {
                seq,
                chunk: chunk.clone(),
                offset: 0,
            }),
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// Deliver up to `max_len` bytes of the pinned chunk to `out`
    ///
    /// Returns 0 when exhausted. With `RemainderPolicy::Requeue` a partly
    /// read chunk stays pinned and the next call continues inside it; with
    /// `Drop` the cursor advances regardless.
    ///
    /// # Errors
    /// `TransferFault` if `out` cannot take the bytes; the cursor does not
    /// move then.
    pub fn read<D>(
        &mut self,
        fifo: &FifoQueue,
        out: &mut D,
        max_len: usize,
        remainder: RemainderPolicy,
    ) -> Result<usize>
    where
        D: CopyToUser + ?Sized,
    {
        let Some(pinned) = self.current.as_mut() else {
            return Ok(0);
        };

        let available = &pinned.chunk[pinned.offset..];
        let n = available.len().min(max_len);
        let uncopied = out.copy_to_user(&available[..n])?;
        if uncopied > 0 {
            return Err(DeviceError::TransferFault { uncopied });
        }

        if n < available.len() && remainder == RemainderPolicy::Requeue {
            pinned.offset += n;
        } else {
            let seq = pinned.seq;
            self.current = fifo.next_after(seq).map(|(seq, chunk)| Pinned {
                seq,
                chunk,
                offset: 0,
            });
            if self.current.is_none() {
                log::debug!("cursor: exhausted after seq {seq}");
            }
        }
        Ok(n)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current {
            Some(p) => write!(f, "Cursor(seq={}, offset={}, len={})", p.seq, p.offset, p.chunk.len()),
            None => write!(f, "Cursor(exhausted)"),
        }
    }
}
