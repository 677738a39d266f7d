//! Per-caller sessions
//!
//! A session owns one queue and one cursor. In the multi variant the
//! `SessionRegistry` hands out one session per caller identity; the single
//! variant uses one session for everybody.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::config::{OverflowPolicy, RemainderPolicy};
use crate::cursor::Cursor;
use crate::error::{DeviceError, Result};
use crate::queue::SharedQueue;
use crate::transfer::CopyToUser;

/// Identity of the calling process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerId(u32);

impl CallerId {
    #[must_use]
    pub const fn new(pid: u32) -> Self {
        Self(pid)
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Kind of the last successful operation on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastAccess {
    Read,
    Write,
}

pub struct Session {
    caller: CallerId,
    queue: SharedQueue,
    cursor: Mutex<Cursor>,
    writing: AtomicBool,
    last_access: Mutex<Option<LastAccess>>,
}

impl Session {
    #[must_use]
    pub fn new(caller: CallerId, queue: SharedQueue) -> Self {
        Self {
            caller,
            queue,
            cursor: Mutex::new(Cursor::default()),
            writing: AtomicBool::new(false),
            last_access: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn caller(&self) -> CallerId {
        self.caller
    }

    #[must_use]
    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// True between a successful write and the next release
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last_access(&self) -> Option<LastAccess> {
        *self.last_access.lock()
    }

    pub(crate) fn end_writing(&self) {
        self.writing.store(false, Ordering::Release);
    }

    /// Re-position the cursor on the queue's current head
    pub fn reset_cursor(&self) {
        // Lock order: cursor, then queue
        let mut cursor = self.cursor.lock();
        let fifo = self.queue.lock();
        *cursor = Cursor::at_head(&fifo);
        log::debug!("session {}: cursor reset, {:?}", self.caller, *cursor);
    }

    /// Append a chunk to the session queue
    ///
    /// # Errors
    /// `ResourceExhausted` from a full queue with the `Reject` policy.
    pub fn push(&self, chunk: Chunk) -> Result<usize> {
        let len = chunk.len();
        self.queue.push(chunk)?;
        self.writing.store(true, Ordering::Release);
        *self.last_access.lock() = Some(LastAccess::Write);
        Ok(len)
    }

    /// Pop the head chunk and deliver up to `max_len` bytes of it
    ///
    /// Returns 0 on an empty queue. The chunk is only removed once the
    /// transfer succeeded.
    ///
    /// # Errors
    /// `TransferFault` if `out` cannot take the bytes; the queue is unchanged.
    pub fn read_destructive<D>(
        &self,
        out: &mut D,
        max_len: usize,
        remainder: RemainderPolicy,
    ) -> Result<usize>
    where
        D: CopyToUser + ?Sized,
    {
        let mut fifo = self.queue.lock();
        let Some((_, head)) = fifo.peek_front() else {
            return Ok(0);
        };
        let head = head.clone();
        let n = head.len().min(max_len);
        let uncopied = out.copy_to_user(&head[..n])?;
        if uncopied > 0 {
            return Err(DeviceError::TransferFault { uncopied });
        }

        if n < head.len() {
            match remainder {
                RemainderPolicy::Requeue => {
                    fifo.replace_front(head.tail(n));
                }
                RemainderPolicy::Drop => {
                    log::debug!(
                        "session {}: dropping {} unread byte(s)",
                        self.caller,
                        head.len() - n
                    );
                    fifo.pop_front();
                }
            }
        } else {
            fifo.pop_front();
        }
        drop(fifo);
        self.queue.space_freed();
        *self.last_access.lock() = Some(LastAccess::Read);
        Ok(n)
    }

    /// Deliver bytes through the session cursor without touching the queue
    ///
    /// # Errors
    /// `TransferFault` if `out` cannot take the bytes; the cursor stays put.
    pub fn read_cursor<D>(
        &self,
        out: &mut D,
        max_len: usize,
        remainder: RemainderPolicy,
    ) -> Result<usize>
    where
        D: CopyToUser + ?Sized,
    {
        let mut cursor = self.cursor.lock();
        let fifo = self.queue.lock();
        let n = cursor.read(&fifo, out, max_len, remainder)?;
        drop(fifo);
        drop(cursor);
        *self.last_access.lock() = Some(LastAccess::Read);
        Ok(n)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session(caller={}, queue={:?}, writing={})",
            self.caller,
            self.queue,
            self.is_writing()
        )
    }
}

/// Maps caller identities to their sessions
///
/// Find-or-create runs under one lock, so concurrent first opens by the same
/// caller always end up with the same session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<CallerId, Arc<Session>>>,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
}

impl SessionRegistry {
    /// Registry whose sessions get queues with the given limits
    #[must_use]
    pub fn new(capacity: Option<usize>, overflow: OverflowPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity,
            overflow,
        }
    }

    /// Session of `caller`, created with an empty queue on first use
    pub fn find_or_create(&self, caller: CallerId) -> Arc<Session> {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(caller).or_insert_with(|| {
            log::debug!("registry: new session for {caller}");
            Arc::new(Session::new(
                caller,
                SharedQueue::new(self.capacity, self.overflow),
            ))
        });
        Arc::clone(session)
    }

    #[must_use]
    pub fn get(&self, caller: CallerId) -> Option<Arc<Session>> {
        self.sessions.lock().get(&caller).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Known callers, sorted
    #[must_use]
    pub fn callers(&self) -> Vec<CallerId> {
        let mut callers: Vec<CallerId> = self.sessions.lock().keys().copied().collect();
        callers.sort();
        callers
    }
}
