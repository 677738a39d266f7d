//! The chunk device service
//!
//! `ChunkDevice` owns every queue and session. The host constructs it at
//! startup (usually through `ChunkDevice::register`), passes it by reference
//! to each open/read/write/release, and drops it at teardown. Nothing is
//! global.
//!
//! # Variants
//!
//! - `Variant::Single`: one access point, one queue shared by all callers.
//!   Every open gets a read-write handle on that queue. There is no
//!   isolation between callers.
//! - `Variant::Multi`: three access points. Index 0 writes, index 1 reads
//!   through the session cursor, index 2 reads destructively. All three
//!   resolve to the caller's private queue.
//!
//! # Example
//!
//! ```
//! use chunkdev::{CallerId, ChunkDevice, DeviceConfig};
//!
//! let device = ChunkDevice::new(DeviceConfig::multi()).unwrap();
//! let caller = CallerId::new(42);
//!
//! let writer = device.open(0, caller).unwrap();
//! assert_eq!(device.write(&writer, b"abc".as_slice(), 3).unwrap(), 3);
//!
//! let reader = device.open(2, caller).unwrap();
//! assert_eq!(device.read_vec(&reader, 10).unwrap(), b"abc");
//! assert!(device.read_vec(&reader, 10).unwrap().is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::chunk::ChunkAllocator;
use crate::config::{DeviceConfig, RemainderPolicy, Variant};
use crate::dispatch::AccessMode;
use crate::error::{DeviceError, Operation, Result};
use crate::idgen::{Handle, IdGen};
use crate::queue::SharedQueue;
use crate::registration::Registrar;
use crate::session::{CallerId, Session, SessionRegistry};
use crate::transfer::{CopyFromUser, CopyToUser};

/// Identity recorded on the single variant's shared session
const SHARED_CALLER: CallerId = CallerId::new(0);

enum Sessions {
    Shared(Arc<Session>),
    PerCaller(SessionRegistry),
}

pub struct ChunkDevice {
    config: DeviceConfig,
    allocator: ChunkAllocator,
    sessions: Sessions,
    id_gen: IdGen,
}

impl ChunkDevice {
    /// Build a device from a validated configuration
    ///
    /// # Errors
    /// `InitializationFailure` if the configuration is invalid.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        let sessions = match config.variant {
            Variant::Single => Sessions::Shared(Arc::new(Session::new(
                SHARED_CALLER,
                SharedQueue::new(config.capacity, config.overflow),
            ))),
            Variant::Multi => {
                Sessions::PerCaller(SessionRegistry::new(config.capacity, config.overflow))
            }
        };
        Ok(Self {
            allocator: ChunkAllocator::new(config.max_chunk_size),
            config,
            sessions,
            id_gen: IdGen::new(),
        })
    }

    /// Build a device and register its access points with the host
    ///
    /// # Errors
    /// `InitializationFailure` if the configuration is invalid or the
    /// registrar refuses. The device is unavailable in both cases.
    pub fn register<R>(config: DeviceConfig, registrar: &mut R) -> Result<Self>
    where
        R: Registrar + ?Sized,
    {
        let device = Self::new(config)?;
        let access_points = device.config.variant.access_points();
        registrar
            .register(&device.config.name, access_points)
            .map_err(DeviceError::InitializationFailure)?;
        info!(
            name = %device.config.name,
            access_points,
            max_chunk_size = device.config.max_chunk_size,
            "device registered"
        );
        Ok(device)
    }

    /// Withdraw the access points and drop all queued data
    pub fn unregister<R>(self, registrar: &mut R)
    where
        R: Registrar + ?Sized,
    {
        registrar.unregister(&self.config.name);
        info!(name = %self.config.name, "device unregistered");
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Open a session on an access point for `caller`
    ///
    /// In the multi variant the caller's session is created on first open,
    /// and opening index 1 re-positions its cursor on the queue head.
    ///
    /// # Errors
    /// `NotFound` for an access index outside the multi variant's range.
    pub fn open(&self, access_index: u32, caller: CallerId) -> Result<SessionHandle> {
        let mode = AccessMode::for_index(self.config.variant, access_index)?;
        let session = match &self.sessions {
            Sessions::Shared(session) => Arc::clone(session),
            Sessions::PerCaller(registry) => registry.find_or_create(caller),
        };
        if mode == AccessMode::NonDestructiveReadOnly {
            session.reset_cursor();
        }

        let handle = self.id_gen.next_handle();
        debug!(%handle, %caller, %mode, access_index, "session opened");
        Ok(SessionHandle {
            handle,
            mode,
            session,
            allocator: self.allocator,
            remainder: self.config.remainder,
            closed: false,
        })
    }

    /// Read up to `max_len` bytes into `out`
    ///
    /// Returns 0 when there is nothing to read.
    ///
    /// # Errors
    /// `InvalidOperation` on a write-only handle, `TransferFault` if `out`
    /// cannot take the bytes.
    pub fn read<D>(&self, handle: &SessionHandle, out: &mut D, max_len: usize) -> Result<usize>
    where
        D: CopyToUser + ?Sized,
    {
        handle.read_into(out, max_len)
    }

    /// Read up to `max_len` bytes into a new vector
    ///
    /// # Errors
    /// Same as `read`.
    pub fn read_vec(&self, handle: &SessionHandle, max_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(max_len.min(self.config.max_chunk_size));
        handle.read_into(&mut out, max_len)?;
        Ok(out)
    }

    /// Write one chunk of up to `len` bytes from `src`
    ///
    /// Returns the accepted length, which may be less than `len`.
    ///
    /// # Errors
    /// `InvalidOperation` on a read-only handle, `TransferFault` if `src`
    /// cannot be read, `ResourceExhausted` if the queue is full.
    pub fn write<S>(&self, handle: &SessionHandle, src: &S, len: usize) -> Result<usize>
    where
        S: CopyFromUser + ?Sized,
    {
        handle.write_from(src, len)
    }

    /// Close a session handle
    ///
    /// The session and its queue survive; only the writing flag is cleared.
    pub fn release(&self, handle: SessionHandle) {
        handle.release();
    }

    /// Drop every chunk queued for `caller`; returns how many were dropped
    ///
    /// The single variant flushes the shared queue whatever the caller.
    pub fn flush(&self, caller: CallerId) -> usize {
        let dropped = match &self.sessions {
            Sessions::Shared(session) => session.queue().clear(),
            Sessions::PerCaller(registry) => registry
                .get(caller)
                .map_or(0, |session| session.queue().clear()),
        };
        debug!(%caller, dropped, "queue flushed");
        dropped
    }

    /// Number of sessions the device holds
    #[must_use]
    pub fn session_count(&self) -> usize {
        match &self.sessions {
            Sessions::Shared(_) => 1,
            Sessions::PerCaller(registry) => registry.len(),
        }
    }

    /// Callers with a session, sorted; empty for the single variant
    #[must_use]
    pub fn callers(&self) -> Vec<CallerId> {
        match &self.sessions {
            Sessions::Shared(_) => Vec::new(),
            Sessions::PerCaller(registry) => registry.callers(),
        }
    }
}

impl fmt::Debug for ChunkDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChunkDevice(name={}, variant={:?}, sessions={})",
            self.config.name,
            self.config.variant,
            self.session_count()
        )
    }
}

/// One open access point
///
/// The mode is fixed at open. Dropping the handle releases it.
pub struct SessionHandle {
    handle: Handle,
    mode: AccessMode,
    session: Arc<Session>,
    allocator: ChunkAllocator,
    remainder: RemainderPolicy,
    closed: bool,
}

impl SessionHandle {
    #[must_use]
    pub fn id(&self) -> Handle {
        self.handle
    }

    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    #[must_use]
    pub fn caller(&self) -> CallerId {
        self.session.caller()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of chunks in the underlying queue
    #[must_use]
    pub fn queued(&self) -> usize {
        self.session.queue().len()
    }

    /// Read according to the handle's mode
    ///
    /// # Errors
    /// `InvalidOperation` on a write-only handle, `TransferFault` from `out`.
    pub fn read_into<D>(&self, out: &mut D, max_len: usize) -> Result<usize>
    where
        D: CopyToUser + ?Sized,
    {
        self.mode.check(Operation::Read)?;
        let n = match self.mode {
            AccessMode::NonDestructiveReadOnly => {
                self.session.read_cursor(out, max_len, self.remainder)?
            }
            _ => self.session.read_destructive(out, max_len, self.remainder)?,
        };
        trace!(handle = %self.handle, max_len, n, "read");
        Ok(n)
    }

    /// Build one chunk from `src` and queue it
    ///
    /// # Errors
    /// `InvalidOperation` on a read-only handle, `TransferFault` from `src`,
    /// `ResourceExhausted` from a full queue.
    pub fn write_from<S>(&self, src: &S, len: usize) -> Result<usize>
    where
        S: CopyFromUser + ?Sized,
    {
        self.mode.check(Operation::Write)?;
        let chunk = self.allocator.build(src, len)?;
        let accepted = self.session.push(chunk)?;
        trace!(handle = %self.handle, requested = len, accepted, "write");
        Ok(accepted)
    }

    /// Close the handle explicitly
    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.session.end_writing();
        debug!(handle = %self.handle, caller = %self.session.caller(), "session released");
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionHandle(id={}, mode={}, caller={})",
            self.handle,
            self.mode,
            self.session.caller()
        )
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl embedded_io::ErrorType for SessionHandle {
    type Error = DeviceError;
}

impl embedded_io::Read for SessionHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, Self::Error> {
        let max_len = buf.len();
        self.read_into(buf, max_len)
    }
}

impl embedded_io::Write for SessionHandle {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<usize, Self::Error> {
        self.write_from(buf, buf.len())
    }

    fn flush(&mut self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}
