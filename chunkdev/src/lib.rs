//! Chunked byte-queue device
//!
//! Callers write discrete chunks of bytes through an access point; other
//! callers consume them destructively (FIFO, remove-on-read) or
//! non-destructively (through a per-session cursor).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  ChunkDevice (service object)       │
//! │  - open / read / write / release    │
//! │  - AccessMode chosen at open        │
//! └─────────────────────────────────────┘
//!          │ one Session per caller (or one shared)
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Session                            │
//! │  - SharedQueue (mutex + condvar)    │
//! │  - Cursor for non-destructive reads │
//! └─────────────────────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  FifoQueue of Chunk                 │
//! │  - ChunkAllocator caps chunk size   │
//! └─────────────────────────────────────┘
//! ```

pub mod chunk;
pub mod config;
pub mod cursor;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod idgen;
pub mod queue;
pub mod registration;
pub mod session;
pub mod transfer;

// Re-export the service API for convenience
pub use device::{ChunkDevice, SessionHandle};
pub use dispatch::AccessMode;
pub use error::{DeviceError, Operation, Result};

// Re-export configuration
pub use config::{
    DeviceConfig, OverflowPolicy, RemainderPolicy, Variant, DEFAULT_DEVICE_NAME,
    DEFAULT_MAX_CHUNK_SIZE, MAX_CHUNK_SIZE_LIMIT,
};

// Re-export building blocks
pub use chunk::{Chunk, ChunkAllocator};
pub use cursor::Cursor;
pub use idgen::{Handle, IdGen};
pub use queue::{FifoQueue, Seq, SharedQueue};
pub use registration::{MemRegistrar, Registrar};
pub use session::{CallerId, LastAccess, Session, SessionRegistry};
pub use transfer::{CopyFromUser, CopyToUser};
