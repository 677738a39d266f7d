//! Byte transfer across the caller boundary
//!
//! The device never touches caller memory directly. Writes pull bytes
//! through `CopyFromUser`, reads push bytes through `CopyToUser`. Both
//! report how many bytes could NOT be moved, so a partially valid caller
//! buffer is observable, and both may fail outright.

use crate::error::Result;

/// Source of bytes for a write
pub trait CopyFromUser {
    /// Fill `dst` from the caller buffer
    ///
    /// Returns the number of trailing bytes of `dst` that could not be
    /// filled.
    ///
    /// # Errors
    /// `DeviceError::TransferFault` if nothing can be transferred at all.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<usize>;
}

/// Destination of bytes for a read
pub trait CopyToUser {
    /// Copy `src` into the caller buffer
    ///
    /// Returns the number of trailing bytes of `src` that could not be
    /// delivered.
    ///
    /// # Errors
    /// `DeviceError::TransferFault` if nothing can be transferred at all.
    fn copy_to_user(&mut self, src: &[u8]) -> Result<usize>;
}

impl CopyFromUser for [u8] {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<usize> {
        let n = self.len().min(dst.len());
        dst[..n].copy_from_slice(&self[..n]);
        Ok(dst.len() - n)
    }
}

impl CopyFromUser for Vec<u8> {
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<usize> {
        self.as_slice().copy_from_user(dst)
    }
}

impl CopyToUser for [u8] {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<usize> {
        let n = self.len().min(src.len());
        self[..n].copy_from_slice(&src[..n]);
        Ok(src.len() - n)
    }
}

/// Growable destination, never short
impl CopyToUser for Vec<u8> {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<usize> {
        self.extend_from_slice(src);
        Ok(0)
    }
}
