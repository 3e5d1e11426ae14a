//! Owned byte string with block-sized capacity

use crate::error::{FalconError, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// Capacity granule for string buffers
pub const STRING_BLOCK: usize = 8;

/// Longest string a program may build, in bytes
pub const MAX_STRING_LEN: usize = 1 << 30;

/// Smallest block-aligned capacity able to hold `len` bytes plus one spare
fn capacity_for(len: usize) -> Result<usize> {
    if len > MAX_STRING_LEN {
        return Err(too_long(len));
    }
    (len / STRING_BLOCK)
        .checked_add(1)
        .and_then(|blocks| blocks.checked_mul(STRING_BLOCK))
        .ok_or_else(|| too_long(len))
}

fn too_long(len: usize) -> FalconError {
    FalconError::internal(format!(
        "string of {len} bytes exceeds the {MAX_STRING_LEN} byte limit"
    ))
}

/// String payload of a [`Value`](super::Value)
///
/// The logical capacity is always a multiple of [`STRING_BLOCK`] and strictly
/// greater than the length. It grows to the next block boundary and never
/// shrinks. Cloning copies the bytes into a fresh buffer sized for the length.
pub struct FalconString {
    bytes: Vec<u8>,
    capacity: usize,
}

impl FalconString {
    pub fn new() -> Self {
        Self::from_bytes(&[])
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        // an existing slice is far below usize::MAX, so this cannot overflow
        let capacity = (bytes.len() / STRING_BLOCK + 1) * STRING_BLOCK;
        let mut buf = Vec::with_capacity(capacity);
        buf.extend_from_slice(bytes);
        Self {
            bytes: buf,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn reserve_for(&mut self, len: usize) -> Result<()> {
        if len >= self.capacity {
            self.capacity = capacity_for(len)?;
            self.bytes.reserve(self.capacity - self.bytes.len());
        }
        Ok(())
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.reserve_for(self.bytes.len() + 1)?;
        self.bytes.push(byte);
        Ok(())
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let len = self
            .bytes
            .len()
            .checked_add(bytes.len())
            .ok_or_else(|| too_long(usize::MAX))?;
        self.reserve_for(len)?;
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    /// Drop the content but keep the buffer
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Concatenation of `count` copies
    pub fn repeat(&self, count: usize) -> Result<Self> {
        let mut out = Self::new();
        if self.is_empty() || count == 0 {
            return Ok(out);
        }
        let len = self
            .len()
            .checked_mul(count)
            .ok_or_else(|| too_long(usize::MAX))?;
        out.reserve_for(len)?;
        for _ in 0..count {
            out.append(&self.bytes)?;
        }
        Ok(out)
    }

    /// Copy of the bytes in `from..to`; the caller checks the bounds
    pub fn slice(&self, from: usize, to: usize) -> Self {
        Self::from_bytes(&self.bytes[from..to])
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl Default for FalconString {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FalconString {
    fn clone(&self) -> Self {
        Self::from_bytes(&self.bytes)
    }
}

impl PartialEq for FalconString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for FalconString {}

impl PartialOrd for FalconString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FalconString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl From<&str> for FalconString {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<String> for FalconString {
    fn from(s: String) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl fmt::Debug for FalconString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl fmt::Display for FalconString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Serialize for FalconString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}
