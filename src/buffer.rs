//! Block buffers owned by the host and lent to nodes for one tick.

#![forbid(unsafe_code)]

use crate::port::{PortDefault, PortKind};

/// Errors when writing trigger offsets into a [`TriggerBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    /// Offset outside `[0, block_size)`.
    #[error("trigger offset {offset} outside block of {block_size} samples")]
    OutOfRange { offset: usize, block_size: usize },
    /// Offsets must be strictly increasing within a block.
    #[error("trigger offset {offset} does not follow previous offset {previous}")]
    NotIncreasing { offset: usize, previous: usize },
}

/// Trigger offsets for one block, strictly increasing and inside the block.
///
/// Capacity equals the block size, which bounds the number of distinct
/// offsets, so filling the buffer never reallocates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBuffer {
    offsets: Vec<usize>,
    block_size: usize,
}

impl TriggerBuffer {
    /// An empty buffer for blocks of `block_size` samples.
    pub fn new(block_size: usize) -> Self {
        Self {
            offsets: Vec::with_capacity(block_size),
            block_size,
        }
    }

    /// Record a trigger at `offset`.
    pub fn trigger_frame(&mut self, offset: usize) -> Result<(), TriggerError> {
        if offset >= self.block_size {
            return Err(TriggerError::OutOfRange {
                offset,
                block_size: self.block_size,
            });
        }
        if let Some(&previous) = self.offsets.last() {
            if offset <= previous {
                return Err(TriggerError::NotIncreasing { offset, previous });
            }
        }
        self.offsets.push(offset);
        Ok(())
    }

    /// Drop every offset, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    /// Offsets in ascending order.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    #[inline]
    pub fn first(&self) -> Option<usize> {
        self.offsets.first().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

/// Storage behind one port of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PortBuffer {
    Audio(Vec<f32>),
    Trigger(TriggerBuffer),
    Enum(i32),
    Time(f64),
}

impl PortBuffer {
    /// A zeroed buffer of `kind` for blocks of `block_size` samples.
    pub fn silent(kind: PortKind, block_size: usize) -> Self {
        match kind {
            PortKind::Audio => PortBuffer::Audio(vec![0.0; block_size]),
            PortKind::Trigger => PortBuffer::Trigger(TriggerBuffer::new(block_size)),
            PortKind::Enum => PortBuffer::Enum(0),
            PortKind::Time => PortBuffer::Time(0.0),
        }
    }

    /// A constant buffer holding `default`.
    pub fn from_default(default: PortDefault, block_size: usize) -> Self {
        match default {
            PortDefault::Audio(value) => PortBuffer::Audio(vec![value; block_size]),
            PortDefault::NoTriggers => PortBuffer::Trigger(TriggerBuffer::new(block_size)),
            PortDefault::Enum(value) => PortBuffer::Enum(value),
            PortDefault::Time(value) => PortBuffer::Time(value),
        }
    }

    pub fn kind(&self) -> PortKind {
        match self {
            PortBuffer::Audio(_) => PortKind::Audio,
            PortBuffer::Trigger(_) => PortKind::Trigger,
            PortBuffer::Enum(_) => PortKind::Enum,
            PortBuffer::Time(_) => PortKind::Time,
        }
    }
}
