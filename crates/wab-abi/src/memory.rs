//! Linear memory owned by a foreign module instance.
//!
//! The heap is a fixed block of 32-bit words addressed by byte offsets
//! ([`MemPtr`]). Allocations are carved out first-fit and always start on a
//! [`ALIGNMENT`] boundary, so every allocation can be viewed as `f32` samples
//! as well as raw bytes. Offset zero is reserved and never handed out.

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// Alignment of every allocation, in bytes.
pub const ALIGNMENT: usize = 16;

/// Upper bound for a single linear memory region.
pub const MAX_MEMORY_BYTES: usize = 1 << 30;

const WORD: usize = std::mem::size_of::<f32>();

/// Byte offset into a [`LinearMemory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemPtr(u32);

impl MemPtr {
    pub const NULL: MemPtr = MemPtr(0);

    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> usize {
        self.0 as usize
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for MemPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("out of linear memory: requested {requested} bytes, {available} bytes free")]
    OutOfMemory { requested: usize, available: usize },
    #[error("{0} is not a live allocation")]
    InvalidPointer(MemPtr),
    #[error("access of {len} bytes at {ptr} is out of bounds")]
    OutOfBounds { ptr: MemPtr, len: usize },
    #[error("{0} is not aligned for f32 access")]
    Misaligned(MemPtr),
    #[error("regions at {first} and {second} overlap")]
    Overlap { first: MemPtr, second: MemPtr },
}

#[derive(Debug, Clone, Copy)]
struct Block {
    offset: usize,
    size: usize,
}

impl Block {
    fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Fixed-size heap with a first-fit allocator.
pub struct LinearMemory {
    words: Box<[f32]>,
    // Live allocations, sorted by offset.
    blocks: Vec<Block>,
}

impl LinearMemory {
    /// Creates a zeroed memory region of at least `bytes` bytes.
    pub fn new(bytes: usize) -> Self {
        let bytes = round_up(bytes.clamp(2 * ALIGNMENT, MAX_MEMORY_BYTES)).unwrap_or(MAX_MEMORY_BYTES);
        Self {
            words: vec![0.0; bytes / WORD].into_boxed_slice(),
            blocks: Vec::with_capacity(64),
        }
    }

    /// Total size of the region in bytes.
    pub fn size(&self) -> usize {
        self.words.len() * WORD
    }

    /// Number of allocations that have not been freed.
    pub fn live_allocations(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes not covered by a live allocation (ignores fragmentation).
    pub fn free_bytes(&self) -> usize {
        let used: usize = self.blocks.iter().map(|block| block.size).sum();
        self.size() - ALIGNMENT - used
    }

    /// Size reserved for the allocation starting at `ptr`.
    pub fn allocation_size(&self, ptr: MemPtr) -> Option<usize> {
        self.find(ptr).map(|index| self.blocks[index].size)
    }

    /// Allocates a zeroed region of `bytes` bytes.
    pub fn allocate(&mut self, bytes: usize) -> Result<MemPtr, MemoryError> {
        let out_of_memory = MemoryError::OutOfMemory {
            requested: bytes,
            available: self.free_bytes(),
        };
        let size = round_up(bytes.max(1)).ok_or_else(|| out_of_memory.clone())?;

        let mut cursor = ALIGNMENT;
        let mut slot = self.blocks.len();
        for (index, block) in self.blocks.iter().enumerate() {
            if block.offset - cursor >= size {
                slot = index;
                break;
            }
            cursor = block.end();
        }
        if slot == self.blocks.len() && cursor + size > self.size() {
            return Err(out_of_memory);
        }

        let offset = u32::try_from(cursor).map_err(|_| out_of_memory)?;
        self.blocks.insert(slot, Block {
            offset: cursor,
            size,
        });
        self.words[cursor / WORD..(cursor + size) / WORD].fill(0.0);
        Ok(MemPtr(offset))
    }

    /// Releases an allocation previously returned by [`allocate`](Self::allocate).
    pub fn free(&mut self, ptr: MemPtr) -> Result<(), MemoryError> {
        let index = self.find(ptr).ok_or(MemoryError::InvalidPointer(ptr))?;
        self.blocks.remove(index);
        Ok(())
    }

    pub fn f32s(&self, ptr: MemPtr, len: usize) -> Result<&[f32], MemoryError> {
        let range = self.word_range(ptr, len)?;
        Ok(&self.words[range])
    }

    pub fn f32s_mut(&mut self, ptr: MemPtr, len: usize) -> Result<&mut [f32], MemoryError> {
        let range = self.word_range(ptr, len)?;
        Ok(&mut self.words[range])
    }

    /// Borrows a read-only input view and a writable output view at the same
    /// time. The two regions must not overlap.
    pub fn io_pair(
        &mut self,
        input: MemPtr,
        output: MemPtr,
        len: usize,
    ) -> Result<(&[f32], &mut [f32]), MemoryError> {
        let input_range = self.word_range(input, len)?;
        let output_range = self.word_range(output, len)?;
        if input_range.start < output_range.end && output_range.start < input_range.end {
            return Err(MemoryError::Overlap {
                first: input,
                second: output,
            });
        }

        if input_range.start < output_range.start {
            let (head, tail) = self.words.split_at_mut(output_range.start);
            Ok((&head[input_range], &mut tail[..len]))
        } else {
            let (head, tail) = self.words.split_at_mut(input_range.start);
            Ok((&tail[..len], &mut head[output_range]))
        }
    }

    pub fn bytes(&self, ptr: MemPtr, len: usize) -> Result<&[u8], MemoryError> {
        let range = self.byte_range(ptr, len)?;
        Ok(&self.as_bytes()[range])
    }

    pub fn bytes_mut(&mut self, ptr: MemPtr, len: usize) -> Result<&mut [u8], MemoryError> {
        let range = self.byte_range(ptr, len)?;
        Ok(&mut self.as_bytes_mut()[range])
    }

    pub fn write_bytes(&mut self, ptr: MemPtr, data: &[u8]) -> Result<(), MemoryError> {
        self.bytes_mut(ptr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    fn find(&self, ptr: MemPtr) -> Option<usize> {
        self.blocks
            .binary_search_by_key(&ptr.offset(), |block| block.offset)
            .ok()
    }

    fn word_range(&self, ptr: MemPtr, len: usize) -> Result<Range<usize>, MemoryError> {
        if ptr.offset() % WORD != 0 {
            return Err(MemoryError::Misaligned(ptr));
        }
        let start = ptr.offset() / WORD;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.words.len())
            .ok_or(MemoryError::OutOfBounds {
                ptr,
                len: len.saturating_mul(WORD),
            })?;
        Ok(start..end)
    }

    fn byte_range(&self, ptr: MemPtr, len: usize) -> Result<Range<usize>, MemoryError> {
        let start = ptr.offset();
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.size())
            .ok_or(MemoryError::OutOfBounds { ptr, len })?;
        Ok(start..end)
    }

    fn as_bytes(&self) -> &[u8] {
        // SAFETY: f32 has no padding and u8 has alignment 1, so the word heap
        // is exactly `size()` initialised bytes.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.size()) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `as_bytes`; every byte pattern is also a valid f32.
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), self.size()) }
    }
}

impl fmt::Debug for LinearMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearMemory")
            .field("size", &self.size())
            .field("allocations", &self.blocks.len())
            .finish()
    }
}

fn round_up(bytes: usize) -> Option<usize> {
    Some(bytes.checked_add(ALIGNMENT - 1)? / ALIGNMENT * ALIGNMENT)
}
