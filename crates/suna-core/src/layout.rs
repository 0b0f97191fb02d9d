//! Fixed layout of the shared linear memory arena.
//!
//! The DSP module is compiled against absolute offsets, so these values are
//! bit-exact contract, not tuning knobs:
//!
//! ```text
//! 0 ............ BUFFER_START ........................ SAMPLE_DATA_START .................. end
//!                | inL | inR | outL | outR |           | slot 0 | slot 1 | ... | slot N-1 |
//!                 128 * 4 bytes each                     max_samples_per_slot * 4 bytes each
//! ```
//!
//! Everything below `BUFFER_START` belongs to the module's own data and stack.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Samples per render quantum.
pub const BLOCK_SIZE: usize = 128;

/// Bytes per `f32` sample.
pub const BYTES_PER_SAMPLE: usize = 4;

/// Number of sample slots.
pub const MAX_SLOTS: usize = 8;

/// Default slot capacity (30 s at 48 kHz).
pub const DEFAULT_MAX_SAMPLES_PER_SLOT: usize = 1_440_000;

/// Slot capacity of the compact configuration (10 s at 48 kHz).
pub const COMPACT_MAX_SAMPLES_PER_SLOT: usize = 480_000;

/// Arena offset of the first block buffer.
pub const BUFFER_START: u32 = 900_000;

/// Arena offset of slot 0.
pub const SAMPLE_DATA_START: u32 = 1_000_000;

/// Size of one wasm page.
pub const WASM_PAGE_SIZE: u64 = 65_536;

/// Byte offsets and capacities of the shared arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryLayout {
    pub block_size: usize,
    pub bytes_per_sample: usize,
    pub input_left: u32,
    pub input_right: u32,
    pub output_left: u32,
    pub output_right: u32,
    pub slot_table_base: u32,
    pub max_slots: usize,
    pub max_samples_per_slot: usize,
}

impl MemoryLayout {
    /// Layout the stock DSP build expects.
    pub const DEFAULT: Self = Self::new(BUFFER_START, SAMPLE_DATA_START, MAX_SLOTS, DEFAULT_MAX_SAMPLES_PER_SLOT);

    /// Build a layout with four contiguous block buffers starting at `buffer_start`.
    pub const fn new(
        buffer_start: u32,
        slot_table_base: u32,
        max_slots: usize,
        max_samples_per_slot: usize,
    ) -> Self {
        let block_bytes = (BLOCK_SIZE * BYTES_PER_SAMPLE) as u32;
        Self {
            block_size: BLOCK_SIZE,
            bytes_per_sample: BYTES_PER_SAMPLE,
            input_left: buffer_start,
            input_right: buffer_start + block_bytes,
            output_left: buffer_start + 2 * block_bytes,
            output_right: buffer_start + 3 * block_bytes,
            slot_table_base,
            max_slots,
            max_samples_per_slot,
        }
    }

    /// Layout with 480,000 samples per slot.
    pub const fn compact() -> Self {
        Self::new(BUFFER_START, SAMPLE_DATA_START, MAX_SLOTS, COMPACT_MAX_SAMPLES_PER_SLOT)
    }

    /// Same layout with a different slot capacity.
    pub const fn with_max_samples_per_slot(mut self, max_samples_per_slot: usize) -> Self {
        self.max_samples_per_slot = max_samples_per_slot;
        self
    }

    /// Bytes in one block buffer.
    #[inline]
    pub const fn block_bytes(&self) -> u32 {
        (self.block_size * self.bytes_per_sample) as u32
    }

    /// Bytes reserved per slot.
    #[inline]
    pub const fn slot_bytes(&self) -> u64 {
        (self.max_samples_per_slot * self.bytes_per_sample) as u64
    }

    /// Arena offset of `slot`, or `None` if the index is out of range.
    #[inline]
    pub fn slot_offset(&self, slot: usize) -> Option<u32> {
        if slot >= self.max_slots {
            return None;
        }
        let offset = self.slot_table_base as u64 + slot as u64 * self.slot_bytes();
        u32::try_from(offset).ok()
    }

    /// One past the last byte of the block buffers.
    #[inline]
    pub const fn block_region_end(&self) -> u64 {
        self.output_right as u64 + self.block_bytes() as u64
    }

    /// One past the last byte of the slot region.
    #[inline]
    pub const fn required_bytes(&self) -> u64 {
        self.slot_table_base as u64 + self.max_slots as u64 * self.slot_bytes()
    }

    /// Wasm pages needed to hold the whole layout.
    pub const fn required_pages(&self) -> u64 {
        self.required_bytes().div_ceil(WASM_PAGE_SIZE)
    }

    /// Check that the regions are well-formed and disjoint.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.block_size == 0 || self.bytes_per_sample != BYTES_PER_SAMPLE {
            return Err(BridgeError::Layout(format!(
                "block_size {} / bytes_per_sample {} unsupported",
                self.block_size, self.bytes_per_sample
            )));
        }
        if self.max_slots == 0 || self.max_samples_per_slot == 0 {
            return Err(BridgeError::Layout("slot capacity must be non-zero".into()));
        }

        let block = self.block_bytes();
        let buffers = [self.input_left, self.input_right, self.output_left, self.output_right];
        for (i, a) in buffers.iter().enumerate() {
            for b in &buffers[i + 1..] {
                if a.abs_diff(*b) < block {
                    return Err(BridgeError::Layout(format!(
                        "block buffers at {a} and {b} overlap"
                    )));
                }
            }
        }

        let blocks_start = buffers.iter().copied().min().unwrap_or(0) as u64;
        let blocks_end = buffers.iter().copied().max().unwrap_or(0) as u64 + block as u64;
        let slots_start = self.slot_table_base as u64;
        let slots_end = self.required_bytes();
        if blocks_start < slots_end && slots_start < blocks_end {
            return Err(BridgeError::Layout(
                "slot region overlaps the block buffers".into(),
            ));
        }
        if slots_end > u32::MAX as u64 + 1 {
            return Err(BridgeError::Layout(format!(
                "slot region ends at {slots_end}, beyond the 32-bit address space"
            )));
        }
        Ok(())
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}
