//! Block address space and its split across physical strands
//!
//! Blocks are logical segment numbers. Each strand owns a contiguous range of
//! them, e.g. `[100, 100 + N1)` on the first strand and `[300, 300 + N2)` on the
//! second. All strands share one flat pixel array, laid out in strand order.

use core::ops::Range;

use heapless::Vec;

/// Block number reserved for "no block"
pub const NO_BLOCK: u16 = 0;

/// Size of the logical block address space
pub const BLOCK_ADDRESS_SPACE: usize = 512;

/// Maximum number of strands a layout can describe
pub const MAX_STRANDS: usize = 4;

/// Range of blocks driven by one strand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrandRange {
    /// Block number of the first pixel
    pub first_block: u16,
    /// Number of pixels on the strand
    pub pixels: u16,
}

impl StrandRange {
    pub const fn new(first_block: u16, pixels: u16) -> Self {
        Self {
            first_block,
            pixels,
        }
    }

    /// One past the last block of the range
    pub const fn end(self) -> u32 {
        self.first_block as u32 + self.pixels as u32
    }

    pub const fn contains(self, block: u16) -> bool {
        block >= self.first_block && (block as u32) < self.end()
    }

    const fn overlaps(self, other: Self) -> bool {
        (self.first_block as u32) < other.end() && (other.first_block as u32) < self.end()
    }
}

/// Where a block lands in the flat pixel array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLookup {
    /// The reserved "no block" sentinel
    Sentinel,
    /// Index into the flat pixel array
    Pixel(usize),
    /// Not covered by any strand
    OutOfRange,
}

/// Invalid strand layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("too many strands")]
    TooManyStrands,
    #[error("strand {0} overlaps strand {1}")]
    Overlap(usize, usize),
    #[error("strands need {needed} pixels, frame holds {capacity}")]
    PixelOverflow { needed: usize, capacity: usize },
    #[error("strand {0} extends past the block address space")]
    OutsideAddressSpace(usize),
    #[error("strand {0} covers the reserved block 0")]
    ReservedBlock(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Strand {
    range: StrandRange,
    offset: usize,
}

/// Validated mapping from blocks to pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrandLayout {
    strands: Vec<Strand, MAX_STRANDS>,
    pixels: usize,
}

impl StrandLayout {
    /// Build a layout for a frame holding `capacity` pixels
    pub fn new(ranges: &[StrandRange], capacity: usize) -> Result<Self, LayoutError> {
        let mut strands = Vec::new();
        let mut pixels = 0usize;

        for (index, range) in ranges.iter().copied().enumerate() {
            if range.contains(NO_BLOCK) {
                return Err(LayoutError::ReservedBlock(index));
            }
            if range.end() > BLOCK_ADDRESS_SPACE as u32 {
                return Err(LayoutError::OutsideAddressSpace(index));
            }
            if let Some(other) = ranges[..index].iter().position(|r| r.overlaps(range)) {
                return Err(LayoutError::Overlap(other, index));
            }
            strands
                .push(Strand {
                    range,
                    offset: pixels,
                })
                .map_err(|_| LayoutError::TooManyStrands)?;
            pixels += usize::from(range.pixels);
        }

        if pixels > capacity {
            return Err(LayoutError::PixelOverflow {
                needed: pixels,
                capacity,
            });
        }

        Ok(Self { strands, pixels })
    }

    /// Resolve a block number to a pixel index
    pub fn lookup(&self, block: u16) -> BlockLookup {
        if block == NO_BLOCK {
            return BlockLookup::Sentinel;
        }
        self.strands
            .iter()
            .find(|strand| strand.range.contains(block))
            .map_or(BlockLookup::OutOfRange, |strand| {
                BlockLookup::Pixel(strand.offset + usize::from(block - strand.range.first_block))
            })
    }

    pub fn strand_count(&self) -> usize {
        self.strands.len()
    }

    /// Pixel indices of one strand within the flat array
    pub fn strand_pixels(&self, strand: usize) -> Option<Range<usize>> {
        self.strands
            .get(strand)
            .map(|s| s.offset..s.offset + usize::from(s.range.pixels))
    }

    /// Total pixels across all strands
    pub const fn pixel_count(&self) -> usize {
        self.pixels
    }
}
