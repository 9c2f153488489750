//! Per-pixel frame state for all strands

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::color::{BLACK, Rgb, gamma_correct};
use crate::layout::{BlockLookup, LayoutError, StrandLayout, StrandRange};

/// Outcome of writing a color to a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWrite {
    Written,
    /// Block 0, silently ignored
    Sentinel,
    /// Not covered by any strand, reported and ignored
    OutOfRange,
}

/// Counters collected during one render call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Block writes that landed on a pixel
    pub drawn: u16,
    /// Block writes dropped because the block is outside every strand
    pub skipped: u16,
}

impl RenderStats {
    pub(crate) fn record(&mut self, write: BlockWrite) {
        match write {
            BlockWrite::Written => self.drawn = self.drawn.saturating_add(1),
            BlockWrite::OutOfRange => self.skipped = self.skipped.saturating_add(1),
            BlockWrite::Sentinel => {}
        }
    }
}

/// Frame buffer for up to `N` pixels split across strands
#[derive(Debug, Clone)]
pub struct FrameBuffer<const N: usize> {
    layout: StrandLayout,
    pixels: [Rgb; N],
}

impl<const N: usize> FrameBuffer<N> {
    /// Create a cleared frame for the given strand ranges
    pub fn new(ranges: &[StrandRange]) -> Result<Self, LayoutError> {
        Ok(Self {
            layout: StrandLayout::new(ranges, N)?,
            pixels: [BLACK; N],
        })
    }

    pub const fn layout(&self) -> &StrandLayout {
        &self.layout
    }

    /// Set every pixel to black
    pub fn clear(&mut self) {
        self.pixels.fill(BLACK);
    }

    /// Gamma-correct `color` and write it to the pixel behind `block`
    pub fn set_block(&mut self, block: u16, color: Rgb) -> BlockWrite {
        match self.layout.lookup(block) {
            BlockLookup::Pixel(index) => {
                self.pixels[index] = gamma_correct(color);
                BlockWrite::Written
            }
            BlockLookup::Sentinel => BlockWrite::Sentinel,
            BlockLookup::OutOfRange => {
                #[cfg(feature = "esp32-log")]
                println!("Block {} is out of range for all strands.", block);
                BlockWrite::OutOfRange
            }
        }
    }

    /// Read the (already corrected) color of a block
    pub fn block(&self, block: u16) -> Option<Rgb> {
        match self.layout.lookup(block) {
            BlockLookup::Pixel(index) => Some(self.pixels[index]),
            BlockLookup::Sentinel | BlockLookup::OutOfRange => None,
        }
    }

    /// Pixels of one strand
    pub fn strand(&self, strand: usize) -> Option<&[Rgb]> {
        self.layout
            .strand_pixels(strand)
            .map(|range| &self.pixels[range])
    }

    pub(crate) fn strand_mut(&mut self, strand: usize) -> Option<&mut [Rgb]> {
        self.layout
            .strand_pixels(strand)
            .map(|range| &mut self.pixels[range])
    }

    /// All pixels in strand order
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels[..self.layout.pixel_count()]
    }

    pub(crate) fn copy_pixels_from(&mut self, other: &Self) {
        self.pixels = other.pixels;
    }
}
