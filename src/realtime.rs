//! Live map rendering from the accepted event schedule
//!
//! Several events may resolve to the same block in one frame. The highest
//! color id wins; an equal id re-commits the same color.

use crate::frame::{FrameBuffer, RenderStats};
use crate::layout::BLOCK_ADDRESS_SPACE;
use crate::schedule::{ColorId, EventSchedule};

#[cfg(feature = "esp32-log")]
use esp_println::println;

/// Highest color id committed to each block during one render call
pub struct BlockPriority {
    committed: [Option<ColorId>; BLOCK_ADDRESS_SPACE],
}

impl Default for BlockPriority {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPriority {
    pub const fn new() -> Self {
        Self {
            committed: [None; BLOCK_ADDRESS_SPACE],
        }
    }

    /// Commit `color_id` to `block` unless a higher id is already there
    ///
    /// Unset blocks compare as 0. Returns `false` when the commit was refused
    /// or the block lies outside the address space.
    pub fn commit(&mut self, block: u16, color_id: ColorId) -> bool {
        let Some(slot) = self.committed.get_mut(usize::from(block)) else {
            return false;
        };
        if color_id < slot.unwrap_or(0) {
            return false;
        }
        *slot = Some(color_id);
        true
    }

    pub fn get(&self, block: u16) -> Option<ColorId> {
        self.committed.get(usize::from(block)).copied().flatten()
    }

    /// Blocks with a committed color id, in block order
    #[allow(clippy::cast_possible_truncation)]
    pub fn committed(&self) -> impl Iterator<Item = (u16, ColorId)> + '_ {
        self.committed
            .iter()
            .enumerate()
            .filter_map(|(block, id)| id.map(|id| (block as u16, id)))
    }
}

/// Renders the event schedule at a wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct RealtimeRenderer;

impl RealtimeRenderer {
    /// Clear `frame` and draw every event at epoch second `now`
    pub fn render<const N: usize>(
        self,
        schedule: &EventSchedule,
        now: i64,
        frame: &mut FrameBuffer<N>,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        let mut priority = BlockPriority::new();

        frame.clear();

        for event in schedule.events() {
            let block = event.target_block(now);
            if usize::from(block) >= BLOCK_ADDRESS_SPACE {
                #[cfg(feature = "esp32-log")]
                println!("Block {} is outside the block address space.", block);
                stats.skipped = stats.skipped.saturating_add(1);
                continue;
            }
            priority.commit(block, event.color_id);
        }

        let colors = schedule.colors();
        for (block, color_id) in priority.committed() {
            stats.record(frame.set_block(block, colors.resolve(color_id)));
        }

        stats
    }
}
