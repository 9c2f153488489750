mod gamma;

use smart_leds::RGB8;

pub use gamma::{GAMMA, gamma_correct, gamma8};

pub type Rgb = RGB8;

/// Unlit pixel
pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
