//! Output gamma curve
//!
//! Every block color passes through this curve when it is written into the
//! frame buffer, so palette values can be authored in perceptual space.

use crate::color::Rgb;

/// Exponent of the output curve
pub const GAMMA: f32 = 2.0;

/// Correct a single channel: `round((value / 255) ^ GAMMA * 255)`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gamma8(value: u8) -> u8 {
    let normalized = f32::from(value) / 255.0;
    let corrected = libm::roundf(libm::powf(normalized, GAMMA) * 255.0);
    corrected.clamp(0.0, 255.0) as u8
}

/// Correct all three channels of a color
pub fn gamma_correct(color: Rgb) -> Rgb {
    Rgb {
        r: gamma8(color.r),
        g: gamma8(color.g),
        b: gamma8(color.b),
    }
}
