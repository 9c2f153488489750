/// Scale an 8-bit value by a factor (0-255 = 0.0-1.0)
///
/// Uses integer math for efficiency on embedded systems.
#[inline]
#[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
pub const fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Scale an 8-bit value with two-phase binary dithering
///
/// Even phases round a quarter step down, odd phases a quarter step up, so
/// consecutive frames average out to the unquantized value. Black stays black.
#[inline]
#[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
pub const fn scale8_dithered(value: u8, scale: u8, phase: u8) -> u8 {
    if value == 0 {
        return 0;
    }
    let offset: u16 = if phase & 1 == 0 { 0x40 } else { 0xC0 };
    let scaled = (value as u16 * (1 + scale as u16) + offset) >> 8;
    if scaled > 255 { 255 } else { scaled as u8 }
}

/// Convert a 0.0-1.0 level to an 8-bit scale factor
///
/// Out-of-range and NaN inputs are clamped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn unit_to_u8(level: f32) -> u8 {
    if level.is_nan() {
        return 0;
    }
    libm::roundf(level.clamp(0.0, 1.0) * 255.0) as u8
}
