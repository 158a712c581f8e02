//! Flat segmentation colors.
//!
//! Every surface drawn during the segmentation pass receives a single 24-bit RGB color.
//! This module provides the [`SegColor`] type along with the packing helpers used to
//! move colors between configuration tables, shader uniforms and BGRA read-back buffers.
//!
//! # Example
//! ```
//! use segmap3d::color::{self, SegColor};
//!
//! let c = color::from_bytes(&[10, 20, 30]);
//! assert_eq!(c, SegColor::new(10, 20, 30));
//! assert_eq!(color::pack(c), 0x0A141E);
//! assert_eq!(color::to_bgra(c), [30, 20, 10, 255]);
//! ```

pub use rgb::RGB8;

/// The color type used for segmentation classes. 8 bits per channel, no alpha.
pub type SegColor = RGB8;

// ============================================================================
// Reserved colors
// ============================================================================

/// Color given to draws that match no class and no surface: black.
pub const UNCLASSIFIED: SegColor = SegColor::new(0, 0, 0);

/// Default color of the sun texture.
pub const SUN: SegColor = SegColor::new(255, 255, 0);

/// Default color of the moon texture.
pub const MOON: SegColor = SegColor::new(255, 255, 255);

/// Opaque alpha mask applied to packed ARGB values.
pub const OPAQUE: u32 = 0xFF00_0000;

// ============================================================================
// Conversions
// ============================================================================

/// Builds a color from a raw `[R, G, B]` byte triple.
///
/// Missing trailing bytes are treated as zero and extra bytes are ignored, so a
/// truncated configuration entry never fails.
pub fn from_bytes(bytes: &[u8]) -> SegColor {
    let channel = |i: usize| bytes.get(i).copied().unwrap_or(0);
    SegColor::new(channel(0), channel(1), channel(2))
}

/// Packs a color as `0x00RRGGBB`.
#[inline]
pub fn pack(c: SegColor) -> u32 {
    ((c.r as u32) << 16) | ((c.g as u32) << 8) | c.b as u32
}

/// Unpacks the low 24 bits of `rgb` (`0x??RRGGBB`). The high byte is discarded.
#[inline]
pub fn unpack(rgb: u32) -> SegColor {
    SegColor::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Packs a color as `0xFFRRGGBB`, alpha forced opaque.
#[inline]
pub fn opaque_argb(c: SegColor) -> u32 {
    OPAQUE | pack(c)
}

/// The BGRA bytes a fully opaque pixel of this color has in a read-back buffer.
#[inline]
pub fn to_bgra(c: SegColor) -> [u8; 4] {
    [c.b, c.g, c.r, 255]
}

/// The three integer uniform values (0 to 255 each) pushed to the override shader.
#[inline]
pub fn to_uniforms(c: SegColor) -> [i32; 3] {
    [c.r as i32, c.g as i32, c.b as i32]
}
