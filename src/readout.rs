//! Frame read-back.

use image::RgbaImage;

use crate::backend::RenderBackend;
use crate::error::{Result, SegmentationError};
use crate::resource::OffscreenTargetManager;

/// Bytes per pixel of a read-back buffer (B, G, R, A).
pub const BYTES_PER_PIXEL: usize = 4;

/// Size in bytes of a BGRA buffer holding `width` x `height` pixels.
pub fn buffer_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// Copies the most recent frame into `out` as tightly packed BGRA rows, top row first.
///
/// The segmentation target is read if the current frame drew into it, the main
/// target otherwise. The region read is the top-left corner of the source, clamped to
/// the requested size, and its actual dimensions are returned: only the first
/// `actual_width * actual_height * 4` bytes of `out` are meaningful.
///
/// # Errors
/// [`SegmentationError::BufferTooSmall`] if `out` cannot hold
/// `requested_width * requested_height` pixels, or any read-back failure of the
/// backend.
pub fn read_frame<B: RenderBackend>(
    backend: &mut B,
    targets: &OffscreenTargetManager<B::Target>,
    requested_width: u32,
    requested_height: u32,
    out: &mut [u8],
) -> Result<(u32, u32)> {
    let needed = buffer_size(requested_width, requested_height);
    if out.len() < needed {
        return Err(SegmentationError::BufferTooSmall {
            needed,
            got: out.len(),
        });
    }

    let (source, (source_width, source_height)) = match (targets.used_this_frame(), targets.size())
    {
        (true, Some(size)) => (targets.target(), size),
        _ => {
            log::debug!("segmentation target not drawn this frame, reading the main target");
            (None, backend.main_target_size())
        }
    };

    let width = source_width.min(requested_width);
    let height = source_height.min(requested_height);
    if (width, height) != (requested_width, requested_height) {
        log::warn!(
            "requested a {}x{} frame, reading {}x{}",
            requested_width,
            requested_height,
            width,
            height
        );
    }

    backend.read_pixels(source, width, height, &mut out[..buffer_size(width, height)])?;
    Ok((width, height))
}

/// A frame handed back to a capture thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedFrame {
    /// The caller's buffer. Only the first `width * height * 4` bytes are valid.
    pub buffer: Vec<u8>,
    /// Width of the valid region.
    pub width: u32,
    /// Height of the valid region.
    pub height: u32,
}

impl CapturedFrame {
    /// The valid BGRA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.buffer[..buffer_size(self.width, self.height).min(self.buffer.len())]
    }

    /// The BGRA bytes of pixel `(x, y)`, top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.buffer.get(start..start + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Converts the frame to an RGBA image, e.g. to save a segmentation mask.
    pub fn to_image(&self) -> Option<RgbaImage> {
        let rgba = self
            .pixels()
            .chunks_exact(BYTES_PER_PIXEL)
            .flat_map(|px| [px[2], px[1], px[0], px[3]])
            .collect();
        RgbaImage::from_vec(self.width, self.height, rgba)
    }
}
