//! Error type shared by the segmentation pipeline.
//!
//! Only GPU-level failures are reported through this type. Shader build failures
//! degrade the pipeline to pass-through instead, and missing color mappings are
//! resolved internally.

/// Errors surfaced to the caller of the frame-render and read-back entry points.
#[derive(thiserror::Error, Debug)]
pub enum SegmentationError {
    /// No usable GPU adapter or device could be obtained.
    #[error("device error: {0}")]
    Device(String),

    /// The offscreen target could not be (re)allocated. Fatal for the current frame.
    #[error("failed to allocate a {width}x{height} offscreen target: {reason}")]
    TargetAllocation {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Copying pixels back from the GPU failed.
    #[error("readback error: {0}")]
    Readback(String),

    /// The caller-supplied pixel buffer cannot hold the requested frame.
    #[error("pixel buffer too small: {needed} bytes needed, {got} available")]
    BufferTooSmall { needed: usize, got: usize },

    /// The host's scene-render callback failed.
    #[error("scene render failed: {0}")]
    Scene(String),

    /// The render thread owning the pipeline is gone.
    #[error("the renderer is no longer running")]
    Disconnected,
}

impl SegmentationError {
    /// Shorthand for [`SegmentationError::Scene`].
    pub fn scene<T: ToString>(msg: T) -> Self {
        SegmentationError::Scene(msg.to_string())
    }

    /// Shorthand for [`SegmentationError::Readback`].
    pub fn readback<T: ToString>(msg: T) -> Self {
        SegmentationError::Readback(msg.to_string())
    }

    /// Shorthand for [`SegmentationError::TargetAllocation`].
    pub fn allocation<T: ToString>(width: u32, height: u32, reason: T) -> Self {
        SegmentationError::TargetAllocation {
            width,
            height,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentationError>;
