//! Cross-thread control of the segmentation pipeline.
//!
//! Configuration, enable/disable and frame requests may come from any thread. They
//! are queued here and serviced by the render thread inside its frame loop; nothing
//! in this module touches the GPU.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};

use crate::colormap::ColorSpec;
use crate::error::{Result, SegmentationError};
use crate::readout::CapturedFrame;

#[derive(Default)]
pub(crate) struct PendingControl {
    pub(crate) spec: Option<ColorSpec>,
    pub(crate) enabled: Option<bool>,
}

/// A frame read queued by a capture thread.
pub(crate) struct FrameRequest {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) buffer: Vec<u8>,
    pub(crate) reply: mpsc::Sender<Result<CapturedFrame>>,
}

/// Render-thread side of the control channel.
pub(crate) struct ControlInbox {
    pending: Arc<Mutex<PendingControl>>,
    frames: Receiver<FrameRequest>,
    sender: SyncSender<FrameRequest>,
}

impl ControlInbox {
    pub(crate) fn new() -> Self {
        let (sender, frames) = mpsc::sync_channel(1);
        ControlInbox {
            pending: Arc::new(Mutex::new(PendingControl::default())),
            frames,
            sender,
        }
    }

    pub(crate) fn handle(&self) -> ControlHandle {
        ControlHandle {
            pending: self.pending.clone(),
            frames: self.sender.clone(),
        }
    }

    /// Takes the pending configuration and enable changes, leaving the mailbox empty.
    pub(crate) fn take_pending(&self) -> PendingControl {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    }

    /// The next queued frame request, if any.
    pub(crate) fn next_frame_request(&self) -> Option<FrameRequest> {
        match self.frames.try_recv() {
            Ok(request) => Some(request),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Thread-safe handle used by configuration and capture threads.
///
/// Configuration and enable changes are stored in a single-slot mailbox (the last
/// write wins) and applied at the start of the next frame. Frame requests are answered
/// after the next frame's passes.
#[derive(Clone)]
pub struct ControlHandle {
    pending: Arc<Mutex<PendingControl>>,
    frames: SyncSender<FrameRequest>,
}

impl ControlHandle {
    /// Replaces the color tables at the start of the next frame.
    pub fn configure(&self, spec: ColorSpec) {
        self.pending().spec = Some(spec);
    }

    /// Turns segmentation on from the next frame.
    pub fn enable(&self) {
        self.pending().enabled = Some(true);
    }

    /// Turns segmentation off from the next frame.
    pub fn disable(&self) {
        self.pending().enabled = Some(false);
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, PendingControl> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a read of the next rendered frame into `buffer`.
    ///
    /// `buffer` must hold at least `width * height * 4` bytes. Blocks only while
    /// another request is still waiting to be serviced.
    pub fn request_frame(&self, width: u32, height: u32, buffer: Vec<u8>) -> Result<FrameTicket> {
        let (reply, receiver) = mpsc::channel();
        self.frames
            .send(FrameRequest {
                width,
                height,
                buffer,
                reply,
            })
            .map_err(|_| SegmentationError::Disconnected)?;
        Ok(FrameTicket { receiver })
    }
}

/// Pending answer to [`ControlHandle::request_frame`].
pub struct FrameTicket {
    receiver: mpsc::Receiver<Result<CapturedFrame>>,
}

impl FrameTicket {
    /// Blocks until the render thread serviced the request.
    pub fn wait(self) -> Result<CapturedFrame> {
        self.receiver
            .recv()
            .map_err(|_| SegmentationError::Disconnected)?
    }

    /// Returns the frame if the request was already serviced.
    pub fn try_take(&self) -> Option<Result<CapturedFrame>> {
        match self.receiver.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SegmentationError::Disconnected)),
        }
    }
}
