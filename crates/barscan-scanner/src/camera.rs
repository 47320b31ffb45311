//! Camera backend contract and the frame type it delivers.

use std::fmt;

use barscan_core::{orient, FrameLayout, PixelBuffer, PixelError, Rotation};
use crossbeam_channel::Sender;

use crate::{CameraError, LensFacing};

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// One luminance plane from the camera.
///
/// The release hook runs exactly once when the frame is dropped, whatever
/// happened to it. Backends use it to hand the underlying buffer back and
/// let the next frame through.
pub struct Frame {
    data: Vec<u8>,
    layout: FrameLayout,
    rotation_degrees: i32,
    release: Option<ReleaseHook>,
}

impl Frame {
    pub fn new(data: Vec<u8>, layout: FrameLayout, rotation_degrees: i32) -> Self {
        Self {
            data,
            layout,
            rotation_degrees,
            release: None,
        }
    }

    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Clockwise rotation needed to display the frame upright.
    pub fn rotation_degrees(&self) -> i32 {
        self.rotation_degrees
    }

    /// Normalize and orient the plane, mirroring first when `mirrored`.
    ///
    /// Moves the pixel data out; the frame itself stays alive until dropped.
    pub(crate) fn take_oriented(&mut self, mirrored: bool) -> Result<PixelBuffer, PixelError> {
        let rotation = Rotation::from_degrees(self.rotation_degrees)?;
        orient(std::mem::take(&mut self.data), self.layout, rotation, mirrored)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.data.len())
            .field("layout", &self.layout)
            .field("rotation_degrees", &self.rotation_degrees)
            .finish_non_exhaustive()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Where a bound camera delivers frames.
#[derive(Clone, Debug)]
pub struct FrameSink {
    tx: Sender<Frame>,
}

impl FrameSink {
    pub(crate) fn new(tx: Sender<Frame>) -> Self {
        Self { tx }
    }

    /// Queue a frame for analysis. Never blocks.
    ///
    /// Returns `false` once the session has ended; the frame is dropped and
    /// released immediately in that case.
    pub fn deliver(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Access to the device's cameras.
pub trait CameraProvider: Send + Sync {
    /// Bind a camera for `lens` and start delivering frames to `sink`.
    ///
    /// May block for as long as the hardware needs; never called on the
    /// control thread.
    fn bind(&self, lens: LensFacing, sink: FrameSink) -> Result<Box<dyn CameraHandle>, CameraError>;
}

/// A bound camera.
pub trait CameraHandle: Send {
    fn set_torch(&mut self, enabled: bool) -> Result<(), CameraError>;

    /// Stop delivering frames and release the camera.
    fn unbind(self: Box<Self>);
}
