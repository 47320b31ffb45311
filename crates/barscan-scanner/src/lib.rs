//! Live-camera barcode scanning.
//!
//! [`ScanOrchestrator`] owns the session state machine
//! (`Idle → Starting → Running → Stopped`), binds a camera through a
//! [`CameraProvider`], decodes its frames on a dedicated worker thread and
//! delivers results to a [`ScanListener`] on the control thread via a
//! [`ControlExecutor`].

mod camera;
mod error;
mod executor;
mod listener;
mod options;
mod orchestrator;

pub use camera::{CameraHandle, CameraProvider, Frame, FrameSink};
pub use error::{CameraError, ErrorContext, ScanError, ScanIoError};
pub use executor::{ControlExecutor, ControlHandle, ControlLoop, Task};
pub use listener::{PointListener, ScanListener};
pub use options::{LensFacing, ScanConfig, ScanMode, ScanOptions, ScanResult, ScanState};
pub use orchestrator::ScanOrchestrator;
