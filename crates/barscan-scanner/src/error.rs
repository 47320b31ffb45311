use std::fmt;

use barscan_core::PixelError;
use serde::{Deserialize, Serialize};

/// Failures reported by a camera backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("torch not supported by this camera")]
    TorchUnsupported,
    #[error("{0}")]
    Other(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("a scan session is already starting or running")]
    AlreadyActive,
    #[error(transparent)]
    Frame(#[from] PixelError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("analysis fault: {0}")]
    AnalysisFault(String),
    #[error("failed to spawn {thread} thread: {reason}")]
    Spawn {
        thread: &'static str,
        reason: String,
    },
}

/// Where in the pipeline an error reported through `on_error` arose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorContext {
    /// Binding the camera failed; the session is gone.
    Binding,
    /// One frame could not be normalized; scanning continues.
    ImageProcessing,
    /// The analysis step faulted; the session stopped itself.
    Analysis,
}

impl ErrorContext {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binding => "binding",
            Self::ImageProcessing => "image-processing",
            Self::Analysis => "analysis",
        }
    }

    /// Whether the session survives an error in this context.
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::ImageProcessing)
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ScanIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
