use barscan_core::CandidatePoint;

use crate::{ErrorContext, ScanError, ScanResult};

/// Receives results and errors. Always called on the control thread.
pub trait ScanListener: Send + Sync {
    fn on_result(&self, result: ScanResult);

    fn on_error(&self, context: ErrorContext, error: ScanError);
}

/// Optional overlay sink for the points an engine looked at.
///
/// Called on the control thread, possibly many times per frame. Implementors
/// should age out old points themselves.
pub trait PointListener: Send + Sync {
    /// Size of the oriented frame the following points belong to.
    fn set_frame_size(&self, width: usize, height: usize);

    fn on_candidate_point(&self, point: CandidatePoint);
}
