use nalgebra::Point2;

/// Location an engine flagged while looking for a symbol, in source-frame pixels.
///
/// Reported whether or not decoding ultimately succeeds.
pub type CandidatePoint = Point2<f32>;

/// Mirror a point around the vertical centre line of a frame `frame_width` wide.
#[inline]
pub fn mirror_x(p: CandidatePoint, frame_width: usize) -> CandidatePoint {
    Point2::new(frame_width as f32 - p.x, p.y)
}
