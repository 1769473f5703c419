// Error taxonomy for the detector's public surface.
//
// Internal helpers use anyhow for context-rich errors; the boundary
// collapses them into two variants callers can match on. Acquisition
// failures always propagate. Inference failures only surface under
// fail-closed — the default policy absorbs them (see detector.rs).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// Remote fetch or model initialization failed. No partial handle is
    /// exposed; every caller awaiting readiness sees this error.
    #[error("model acquisition failed: {0}")]
    Acquisition(#[source] anyhow::Error),

    /// The classification call failed. Only surfaced under
    /// [`FailPolicy::Closed`](crate::config::FailPolicy::Closed).
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),
}
