//! Best-candidate selection

use crate::core::LocationFix;
use thiserror::Error;

/// A candidate replaces the running best when it is this much more accurate (meters)
pub const ACCURACY_IMPROVEMENT_M: f32 = 50.0;

/// ...or when it is this much newer (milliseconds)
pub const RECENCY_GAP_MS: i64 = 10_000;

/// ...and not worse than this (meters, negative improvement)
pub const RECENCY_MAX_REGRESSION_M: f32 = -100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no candidates to select from")]
    EmptyInput,
}

/// Pick the best fix with a single left-to-right scan.
///
/// A later candidate wins if it improves accuracy by more than 50 m, or if it
/// is more than 10 s newer and no more than 100 m worse. Otherwise the
/// earlier fix is kept.
pub fn select(candidates: &[LocationFix]) -> Result<&LocationFix, SelectError> {
    let (first, rest) = candidates.split_first().ok_or(SelectError::EmptyInput)?;

    let best = rest.iter().fold(first, |best, candidate| {
        let improvement = best.accuracy_m - candidate.accuracy_m;
        let gap_ms = candidate.timestamp_ms as i64 - best.timestamp_ms as i64;

        if improvement > ACCURACY_IMPROVEMENT_M
            || (gap_ms > RECENCY_GAP_MS && improvement > RECENCY_MAX_REGRESSION_M)
        {
            candidate
        } else {
            best
        }
    });

    Ok(best)
}
