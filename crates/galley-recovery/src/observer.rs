//! Pipeline observer hooks
//!
//! Observers receive one [`StageEvent`] per stage boundary. They exist for
//! logging and debugging only and have no way to influence control flow:
//! the pipeline ignores anything an observer does.

use crate::repair::Rung;
use std::fmt;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Envelope unwrapping and escape decoding
    Normalize,
    /// Reasoning-trace removal
    StripTrace,
    /// Fence selection and markup removal
    StripMarkup,
    /// Bracketed region search
    LocateBoundary,
    /// One ladder rung plus its validation
    Repair(Rung),
    /// Regex harvesting of field fragments
    Harvest,
    /// Item synthesis from the reasoning trace
    TraceSynthesis,
    /// Guaranteed single-item fallback
    Fallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Normalize => f.write_str("normalize"),
            Stage::StripTrace => f.write_str("strip-trace"),
            Stage::StripMarkup => f.write_str("strip-markup"),
            Stage::LocateBoundary => f.write_str("locate-boundary"),
            Stage::Repair(rung) => write!(f, "repair:{rung}"),
            Stage::Harvest => f.write_str("harvest"),
            Stage::TraceSynthesis => f.write_str("trace-synthesis"),
            Stage::Fallback => f.write_str("fallback"),
        }
    }
}

/// What a stage did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage rewrote its input
    Changed,
    /// Stage left its input as it was
    Unchanged,
    /// Stage produced this many accepted items
    Accepted(usize),
    /// Stage produced nothing usable
    Rejected,
    /// Stage was not applicable
    Skipped,
}

/// Notification emitted at a stage boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    /// Stage that finished
    pub stage: Stage,
    /// Its outcome
    pub outcome: StageOutcome,
    /// Free-form diagnostic detail
    pub detail: String,
}

impl StageEvent {
    /// Create event
    #[inline]
    #[must_use]
    pub fn new(stage: Stage, outcome: StageOutcome, detail: impl Into<String>) -> Self {
        Self {
            stage,
            outcome,
            detail: detail.into(),
        }
    }
}

/// Receives stage notifications
pub trait RecoveryObserver: Send + Sync {
    /// Called once per stage boundary
    fn on_stage(&self, event: &StageEvent) {
        let _ = event;
    }
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RecoveryObserver for NoopObserver {}

/// Observer that forwards events to `tracing`
///
/// Stage events go out at `debug`; the guaranteed fallback firing is a
/// `warn`, since it means the upstream output was unusable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RecoveryObserver for TracingObserver {
    fn on_stage(&self, event: &StageEvent) {
        match (event.stage, event.outcome) {
            (Stage::Fallback, StageOutcome::Accepted(_)) => {
                tracing::warn!(stage = %event.stage, detail = %event.detail, "recovery fell back to synthetic annotation");
            }
            (stage, outcome) => {
                tracing::debug!(stage = %stage, outcome = ?outcome, detail = %event.detail, "recovery stage finished");
            }
        }
    }
}
