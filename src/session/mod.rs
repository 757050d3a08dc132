//! Unattended application session: the per-link control loop and its
//! supporting pieces.

mod context;
mod executor;
mod runner;
mod signature;
mod stagnation;

#[cfg(test)]
pub(crate) mod testkit;

pub use context::{fingerprint, JobContext};
pub use executor::{perform_all, ExecutionReport, SUCCESS_MARKER};
pub use runner::SessionRunner;
pub use signature::{signature, Signature};
pub use stagnation::{Progress, StagnationDetector};

/// Terminal status of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failed,
    HumanIntervention,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "Success",
            OutcomeStatus::Failed => "Failed",
            OutcomeStatus::HumanIntervention => "Human Intervention",
        }
    }
}

/// Everything known about one link once its loop has terminated.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub link: String,
    pub status: OutcomeStatus,
    /// Present for human-intervention outcomes, and for failures with a
    /// diagnosable cause
    pub reason: Option<String>,
    pub summary: JobContext,
}
