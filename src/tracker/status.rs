use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse lifecycle status of a single triggered job.
///
/// Each job flows through: UNTRIGGERED → {PENDING, PROCESSING} → {PASSED, FAILED} | INCOMPLETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// No correlation key was obtained; the job is never probed.
    Untriggered,
    /// Triggered, but the listing shows no progress indicator (or no row yet).
    Pending,
    /// The listing shows the progress spinner.
    Processing,
    Passed,
    Failed,
    /// Retry budget exhausted while still pending or processing.
    Incomplete,
}

impl JobStatus {
    /// `Passed`, `Failed` and `Incomplete` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Passed | JobStatus::Failed | JobStatus::Incomplete)
    }

    /// Pending or processing: the tracker still has to probe it.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Untriggered => write!(f, "Untriggered"),
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Processing => write!(f, "Processing"),
            JobStatus::Passed => write!(f, "Passed"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Incomplete => write!(f, "Incomplete"),
        }
    }
}

/// Which status icons were found in a listing row's status cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusIndicators {
    pub success: bool,
    pub failure: bool,
    pub progress: bool,
}

impl StatusIndicators {
    /// Priority-ordered classification: success, then failure, then progress.
    /// A row with none of the icons is still waiting in the queue.
    pub fn classify(self) -> JobStatus {
        if self.success {
            JobStatus::Passed
        } else if self.failure {
            JobStatus::Failed
        } else if self.progress {
            JobStatus::Processing
        } else {
            JobStatus::Pending
        }
    }
}

/// One answer from the status prober.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Text of the row's update-time cell; empty when the row is not visible.
    pub updated_at: String,
    pub status: JobStatus,
}

impl Observation {
    pub fn new(updated_at: impl Into<String>, status: JobStatus) -> Self {
        Self {
            updated_at: updated_at.into(),
            status,
        }
    }

    /// The row for the correlation key is not listed yet.
    pub fn not_visible() -> Self {
        Self::new(String::new(), JobStatus::Pending)
    }
}
