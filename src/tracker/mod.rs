mod completion;
mod job;
mod status;

pub use completion::{CompletionTracker, JobDriver, Pause, TokioPause};
pub use job::{Batch, ExportFlags, ExportType, Job, OperationKind, Phase, PhaseTiming, Project};
pub use status::{JobStatus, Observation, StatusIndicators};
