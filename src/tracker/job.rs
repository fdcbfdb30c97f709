use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::status::{JobStatus, Observation};
use crate::error::FailureKind;

/// A project as listed in the Inoculator UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Checkbox settings for one export package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFlags {
    pub encrypted: bool,
    pub obfuscated: bool,
    pub clean: bool,
}

/// The seven non-empty combinations of export flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportType {
    Encrypted,
    Obfuscated,
    Clean,
    All3,
    EncClean,
    ObsClean,
    EncObs,
}

impl ExportType {
    /// Report column order.
    pub const ALL: [ExportType; 7] = [
        ExportType::Encrypted,
        ExportType::Obfuscated,
        ExportType::Clean,
        ExportType::All3,
        ExportType::EncClean,
        ExportType::ObsClean,
        ExportType::EncObs,
    ];

    pub fn flags(self) -> ExportFlags {
        let (encrypted, obfuscated, clean) = match self {
            ExportType::Encrypted => (true, false, false),
            ExportType::Obfuscated => (false, true, false),
            ExportType::Clean => (false, false, true),
            ExportType::All3 => (true, true, true),
            ExportType::EncClean => (true, false, true),
            ExportType::ObsClean => (false, true, true),
            ExportType::EncObs => (true, true, false),
        };
        ExportFlags {
            encrypted,
            obfuscated,
            clean,
        }
    }

    /// Column label used in the export sheet.
    pub fn label(self) -> &'static str {
        match self {
            ExportType::Encrypted => "Encrypted",
            ExportType::Obfuscated => "Obfuscated",
            ExportType::Clean => "Clean",
            ExportType::All3 => "All 3",
            ExportType::EncClean => "Enc+Clean",
            ExportType::ObsClean => "Obs+Clean",
            ExportType::EncObs => "Enc+Obs",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three run phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Generate,
    Simulate,
    Export,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Generate => write!(f, "GENERATE"),
            Phase::Simulate => write!(f, "SIMULATE"),
            Phase::Export => write!(f, "EXPORT"),
        }
    }
}

/// What a job asks the external system to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Generate,
    /// Generation with the CAM option ticked.
    GenerateWithOption,
    Simulate,
    Export(ExportType),
}

impl OperationKind {
    pub fn phase(self) -> Phase {
        match self {
            OperationKind::Generate | OperationKind::GenerateWithOption => Phase::Generate,
            OperationKind::Simulate => Phase::Simulate,
            OperationKind::Export(_) => Phase::Export,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Generate => write!(f, "generate"),
            OperationKind::GenerateWithOption => write!(f, "generate+CAM"),
            OperationKind::Simulate => write!(f, "simulate"),
            OperationKind::Export(t) => write!(f, "export[{t}]"),
        }
    }
}

/// Fixed wait schedule for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Pause between the trigger pass and the first probe pass.
    pub warmup_secs: u64,
    /// Pause between two probe passes.
    pub retry_delay_secs: u64,
    /// Maximum number of probe passes before giving up.
    pub max_cycles: u32,
}

impl PhaseTiming {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Generation finishes quickly and is polled right away.
    pub fn generate() -> Self {
        Self {
            warmup_secs: 0,
            retry_delay_secs: 30,
            max_cycles: 20,
        }
    }

    pub fn simulate() -> Self {
        Self {
            warmup_secs: 900,
            retry_delay_secs: 300,
            max_cycles: 6,
        }
    }

    pub fn export() -> Self {
        Self {
            warmup_secs: 1200,
            retry_delay_secs: 300,
            max_cycles: 6,
        }
    }
}

/// Mutable outcome of one job. `completed_at` is only written on a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    pub started_at: String,
    pub completed_at: String,
    pub probes: u32,
    /// Last probe error. The status is still reported as `Failed`.
    pub probe_error: Option<String>,
    /// Set when the final status came from the tool rather than the listing.
    pub failure: Option<FailureKind>,
}

impl Default for JobResult {
    fn default() -> Self {
        Self {
            status: JobStatus::Untriggered,
            started_at: String::new(),
            completed_at: String::new(),
            probes: 0,
            probe_error: None,
            failure: None,
        }
    }
}

impl JobResult {
    /// Applies one probe answer. Returns `false` if the job was already terminal
    /// and the observation was ignored.
    pub fn apply_probe(&mut self, observation: &Observation) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.probes += 1;
        self.status = observation.status;
        if observation.status.is_terminal() {
            self.completed_at = observation.updated_at.clone();
        }
        true
    }

    /// A probe that errored is recorded as `Failed` with no completion time.
    pub fn apply_probe_error(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.probes += 1;
        self.status = JobStatus::Failed;
        self.completed_at.clear();
        self.probe_error = Some(message.into());
        self.failure = Some(FailureKind::Probe);
        true
    }

    /// Retry budget exhausted: in-flight jobs become `Incomplete`.
    pub fn force_incomplete(&mut self) -> bool {
        if self.status.is_in_flight() {
            self.status = JobStatus::Incomplete;
            self.failure = Some(FailureKind::Timeout);
            true
        } else {
            false
        }
    }
}

/// One (project, operation) unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub project: Project,
    pub kind: OperationKind,
    /// Creation timestamp observed after triggering; `None` if the trigger failed.
    pub key: Option<String>,
    pub result: JobResult,
}

impl Job {
    pub fn new(project: Project, kind: OperationKind) -> Self {
        Self {
            project,
            kind,
            key: None,
            result: JobResult::default(),
        }
    }

    /// Records a successful trigger. Empty keys count as a failed trigger.
    pub fn mark_triggered(&mut self, key: String) -> bool {
        let key = key.trim().to_string();
        if key.is_empty() {
            return false;
        }
        self.result.status = JobStatus::Pending;
        self.result.started_at = key.clone();
        self.key = Some(key);
        true
    }

    /// The trigger raised or produced no key; the job stays `Untriggered`.
    pub fn mark_trigger_failed(&mut self) {
        self.key = None;
        self.result.status = JobStatus::Untriggered;
        self.result.failure = Some(FailureKind::Trigger);
    }

    /// Keyed and not yet terminal.
    pub fn needs_probe(&self) -> bool {
        self.key.is_some() && self.result.status.is_in_flight()
    }

    pub fn status(&self) -> JobStatus {
        self.result.status
    }
}

/// All jobs of one phase run, in trigger/probe order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub phase: Phase,
    pub jobs: Vec<Job>,
}

impl Batch {
    /// One job per project.
    pub fn per_project(projects: &[Project], kind: OperationKind) -> Self {
        Self {
            phase: kind.phase(),
            jobs: projects
                .iter()
                .map(|p| Job::new(p.clone(), kind))
                .collect(),
        }
    }

    /// Projects × export types, project-major.
    pub fn export(projects: &[Project]) -> Self {
        let jobs = projects
            .iter()
            .flat_map(|p| {
                ExportType::ALL
                    .iter()
                    .map(move |t| Job::new(p.clone(), OperationKind::Export(*t)))
            })
            .collect();
        Self {
            phase: Phase::Export,
            jobs,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn find(&self, project_id: &str, kind: OperationKind) -> Option<&Job> {
        self.jobs
            .iter()
            .find(|j| j.project.id == project_id && j.kind == kind)
    }

    #[cfg(test)]
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status() == status).count()
    }

    /// Number of jobs still waiting on a probe.
    pub fn in_flight(&self) -> usize {
        self.jobs.iter().filter(|j| j.needs_probe()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new("0bce4ca1", "exclusiveaccess_aligned_address")
    }

    #[test]
    fn export_flags_are_distinct_and_non_empty() {
        let mut seen = Vec::new();
        for t in ExportType::ALL {
            let f = t.flags();
            assert!(f.encrypted || f.obfuscated || f.clean, "{t} has no flag set");
            assert!(!seen.contains(&f), "{t} duplicates another combination");
            seen.push(f);
        }
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn export_labels() {
        assert_eq!(ExportType::All3.label(), "All 3");
        assert_eq!(ExportType::EncClean.to_string(), "Enc+Clean");
        assert_eq!(ExportType::EncObs.label(), "Enc+Obs");
    }

    #[test]
    fn new_job_is_untriggered() {
        let job = Job::new(project(), OperationKind::Simulate);
        assert_eq!(job.status(), JobStatus::Untriggered);
        assert!(job.key.is_none());
        assert!(!job.needs_probe());
        assert!(job.result.started_at.is_empty());
    }

    #[test]
    fn mark_triggered_records_key_as_start() {
        let mut job = Job::new(project(), OperationKind::Generate);
        assert!(job.mark_triggered(" 2025-01-02 10:00 ".into()));
        assert_eq!(job.key.as_deref(), Some("2025-01-02 10:00"));
        assert_eq!(job.result.started_at, "2025-01-02 10:00");
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.needs_probe());
    }

    #[test]
    fn blank_key_leaves_job_untriggered() {
        let mut job = Job::new(project(), OperationKind::Generate);
        assert!(!job.mark_triggered("   ".into()));
        assert_eq!(job.status(), JobStatus::Untriggered);
        assert!(job.key.is_none());
        job.mark_trigger_failed();
        assert_eq!(job.result.failure, Some(FailureKind::Trigger));
    }

    #[test]
    fn completed_at_only_set_on_terminal() {
        let mut result = JobResult {
            status: JobStatus::Pending,
            ..Default::default()
        };
        result.apply_probe(&Observation::new("10:05", JobStatus::Processing));
        assert_eq!(result.status, JobStatus::Processing);
        assert!(result.completed_at.is_empty());

        result.apply_probe(&Observation::new("10:20", JobStatus::Passed));
        assert_eq!(result.status, JobStatus::Passed);
        assert_eq!(result.completed_at, "10:20");
        assert_eq!(result.probes, 2);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut result = JobResult {
            status: JobStatus::Pending,
            ..Default::default()
        };
        result.apply_probe(&Observation::new("10:20", JobStatus::Failed));
        assert!(!result.apply_probe(&Observation::new("10:30", JobStatus::Passed)));
        assert!(!result.apply_probe_error("boom"));
        assert!(!result.force_incomplete());
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.completed_at, "10:20");
        assert_eq!(result.probes, 1);
    }

    #[test]
    fn probe_error_becomes_failed_without_timestamp() {
        let mut result = JobResult {
            status: JobStatus::Processing,
            ..Default::default()
        };
        assert!(result.apply_probe_error("element went stale"));
        assert_eq!(result.status, JobStatus::Failed);
        assert!(result.completed_at.is_empty());
        assert_eq!(result.probe_error.as_deref(), Some("element went stale"));
        assert_eq!(result.failure, Some(FailureKind::Probe));
    }

    #[test]
    fn force_incomplete_skips_untriggered() {
        let mut untriggered = JobResult::default();
        assert!(!untriggered.force_incomplete());
        assert_eq!(untriggered.status, JobStatus::Untriggered);

        let mut pending = JobResult {
            status: JobStatus::Pending,
            ..Default::default()
        };
        assert!(pending.force_incomplete());
        assert_eq!(pending.status, JobStatus::Incomplete);
        assert_eq!(pending.failure, Some(FailureKind::Timeout));
    }

    #[test]
    fn export_batch_is_project_major() {
        let projects = vec![Project::new("a", "A"), Project::new("b", "B")];
        let batch = Batch::export(&projects);
        assert_eq!(batch.len(), 14);
        assert_eq!(batch.phase, Phase::Export);
        assert_eq!(batch.jobs[0].project.id, "a");
        assert_eq!(batch.jobs[0].kind, OperationKind::Export(ExportType::Encrypted));
        assert_eq!(batch.jobs[6].kind, OperationKind::Export(ExportType::EncObs));
        assert_eq!(batch.jobs[7].project.id, "b");
    }

    #[test]
    fn per_project_batch_keeps_order() {
        let projects = vec![Project::new("a", "A"), Project::new("b", "B")];
        let batch = Batch::per_project(&projects, OperationKind::GenerateWithOption);
        assert_eq!(batch.phase, Phase::Generate);
        let ids: Vec<_> = batch.jobs.iter().map(|j| j.project.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(batch.find("b", OperationKind::GenerateWithOption).is_some());
        assert!(batch.find("b", OperationKind::Generate).is_none());
    }

    #[test]
    fn default_phase_timings() {
        assert_eq!(PhaseTiming::generate().warmup(), Duration::ZERO);
        assert_eq!(PhaseTiming::simulate().warmup(), Duration::from_secs(900));
        assert_eq!(PhaseTiming::export().warmup(), Duration::from_secs(1200));
        assert_eq!(PhaseTiming::export().retry_delay(), Duration::from_secs(300));
        assert_eq!(PhaseTiming::simulate().max_cycles, 6);
    }

    #[test]
    fn batch_serialization_roundtrip() {
        let mut batch = Batch::per_project(&[project()], OperationKind::Simulate);
        batch.jobs[0].mark_triggered("09:00".into());
        let json = serde_json::to_string(&batch).unwrap();
        let parsed: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.jobs[0].key.as_deref(), Some("09:00"));
        assert_eq!(parsed.jobs[0].status(), JobStatus::Pending);
    }
}
