use chrono::Local;
use tracing::info;

use crate::config::RunnerConfig;
use crate::report::{GenerateResult, RunReport};
use crate::tracker::{Batch, CompletionTracker, JobDriver, OperationKind, Pause, Phase};

/// Which phases a run executes. Order is always generate, simulate, export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSelection {
    pub generate: bool,
    pub simulate: bool,
    pub export: bool,
}

impl PhaseSelection {
    pub fn all() -> Self {
        Self {
            generate: true,
            simulate: true,
            export: true,
        }
    }

    pub fn only(phase: Phase) -> Self {
        Self {
            generate: phase == Phase::Generate,
            simulate: phase == Phase::Simulate,
            export: phase == Phase::Export,
        }
    }

    pub fn skip(phase: Phase) -> Self {
        Self {
            generate: phase != Phase::Generate,
            simulate: phase != Phase::Simulate,
            export: phase != Phase::Export,
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        [
            (Phase::Generate, self.generate),
            (Phase::Simulate, self.simulate),
            (Phase::Export, self.export),
        ]
        .into_iter()
        .filter_map(|(p, on)| on.then_some(p))
        .collect()
    }
}

/// Runs the selected phases over one shared session and collects the tables.
pub struct Runner {
    config: RunnerConfig,
    selection: PhaseSelection,
    /// Filled in phase by phase, so it stays readable after an interrupted run.
    pub report: RunReport,
}

impl Runner {
    pub fn new(config: RunnerConfig, selection: PhaseSelection) -> Self {
        let report = RunReport::new(config.projects.clone());
        Self {
            config,
            selection,
            report,
        }
    }

    /// Runs every selected phase, pausing `phase_gap` between them.
    /// Returns `true` when at least one phase produced a table.
    pub async fn run<D, P>(&mut self, driver: &mut D, pause: &P) -> bool
    where
        D: JobDriver,
        P: Pause,
    {
        info!(
            projects = self.config.projects.len(),
            phases = ?self.selection.phases(),
            "starting RTL automation pipeline"
        );

        for (i, phase) in self.selection.phases().into_iter().enumerate() {
            if i > 0 {
                pause
                    .pause(
                        self.config.timing.phase_gap(),
                        &format!("waiting before {phase}"),
                    )
                    .await;
            }
            self.run_phase(phase, driver, pause).await;
        }

        self.report.finished_at = Some(Local::now());
        self.report.has_results()
    }

    /// Runs one phase. The batches live in the report while they are being
    /// tracked, so an interrupted phase still leaves its partial table.
    pub async fn run_phase<D, P>(&mut self, phase: Phase, driver: &mut D, pause: &P)
    where
        D: JobDriver,
        P: Pause,
    {
        crate::ui::print_phase_banner(phase);
        info!(%phase, "phase started");
        self.report.in_progress = Some(phase);

        let tracker = CompletionTracker::new(self.config.phase_timing(phase));
        let projects = &self.config.projects;
        match phase {
            Phase::Generate => {
                let generate = self.report.generate.insert(GenerateResult {
                    plain: Batch::per_project(projects, OperationKind::Generate),
                    cam: Batch::per_project(projects, OperationKind::GenerateWithOption),
                });
                track(&tracker, &mut generate.plain, driver, pause).await;
                info!("generation without CAM completed");
                track(&tracker, &mut generate.cam, driver, pause).await;
                info!("generation with CAM completed");
            }
            Phase::Simulate => {
                let batch = self
                    .report
                    .simulate
                    .insert(Batch::per_project(projects, OperationKind::Simulate));
                track(&tracker, batch, driver, pause).await;
            }
            Phase::Export => {
                let batch = self.report.export.insert(Batch::export(projects));
                track(&tracker, batch, driver, pause).await;
            }
        }

        self.report.in_progress = None;
        info!("{phase} phase completed");
    }
}

async fn track<D, P>(tracker: &CompletionTracker, batch: &mut Batch, driver: &mut D, pause: &P)
where
    D: JobDriver,
    P: Pause,
{
    let summary = tracker.run(batch, driver, pause).await;
    info!(
        phase = %batch.phase,
        cycles = summary.cycles,
        probes = summary.probes,
        timed_out = summary.timed_out,
        "batch finished"
    );
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use super::*;
    use crate::tracker::{ExportType, Job, JobStatus, Observation, PhaseTiming, Project};

    /// Every trigger succeeds and every job passes on the first check.
    #[derive(Default)]
    struct PassingDriver {
        log: Vec<String>,
    }

    impl JobDriver for PassingDriver {
        type Error = String;

        async fn trigger(&mut self, job: &Job) -> Result<Option<String>, String> {
            self.log.push(format!("trigger {} {}", job.project.id, job.kind));
            Ok(Some(format!("{}@{}", job.project.id, job.kind)))
        }

        async fn probe(&mut self, job: &Job, key: &str) -> Result<Observation, String> {
            self.log.push(format!("probe {} {}", job.project.id, job.kind));
            Ok(Observation::new(format!("{key}-done"), JobStatus::Passed))
        }
    }

    #[derive(Default)]
    struct RecordingPause {
        reasons: RefCell<Vec<(Duration, String)>>,
    }

    impl Pause for RecordingPause {
        async fn pause(&self, duration: Duration, reason: &str) {
            self.reasons.borrow_mut().push((duration, reason.to_string()));
        }
    }

    fn config() -> RunnerConfig {
        let quick = PhaseTiming {
            warmup_secs: 1,
            retry_delay_secs: 1,
            max_cycles: 2,
        };
        let mut config = RunnerConfig {
            projects: vec![Project::new("p1", "alpha"), Project::new("p2", "beta")],
            generate: quick,
            simulate: quick,
            export: quick,
            ..Default::default()
        };
        config.timing.phase_gap_secs = 120;
        config
    }

    #[test]
    fn selection_phases() {
        assert_eq!(
            PhaseSelection::all().phases(),
            vec![Phase::Generate, Phase::Simulate, Phase::Export]
        );
        assert_eq!(PhaseSelection::only(Phase::Export).phases(), vec![Phase::Export]);
        assert_eq!(
            PhaseSelection::skip(Phase::Simulate).phases(),
            vec![Phase::Generate, Phase::Export]
        );
    }

    #[tokio::test]
    async fn full_run_fills_every_table() {
        let mut runner = Runner::new(config(), PhaseSelection::all());
        let mut driver = PassingDriver::default();
        let pause = RecordingPause::default();

        let ok = runner.run(&mut driver, &pause).await;

        assert!(ok);
        let report = &runner.report;
        let generate = report.generate.as_ref().unwrap();
        assert_eq!(generate.plain.count(JobStatus::Passed), 2);
        assert_eq!(generate.cam.count(JobStatus::Passed), 2);
        assert_eq!(report.simulate.as_ref().unwrap().len(), 2);
        assert_eq!(report.export.as_ref().unwrap().len(), 14);
        assert!(report.finished_at.is_some());
        assert_eq!(report.sheets().len(), 3);
    }

    #[tokio::test]
    async fn phase_gap_only_between_phases() {
        let mut runner = Runner::new(config(), PhaseSelection::skip(Phase::Generate));
        let mut driver = PassingDriver::default();
        let pause = RecordingPause::default();

        runner.run(&mut driver, &pause).await;

        let gaps: Vec<_> = pause
            .reasons
            .borrow()
            .iter()
            .filter(|(d, _)| *d == Duration::from_secs(120))
            .map(|(_, r)| r.clone())
            .collect();
        assert_eq!(gaps, vec!["waiting before EXPORT".to_string()]);
        assert!(runner.report.generate.is_none());
    }

    #[tokio::test]
    async fn generate_runs_plain_before_cam() {
        let mut runner = Runner::new(config(), PhaseSelection::only(Phase::Generate));
        let mut driver = PassingDriver::default();
        let pause = RecordingPause::default();

        runner.run(&mut driver, &pause).await;

        let triggers: Vec<_> = driver
            .log
            .iter()
            .filter(|l| l.starts_with("trigger"))
            .cloned()
            .collect();
        assert_eq!(
            triggers,
            vec![
                "trigger p1 generate",
                "trigger p2 generate",
                "trigger p1 generate+CAM",
                "trigger p2 generate+CAM",
            ]
        );
        let cam = &runner.report.generate.as_ref().unwrap().cam;
        let job = cam.find("p2", OperationKind::GenerateWithOption).unwrap();
        assert_eq!(job.result.completed_at, "p2@generate+CAM-done");
    }

    #[tokio::test]
    async fn export_keys_per_combination() {
        let mut runner = Runner::new(config(), PhaseSelection::only(Phase::Export));
        let mut driver = PassingDriver::default();
        let pause = RecordingPause::default();

        runner.run(&mut driver, &pause).await;

        let export = runner.report.export.as_ref().unwrap();
        let job = export
            .find("p1", OperationKind::Export(ExportType::ObsClean))
            .unwrap();
        assert_eq!(job.key.as_deref(), Some("p1@export[Obs+Clean]"));
    }

    /// Never returns from the warm-up, standing in for a long wait that
    /// Ctrl-C cuts short.
    struct StuckWarmup;

    impl Pause for StuckWarmup {
        async fn pause(&self, _duration: Duration, reason: &str) {
            if reason.contains("warm-up") {
                std::future::pending::<()>().await;
            }
        }
    }

    #[tokio::test]
    async fn interrupted_phase_keeps_partial_table() {
        let mut runner = Runner::new(config(), PhaseSelection::only(Phase::Simulate));
        let mut driver = PassingDriver::default();

        tokio::select! {
            _ = runner.run(&mut driver, &StuckWarmup) => panic!("run should not finish"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }

        let report = &runner.report;
        assert_eq!(report.in_progress, Some(Phase::Simulate));
        assert!(report.has_results());
        let batch = report.simulate.as_ref().unwrap();
        assert_eq!(batch.count(JobStatus::Pending), 2);
        assert_eq!(batch.jobs[0].key.as_deref(), Some("p1@simulate"));
        assert!(report.finished_at.is_none());
        assert_eq!(report.sheets()[0].rows[0][2], "Pending");
    }

    #[tokio::test]
    async fn finished_phase_clears_in_progress() {
        let mut runner = Runner::new(config(), PhaseSelection::only(Phase::Simulate));
        runner
            .run(&mut PassingDriver::default(), &RecordingPause::default())
            .await;
        assert_eq!(runner.report.in_progress, None);
    }

    #[tokio::test]
    async fn no_phases_means_no_results() {
        let selection = PhaseSelection {
            generate: false,
            simulate: false,
            export: false,
        };
        let mut runner = Runner::new(config(), selection);
        let mut driver = PassingDriver::default();
        let ok = runner.run(&mut driver, &RecordingPause::default()).await;
        assert!(!ok);
        assert!(driver.log.is_empty());
    }
}
