use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::job::{Batch, Job, PhaseTiming};
use super::status::{JobStatus, Observation};

/// The single interactive session used to trigger and probe jobs.
///
/// Methods take `&mut self`: the session's view state changes with every
/// navigation, so only one action may be in flight at a time.
pub trait JobDriver {
    type Error: Display;

    /// Starts the job in the external system and returns its correlation key,
    /// or `None` when no new key showed up.
    async fn trigger(&mut self, job: &Job) -> Result<Option<String>, Self::Error>;

    /// Looks up the job by its correlation key once.
    async fn probe(&mut self, job: &Job, key: &str) -> Result<Observation, Self::Error>;
}

/// Blocking wait between tracker steps.
pub trait Pause {
    async fn pause(&self, duration: Duration, reason: &str);
}

/// Plain tokio sleep.
pub struct TokioPause;

impl Pause for TokioPause {
    async fn pause(&self, duration: Duration, _reason: &str) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// What happened during one tracker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    pub triggered: usize,
    pub untriggered: usize,
    /// Probe passes actually performed.
    pub cycles: u32,
    pub probes: u32,
    /// Jobs forced to `Incomplete` after the last pass.
    pub timed_out: usize,
}

/// Drives every job of a batch to a final status.
pub struct CompletionTracker {
    timing: PhaseTiming,
}

impl CompletionTracker {
    pub fn new(timing: PhaseTiming) -> Self {
        Self { timing }
    }

    /// Trigger all jobs, wait, then probe until everything settles or the
    /// retry budget runs out.
    ///
    /// Nothing here returns an error: trigger failures leave the job
    /// `Untriggered`, probe failures mark it `Failed`, and jobs still in
    /// flight after `max_cycles` passes become `Incomplete`.
    pub async fn run<D, P>(&self, batch: &mut Batch, driver: &mut D, pause: &P) -> TrackerSummary
    where
        D: JobDriver,
        P: Pause,
    {
        let mut summary = TrackerSummary::default();

        for job in batch.jobs.iter_mut() {
            if Self::trigger_one(job, driver).await {
                summary.triggered += 1;
            } else {
                job.mark_trigger_failed();
                summary.untriggered += 1;
            }
        }
        info!(
            phase = %batch.phase,
            triggered = summary.triggered,
            untriggered = summary.untriggered,
            "trigger pass finished"
        );

        if summary.triggered == 0 {
            warn!(phase = %batch.phase, "nothing was triggered, skipping completion checks");
            return summary;
        }

        pause
            .pause(
                self.timing.warmup(),
                &format!("{} warm-up before first check", batch.phase),
            )
            .await;

        for cycle in 1..=self.timing.max_cycles {
            summary.cycles = cycle;
            for job in batch.jobs.iter_mut().filter(|j| j.needs_probe()) {
                Self::probe_one(job, driver).await;
                summary.probes += 1;
            }

            let remaining = batch.in_flight();
            if remaining == 0 {
                info!(phase = %batch.phase, cycle, "all jobs reached a final status");
                break;
            }
            info!(
                phase = %batch.phase,
                cycle,
                max_cycles = self.timing.max_cycles,
                remaining,
                "jobs still running"
            );
            if cycle < self.timing.max_cycles {
                pause
                    .pause(
                        self.timing.retry_delay(),
                        &format!("{} check {cycle}/{}", batch.phase, self.timing.max_cycles),
                    )
                    .await;
            }
        }

        for job in batch.jobs.iter_mut() {
            if job.result.force_incomplete() {
                warn!(
                    project = %job.project.name,
                    kind = %job.kind,
                    "retry budget exhausted, marking incomplete"
                );
                summary.timed_out += 1;
            }
        }

        summary
    }

    async fn trigger_one<D: JobDriver>(job: &mut Job, driver: &mut D) -> bool {
        info!(project = %job.project.name, id = %job.project.id, kind = %job.kind, "triggering");
        match driver.trigger(job).await {
            Ok(Some(key)) => {
                if job.mark_triggered(key) {
                    info!(
                        project = %job.project.name,
                        kind = %job.kind,
                        key = job.key.as_deref().unwrap_or_default(),
                        "recorded creation time"
                    );
                    true
                } else {
                    warn!(project = %job.project.name, kind = %job.kind, "trigger returned a blank key");
                    false
                }
            }
            Ok(None) => {
                warn!(project = %job.project.name, kind = %job.kind, "no new job appeared after trigger");
                false
            }
            Err(e) => {
                warn!(project = %job.project.name, kind = %job.kind, error = %e, "trigger failed");
                false
            }
        }
    }

    async fn probe_one<D: JobDriver>(job: &mut Job, driver: &mut D) {
        let Some(key) = job.key.clone() else {
            return;
        };
        let before = job.status();
        match driver.probe(job, &key).await {
            Ok(observation) => {
                job.result.apply_probe(&observation);
            }
            Err(e) => {
                warn!(project = %job.project.name, kind = %job.kind, error = %e, "status check failed");
                job.result.apply_probe_error(e.to_string());
            }
        }
        let after = job.status();
        if before != after {
            info!(project = %job.project.name, kind = %job.kind, "{before} -> {after}");
        } else {
            debug!(project = %job.project.name, kind = %job.kind, status = %after, "unchanged");
        }
        if after == JobStatus::Failed && job.result.probe_error.is_some() {
            debug!(project = %job.project.name, "failure came from the probe, not the listing");
        }
    }
}
