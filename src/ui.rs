//! Interface de terminal do rtl-runner: spinners de espera e resumo colorido.
//!
//! Usa `indicatif` para a contagem regressiva das pausas e `console` para
//! estilizar o resumo final da execução.

use std::time::Duration;

use chrono::Local;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::FailureKind;
use crate::report::{RunReport, Tally};
use crate::tracker::{ExportType, Job, OperationKind, Pause, Phase};

/// Pausa com spinner e contagem regressiva no terminal.
///
/// O spinner é escrito em stderr e some ao final da espera, deixando
/// apenas as linhas de log.
pub struct SpinnerPause {
    // Estilo do spinner; cai para o padrão se o template for inválido.
    style: ProgressStyle,
}

impl SpinnerPause {
    pub fn new() -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self { style }
    }
}

impl Default for SpinnerPause {
    fn default() -> Self {
        Self::new()
    }
}

impl Pause for SpinnerPause {
    async fn pause(&self, duration: Duration, reason: &str) {
        if duration.is_zero() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(self.style.clone());
        pb.set_message(format!("{reason} ({})", format_duration(duration)));
        pb.enable_steady_tick(Duration::from_millis(120));
        tokio::time::sleep(duration).await;
        pb.finish_and_clear();
    }
}

/// Formata uma duração como `1h 02m 03s`, `4m 05s` ou `6s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

/// Linhas do resumo final, sem estilo, para facilitar testes.
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    let finished = report.finished_at.unwrap_or_else(Local::now);
    let elapsed = (finished - report.started_at).to_std().unwrap_or_default();

    let mut lines = vec![
        format!("Run ID: {}", report.run_id),
        format!("Started: {}", report.started_at.format("%Y-%m-%d %H:%M:%S")),
        format!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S")),
        format!("Duration: {}", format_duration(elapsed)),
        format!("Projects: {}", report.projects.len()),
    ];

    if let Some(g) = &report.generate {
        lines.push(tally_line("Generate", Tally::of(&g.plain.jobs)));
        lines.push(tally_line("Generate (CAM)", Tally::of(&g.cam.jobs)));
    }
    if let Some(s) = &report.simulate {
        lines.push(tally_line("Simulate", Tally::of(&s.jobs)));
    }
    if let Some(e) = &report.export {
        lines.push(tally_line("Export", Tally::of(&e.jobs)));
        for t in ExportType::ALL {
            let jobs = e.jobs.iter().filter(|j| j.kind == OperationKind::Export(t));
            lines.push(tally_line(&format!("  {}", t.label()), Tally::of(jobs)));
        }
    }
    let failures: Vec<String> = [FailureKind::Trigger, FailureKind::Probe, FailureKind::Timeout]
        .into_iter()
        .filter_map(|kind| {
            let n = all_jobs(report)
                .filter(|j| j.result.failure == Some(kind))
                .count();
            (n > 0).then(|| format!("{kind} {n}"))
        })
        .collect();
    if !failures.is_empty() {
        lines.push(format!("Issues: {}", failures.join(", ")));
    }
    if let Some(phase) = report.in_progress {
        lines.push(format!("Interrupted during {phase}, its table is partial"));
    }
    if !report.has_results() {
        lines.push("No phase produced results".to_string());
    }
    lines
}

fn all_jobs(report: &RunReport) -> impl Iterator<Item = &Job> {
    report
        .generate
        .iter()
        .flat_map(|g| g.plain.jobs.iter().chain(&g.cam.jobs))
        .chain(report.simulate.iter().flat_map(|b| &b.jobs))
        .chain(report.export.iter().flat_map(|b| &b.jobs))
}

fn tally_line(label: &str, tally: Tally) -> String {
    format!(
        "{label}: {} passed, {} failed",
        tally.passed, tally.failed
    )
}

/// Imprime o resumo da execução com cores.
pub fn print_summary(report: &RunReport) {
    let header = Style::new().cyan().bold();
    let green = Style::new().green();
    let red = Style::new().red();

    println!();
    println!("{}", header.apply_to("─── Run Summary ───"));
    for line in summary_lines(report) {
        if !line.contains(" passed, ") {
            println!("{line}");
        } else if line.ends_with(" 0 failed") {
            println!("{}", green.apply_to(line));
        } else {
            println!("{}", red.apply_to(line));
        }
    }
}

/// Cabeçalho impresso no início de cada fase.
pub fn print_phase_banner(phase: Phase) {
    let banner = Style::new().magenta().bold();
    println!();
    println!("{}", banner.apply_to(format!("════ PHASE: {phase} ════")));
}

/// Mensagem final com o local dos resultados.
pub fn print_saved(path: &std::path::Path) {
    let green = Style::new().green().bold();
    println!("{} Results saved to {}", green.apply_to("✓"), path.display());
}

/// Aviso de execução interrompida.
pub fn print_interrupted() {
    let yellow = Style::new().yellow().bold();
    println!("{} Interrupted, saving partial results", yellow.apply_to("!"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GenerateResult;
    use crate::tracker::{Batch, JobStatus, Observation, Project};

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_secs(6)), "6s");
        assert_eq!(format_duration(Duration::from_secs(245)), "4m 05s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 02m 03s");
    }

    #[test]
    fn summary_without_phases() {
        let report = RunReport::new(vec![Project::new("p1", "alpha")]);
        let lines = summary_lines(&report);
        assert!(lines.contains(&"Projects: 1".to_string()));
        assert_eq!(lines.last().unwrap(), "No phase produced results");
    }

    #[test]
    fn summary_counts_per_phase_and_export_type() {
        let projects = vec![Project::new("p1", "alpha"), Project::new("p2", "beta")];
        let mut report = RunReport::new(projects.clone());

        let mut plain = Batch::per_project(&projects, OperationKind::Generate);
        for job in &mut plain.jobs {
            job.mark_triggered("t0".into());
            job.result
                .apply_probe(&Observation::new("t1", JobStatus::Passed));
        }
        let cam = Batch::per_project(&projects, OperationKind::GenerateWithOption);
        report.generate = Some(GenerateResult { plain, cam });

        let mut export = Batch::export(&projects);
        for job in &mut export.jobs {
            if job.kind == OperationKind::Export(ExportType::Clean) {
                job.mark_triggered("t0".into());
                job.result
                    .apply_probe(&Observation::new("t1", JobStatus::Failed));
            }
        }
        report.export = Some(export);

        let lines = summary_lines(&report);
        assert!(lines.contains(&"Generate: 2 passed, 0 failed".to_string()));
        assert!(lines.contains(&"Generate (CAM): 0 passed, 0 failed".to_string()));
        assert!(lines.contains(&"Export: 0 passed, 2 failed".to_string()));
        assert!(lines.contains(&"  Clean: 0 passed, 2 failed".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Simulate")));
        assert!(!lines.iter().any(|l| l.starts_with("Issues")));
    }

    #[test]
    fn summary_lists_failure_kinds_and_interrupt() {
        let projects = vec![Project::new("p1", "alpha"), Project::new("p2", "beta")];
        let mut report = RunReport::new(projects.clone());

        let mut batch = Batch::per_project(&projects, OperationKind::Simulate);
        batch.jobs[0].mark_trigger_failed();
        batch.jobs[1].mark_triggered("t0".into());
        batch.jobs[1].result.force_incomplete();
        report.simulate = Some(batch);
        report.in_progress = Some(Phase::Export);

        let lines = summary_lines(&report);
        assert!(lines.contains(&"Issues: TriggerFailure 1, Timeout 1".to_string()));
        assert!(lines.contains(&"Interrupted during EXPORT, its table is partial".to_string()));
    }

    #[tokio::test]
    async fn zero_pause_returns_immediately() {
        SpinnerPause::new().pause(Duration::ZERO, "nothing").await;
    }
}
