//! Results tables and their persistence.
//!
//! Finished batches are flattened into one [`Sheet`] per phase. The
//! [`ReportWriter`] stores the sheets as one xlsx workbook and as CSV files,
//! next to a `results.json` holding the complete run, probe errors included.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::RunnerError;
use crate::tracker::{Batch, ExportType, Job, JobStatus, OperationKind, Phase, Project};

/// Both generation batches: plain and with the CAM option.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub plain: Batch,
    pub cam: Batch,
}

/// Everything a run produced so far.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub projects: Vec<Project>,
    pub generate: Option<GenerateResult>,
    pub simulate: Option<Batch>,
    pub export: Option<Batch>,
    /// Phase that was still running when the run stopped, if any. Its table
    /// holds whatever the jobs had reached at that point.
    pub in_progress: Option<Phase>,
}

impl RunReport {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Local::now(),
            finished_at: None,
            projects,
            generate: None,
            simulate: None,
            export: None,
            in_progress: None,
        }
    }

    /// Number of phases that produced a table.
    pub fn phases_with_results(&self) -> usize {
        [
            self.generate.is_some(),
            self.simulate.is_some(),
            self.export.is_some(),
        ]
        .iter()
        .filter(|x| **x)
        .count()
    }

    pub fn has_results(&self) -> bool {
        self.phases_with_results() > 0
    }

    /// One sheet per finished phase, in phase order.
    pub fn sheets(&self) -> Vec<Sheet> {
        let mut sheets = Vec::new();
        if let Some(g) = &self.generate {
            sheets.push(Sheet::generate(&g.plain, &g.cam));
        }
        if let Some(s) = &self.simulate {
            sheets.push(Sheet::simulate(s));
        }
        if let Some(e) = &self.export {
            sheets.push(Sheet::export(e));
        }
        sheets
    }
}

/// Passed/failed tally used by the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
}

impl Tally {
    pub fn of<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut tally = Self::default();
        for job in jobs {
            match job.status() {
                JobStatus::Passed => tally.passed += 1,
                JobStatus::Failed => tally.failed += 1,
                _ => {}
            }
        }
        tally
    }
}

/// A flat results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: &'static str,
    pub phase: Phase,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn status_cell(job: Option<&Job>) -> String {
    job.map(|j| j.status().to_string()).unwrap_or_default()
}

/// Projects in first-seen order.
fn projects_of(batch: &Batch) -> Vec<&Project> {
    let mut seen: Vec<&Project> = Vec::new();
    for job in &batch.jobs {
        if !seen.iter().any(|p| p.id == job.project.id) {
            seen.push(&job.project);
        }
    }
    seen
}

impl Sheet {
    pub fn generate(plain: &Batch, cam: &Batch) -> Self {
        let columns = [
            "ID",
            "NAME",
            "STATUS",
            "started on",
            "completed on",
            "STATUS CAM",
            "started on CAM",
            "completed on CAM",
        ]
        .map(String::from)
        .to_vec();

        let rows = projects_of(plain)
            .into_iter()
            .map(|project| {
                let p = plain.find(&project.id, OperationKind::Generate);
                let c = cam.find(&project.id, OperationKind::GenerateWithOption);
                vec![
                    project.id.clone(),
                    project.name.clone(),
                    status_cell(p),
                    p.map(|j| j.result.started_at.clone()).unwrap_or_default(),
                    p.map(|j| j.result.completed_at.clone()).unwrap_or_default(),
                    status_cell(c),
                    c.map(|j| j.result.started_at.clone()).unwrap_or_default(),
                    c.map(|j| j.result.completed_at.clone()).unwrap_or_default(),
                ]
            })
            .collect();

        Self {
            name: "GenerateRTL",
            phase: Phase::Generate,
            columns,
            rows,
        }
    }

    pub fn simulate(batch: &Batch) -> Self {
        let columns = ["ID", "NAME", "STATUS", "started on", "completed on"]
            .map(String::from)
            .to_vec();
        let rows = batch
            .jobs
            .iter()
            .map(|job| {
                vec![
                    job.project.id.clone(),
                    job.project.name.clone(),
                    job.status().to_string(),
                    job.result.started_at.clone(),
                    job.result.completed_at.clone(),
                ]
            })
            .collect();
        Self {
            name: "SimulateRTL",
            phase: Phase::Simulate,
            columns,
            rows,
        }
    }

    pub fn export(batch: &Batch) -> Self {
        let mut columns = vec!["ID".to_string(), "NAME".to_string()];
        for t in ExportType::ALL {
            columns.push(t.label().to_string());
            columns.push(format!("createdAt_{}", t.label()));
        }

        let rows = projects_of(batch)
            .into_iter()
            .map(|project| {
                let mut row = vec![project.id.clone(), project.name.clone()];
                for t in ExportType::ALL {
                    let job = batch.find(&project.id, OperationKind::Export(t));
                    row.push(status_cell(job));
                    row.push(job.and_then(|j| j.key.clone()).unwrap_or_default());
                }
                row
            })
            .collect();

        Self {
            name: "ExportRTL",
            phase: Phase::Export,
            columns,
            rows,
        }
    }

    /// Renders the sheet as CSV with a header line.
    pub fn to_csv(&self) -> String {
        let mut out = self
            .columns
            .iter()
            .map(|c| csv_field(c))
            .collect::<Vec<_>>()
            .join(",");
        out.push('\n');
        for row in &self.rows {
            out.push_str(
                &row.iter()
                    .map(|v| csv_field(v))
                    .collect::<Vec<_>>()
                    .join(","),
            );
            out.push('\n');
        }
        out
    }
}

/// Quotes a CSV field when it contains a comma, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Persists run reports under an output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes every sheet and `results.json` into a fresh timestamped
    /// directory and returns its path.
    pub fn write(&self, report: &RunReport) -> Result<PathBuf, RunnerError> {
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(RunnerError::Report(format!(
                "{} is not a directory",
                self.output_dir.display()
            )));
        }
        let stamp = report.started_at.format("%Y%m%d_%H%M%S");
        let base = format!("inoculator_test_results_{stamp}");
        let dir = self.output_dir.join(&base);
        fs::create_dir_all(&dir)?;

        let sheets = report.sheets();
        for sheet in &sheets {
            let path = dir.join(format!("{}.csv", sheet.name));
            info!(phase = %sheet.phase, sheet = sheet.name, rows = sheet.rows.len(), "saving sheet");
            fs::write(&path, sheet.to_csv())?;
        }
        write_workbook(&dir.join(format!("{base}.xlsx")), &sheets)?;
        write_json(&dir.join("results.json"), report)?;

        info!(dir = %dir.display(), "results saved");
        Ok(dir)
    }
}

/// One worksheet per sheet, bold header row.
fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<(), RunnerError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        for (c, column) in sheet.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16, column.as_str(), &header)?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                worksheet.write_string(r as u32 + 1, c as u16, value.as_str())?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_json(path: &Path, report: &RunReport) -> Result<(), RunnerError> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
