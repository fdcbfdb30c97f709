use thiserror::Error;

use crate::webdriver::WebDriverError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No projects configured. Add [[projects]] entries to the config file.")]
    NoProjects,

    #[error("Login failed: {0}")]
    Login(String),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Why a job ended up with the status it has, for the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// The trigger raised or no new creation time appeared.
    Trigger,
    /// The status check raised; reported as `Failed`.
    Probe,
    /// Retry budget exhausted; reported as `Incomplete`.
    Timeout,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Trigger => write!(f, "TriggerFailure"),
            FailureKind::Probe => write!(f, "ProbeFailure"),
            FailureKind::Timeout => write!(f, "Timeout"),
        }
    }
}
