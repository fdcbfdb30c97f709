use std::collections::HashSet;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::selectors::{self, css};
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::tracker::{
    ExportFlags, Job, JobDriver, Observation, OperationKind, Project, StatusIndicators,
};
use crate::webdriver::{ElementRef, Locator, WebDriverClient};

/// How long to wait for the listing rows to render before reading them.
const ROWS_TIMEOUT: Duration = Duration::from_secs(5);

/// One logged-in browser session against the Inoculator UI.
pub struct InoculatorSession {
    driver: WebDriverClient,
    config: RunnerConfig,
}

impl InoculatorSession {
    pub fn new(driver: WebDriverClient, config: RunnerConfig) -> Self {
        Self { driver, config }
    }

    /// Starts a browser through the configured WebDriver endpoint.
    pub async fn open(config: RunnerConfig) -> Result<Self, RunnerError> {
        info!(
            webdriver = %config.webdriver_url,
            headless = config.headless,
            "starting browser session"
        );
        let driver =
            WebDriverClient::connect(&config.webdriver_url, config.browser, config.headless)
                .await?;
        debug!(session = driver.session_id(), "browser session started");
        Ok(Self::new(driver, config))
    }

    pub async fn close(self) -> Result<(), RunnerError> {
        self.driver.quit().await?;
        Ok(())
    }

    async fn settle(&self) {
        let d = self.config.timing.settle();
        if !d.is_zero() {
            sleep(d).await;
        }
    }

    /// Fills the login form and requests the OTP. Admin accounts are signed
    /// in right after the request.
    pub async fn login(&mut self) -> Result<(), RunnerError> {
        info!(url = %self.config.login_url(), "logging in");
        let timeout = self.config.timing.element_timeout();
        let poll = self.config.timing.new_row_poll();

        self.driver.goto(&self.config.login_url()).await?;
        let email = self
            .driver
            .wait_for(&css(selectors::EMAIL_INPUT), timeout, poll)
            .await?;
        self.driver.clear(&email).await?;
        self.driver.send_keys(&email, &self.config.email).await?;

        let password = self.driver.find(&css(selectors::PASSWORD_INPUT)).await?;
        self.driver.clear(&password).await?;
        self.driver.send_keys(&password, &self.config.password).await?;

        let otp = self.driver.find(&selectors::request_otp()).await?;
        self.driver.click(&otp).await?;

        let wait = self.config.timing.login_settle();
        if !wait.is_zero() {
            sleep(wait).await;
        }

        if !self
            .driver
            .find_all(&css(selectors::PASSWORD_INPUT))
            .await?
            .is_empty()
        {
            return Err(RunnerError::Login("still on the login page".into()));
        }
        info!("logged in");
        Ok(())
    }

    /// Opens the project page and the listing tab for `kind`.
    async fn open_tab(&self, project: &Project, kind: OperationKind) -> Result<(), RunnerError> {
        let timeout = self.config.timing.element_timeout();
        let poll = self.config.timing.new_row_poll();

        self.driver.goto(&self.config.project_url(&project.id)).await?;
        self.settle().await;
        let tab = self
            .driver
            .wait_for(&selectors::tab_button(kind), timeout, poll)
            .await?;
        self.driver.click(&tab).await?;
        self.settle().await;
        Ok(())
    }

    /// Creation times currently shown in the listing, top to bottom.
    async fn listed_keys(&self) -> Result<Vec<String>, RunnerError> {
        let mut keys = Vec::new();
        for row in self.driver.find_all(&css(selectors::ROWS)).await? {
            if let Some(key) = self.created_at(&row).await? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn created_at(&self, row: &ElementRef) -> Result<Option<String>, RunnerError> {
        let Some(cell) = self
            .driver
            .find_in(row, &css(selectors::CREATED_AT_CELL))
            .await?
        else {
            return Ok(None);
        };
        let text = self.driver.text(&cell).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    /// Samples the listing until a creation time outside `before` shows up.
    /// When several appear at once the topmost one wins.
    async fn wait_for_new_key(
        &self,
        before: &HashSet<String>,
    ) -> Result<Option<String>, RunnerError> {
        let timeout = self.config.timing.new_row_timeout();
        let poll = self.config.timing.new_row_poll();
        let deadline = Instant::now() + timeout;
        loop {
            let now = self.listed_keys().await?;
            if let Some(key) = now.into_iter().find(|k| !before.contains(k)) {
                return Ok(Some(key));
            }
            if Instant::now() >= deadline {
                debug!(secs = timeout.as_secs(), "no new row appeared");
                return Ok(None);
            }
            sleep(poll).await;
        }
    }

    async fn click_button(&self, label: &str) -> Result<(), RunnerError> {
        let button = self
            .driver
            .wait_for(
                &selectors::button_with_text(label),
                self.config.timing.element_timeout(),
                self.config.timing.new_row_poll(),
            )
            .await?;
        self.driver.click(&button).await?;
        Ok(())
    }

    /// Brings a checkbox to the wanted state, clicking only if needed.
    async fn set_checkbox(&self, locator: &Locator, checked: bool) -> Result<(), RunnerError> {
        let checkbox = self.driver.find(locator).await?;
        if self.driver.is_selected(&checkbox).await? != checked {
            self.driver.click(&checkbox).await?;
        }
        Ok(())
    }

    async fn select_export(&self, flags: ExportFlags) -> Result<(), RunnerError> {
        for (label, checked) in [
            ("Encrypted", flags.encrypted),
            ("Obfuscated", flags.obfuscated),
            ("Clean", flags.clean),
        ] {
            self.set_checkbox(&selectors::labeled_checkbox(label), checked)
                .await?;
        }
        Ok(())
    }

    async fn perform_action(&self, kind: OperationKind) -> Result<(), RunnerError> {
        match kind {
            OperationKind::Generate | OperationKind::Simulate => {
                self.click_button(selectors::action_label(kind)).await?;
            }
            OperationKind::GenerateWithOption => {
                let cam = css(selectors::CAM_CHECKBOX);
                self.driver
                    .wait_for(
                        &cam,
                        self.config.timing.cam_timeout(),
                        self.config.timing.new_row_poll(),
                    )
                    .await?;
                self.set_checkbox(&cam, true).await?;
                self.click_button(selectors::action_label(kind)).await?;
            }
            OperationKind::Export(export_type) => {
                self.select_export(export_type.flags()).await?;
                self.settle().await;
                let button = self
                    .driver
                    .wait_until_enabled(
                        &selectors::button_with_text(selectors::action_label(kind)),
                        self.config.timing.element_timeout(),
                        self.config.timing.new_row_poll(),
                    )
                    .await?;
                self.driver.click(&button).await?;
            }
        }
        Ok(())
    }

    /// The listing row whose creation time equals `key`.
    async fn find_row(&self, key: &str) -> Result<Option<ElementRef>, RunnerError> {
        let key = key.trim();
        for row in self.driver.find_all(&css(selectors::ROWS)).await? {
            if self.created_at(&row).await?.as_deref() == Some(key) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    async fn has(&self, parent: &ElementRef, selector: &str) -> Result<bool, RunnerError> {
        Ok(self.driver.find_in(parent, &css(selector)).await?.is_some())
    }

    async fn read_row(&self, row: &ElementRef) -> Result<Observation, RunnerError> {
        let updated_at = match self
            .driver
            .find_in(row, &css(selectors::UPDATED_AT_CELL))
            .await?
        {
            Some(cell) => self.driver.text(&cell).await?.trim().to_string(),
            None => String::new(),
        };

        // The construction listing has no status column; its icons sit on the row.
        let scope = match self
            .driver
            .find_in(row, &css(selectors::STATUS_CELL))
            .await?
        {
            Some(cell) => cell,
            None => row.clone(),
        };

        let indicators = StatusIndicators {
            success: self.has(&scope, selectors::SUCCESS_ICON).await?,
            failure: self.has(&scope, selectors::FAILURE_ICON).await?,
            progress: self.has(&scope, selectors::PROGRESS_ICON).await?,
        };
        Ok(Observation::new(updated_at, indicators.classify()))
    }
}

impl JobDriver for InoculatorSession {
    type Error = RunnerError;

    async fn trigger(&mut self, job: &Job) -> Result<Option<String>, RunnerError> {
        self.open_tab(&job.project, job.kind).await?;
        let before: HashSet<String> = self.listed_keys().await?.into_iter().collect();
        debug!(project = %job.project.name, known = before.len(), "snapshot of listed jobs");
        self.perform_action(job.kind).await?;
        self.settle().await;
        self.wait_for_new_key(&before).await
    }

    async fn probe(&mut self, job: &Job, key: &str) -> Result<Observation, RunnerError> {
        self.open_tab(&job.project, job.kind).await?;
        if let Err(e) = self
            .driver
            .wait_for(
                &css(selectors::ROWS),
                ROWS_TIMEOUT,
                self.config.timing.new_row_poll(),
            )
            .await
        {
            debug!(project = %job.project.name, error = %e, "listing has no rows yet");
        }
        match self.find_row(key).await? {
            Some(row) => self.read_row(&row).await,
            None => Ok(Observation::not_visible()),
        }
    }
}
