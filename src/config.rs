//! Configuração do runner carregada a partir de `inoculator.toml`.
//!
//! A struct [`RunnerConfig`] contém todos os parâmetros configuráveis:
//! endpoints, credenciais, lista de projetos e os tempos de espera de cada fase.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `INOCULATOR_EMAIL`, `INOCULATOR_PASSWORD` e
//! `HEADLESS` têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RunnerError;
use crate::tracker::{Phase, PhaseTiming, Project};
use crate::webdriver::Browser;

/// Caminho padrão do arquivo de configuração.
pub const DEFAULT_CONFIG_PATH: &str = "inoculator.toml";

/// Configuração de nível superior carregada de `inoculator.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// URL base da aplicação (sem barra final).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint do servidor WebDriver (chromedriver, geckodriver, selenium).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub browser: Browser,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Executa o navegador sem janela visível.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Diretório onde os relatórios são gravados.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Arquivo de log opcional (modo append).
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Projetos processados, na ordem do relatório.
    #[serde(default)]
    pub projects: Vec<Project>,

    #[serde(default)]
    pub timing: UiTiming,

    #[serde(default = "PhaseTiming::generate")]
    pub generate: PhaseTiming,

    #[serde(default = "PhaseTiming::simulate")]
    pub simulate: PhaseTiming,

    #[serde(default = "PhaseTiming::export")]
    pub export: PhaseTiming,
}

/// Tempos fixos da interação com a interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UiTiming {
    /// Espera após navegação ou clique antes de ler a página.
    pub settle_ms: u64,
    /// Limite para aparecer uma nova linha após o disparo.
    pub new_row_timeout_secs: u64,
    /// Intervalo de amostragem da nova linha.
    pub new_row_poll_ms: u64,
    /// Limite para esperar botões e campos.
    pub element_timeout_secs: u64,
    /// Espera após "Request OTP" até o login concluir.
    pub login_settle_secs: u64,
    /// Pausa entre duas fases consecutivas.
    pub phase_gap_secs: u64,
    /// Limite para achar a chave do CAM antes de desistir do disparo.
    pub cam_timeout_secs: u64,
}

impl Default for UiTiming {
    fn default() -> Self {
        Self {
            settle_ms: 2000,
            new_row_timeout_secs: 30,
            new_row_poll_ms: 1000,
            element_timeout_secs: 30,
            login_settle_secs: 7,
            phase_gap_secs: 120,
            cam_timeout_secs: 5,
        }
    }
}

impl UiTiming {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn new_row_timeout(&self) -> Duration {
        Duration::from_secs(self.new_row_timeout_secs)
    }

    pub fn new_row_poll(&self) -> Duration {
        Duration::from_millis(self.new_row_poll_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_secs(self.login_settle_secs)
    }

    pub fn phase_gap(&self) -> Duration {
        Duration::from_secs(self.phase_gap_secs)
    }

    pub fn cam_timeout(&self) -> Duration {
        Duration::from_secs(self.cam_timeout_secs)
    }
}

// Valor padrão da URL da aplicação.
fn default_base_url() -> String {
    "https://dev.inoculator.ai".to_string()
}

// Valor padrão do endpoint WebDriver: chromedriver local.
fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            webdriver_url: default_webdriver_url(),
            browser: Browser::default(),
            email: String::new(),
            password: String::new(),
            headless: default_headless(),
            output_dir: default_output_dir(),
            log_file: None,
            projects: Vec::new(),
            timing: UiTiming::default(),
            generate: PhaseTiming::generate(),
            simulate: PhaseTiming::simulate(),
            export: PhaseTiming::export(),
        }
    }
}

impl RunnerConfig {
    /// Carrega a configuração do caminho informado.
    /// Se o arquivo não existir e `required` for falso, usa os valores padrão.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<RunnerConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else if required {
            anyhow::bail!("config file {} not found", path.display());
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Aplica sobrescritas vindas do ambiente. Valores vazios são ignorados.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(email) = get("INOCULATOR_EMAIL") {
            self.email = email;
        }
        if let Some(password) = get("INOCULATOR_PASSWORD") {
            self.password = password;
        }
        if let Some(headless) = get("HEADLESS") {
            self.headless = headless.eq_ignore_ascii_case("true");
        }
    }

    /// Cronograma de espera da fase.
    pub fn phase_timing(&self, phase: Phase) -> PhaseTiming {
        match phase {
            Phase::Generate => self.generate,
            Phase::Simulate => self.simulate,
            Phase::Export => self.export,
        }
    }

    /// Verifica os campos obrigatórios antes de abrir o navegador.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.projects.is_empty() {
            return Err(RunnerError::NoProjects);
        }
        if self.base_url.trim().is_empty() {
            return Err(RunnerError::Config("base_url must not be empty".into()));
        }
        if self.email.is_empty() || self.password.is_empty() {
            return Err(RunnerError::Config(
                "email and password are required (set INOCULATOR_EMAIL / INOCULATOR_PASSWORD)"
                    .into(),
            ));
        }
        if let Some(p) = self.projects.iter().find(|p| p.id.trim().is_empty()) {
            return Err(RunnerError::Config(format!(
                "project `{}` has an empty id",
                p.name
            )));
        }
        Ok(())
    }

    /// URL da página de um projeto.
    pub fn project_url(&self, project_id: &str) -> String {
        format!("{}/projects/{project_id}", self.base_url.trim_end_matches('/'))
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url.trim_end_matches('/'))
    }
}
