//! Tipos de erro do cliente WebDriver.
//!
//! Define [`WebDriverError`] com variantes para erros do protocolo,
//! elementos ausentes, esperas esgotadas e falhas de rede.

use thiserror::Error;

/// Erros que podem ocorrer ao conversar com o servidor WebDriver.
#[derive(Debug, Error)]
pub enum WebDriverError {
    /// O servidor respondeu com um erro do protocolo (4xx/5xx).
    #[error("webdriver error (status {status}) {error}: {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    /// Nenhum elemento corresponde ao localizador.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// Uma espera limitada terminou sem a condição ser satisfeita.
    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    /// A resposta não segue o formato do protocolo.
    #[error("malformed webdriver response: {0}")]
    Malformed(String),

    /// Falha de rede subjacente.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
