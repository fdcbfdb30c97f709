//! Tipos de dados do protocolo W3C WebDriver usados pelo cliente.
//!
//! Todas as respostas do protocolo chegam embrulhadas em `{"value": ...}`;
//! o [`Envelope`] faz esse desembrulho genérico.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Chave fixa que identifica uma referência de elemento no protocolo W3C.
#[allow(dead_code)]
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52b-4f735466cecc";

/// Envelope padrão de toda resposta WebDriver.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
}

/// Corpo de erro retornado com status HTTP 4xx/5xx.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorValue {
    /// Código de erro do protocolo (ex.: "no such element").
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Valor retornado por `POST /session`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Referência opaca a um elemento da página.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52b-4f735466cecc")]
    pub id: String,
}

/// Estratégia de localização de elementos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// Corpo JSON para os comandos `elements`.
    pub fn to_body(&self) -> Value {
        match self {
            Locator::Css(s) => json!({ "using": "css selector", "value": s }),
            Locator::XPath(s) => json!({ "using": "xpath", "value": s }),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{s}`"),
            Locator::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// Navegador alvo da sessão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

/// Monta o corpo de `POST /session` com as capacidades do navegador.
pub fn new_session_body(browser: Browser, headless: bool) -> Value {
    let capabilities = match browser {
        Browser::Chrome => {
            let mut args = vec!["--window-size=1920,1080".to_string()];
            if headless {
                args.push("--headless=new".to_string());
            }
            json!({
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            })
        }
        Browser::Firefox => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            json!({
                "browserName": "firefox",
                "moz:firefoxOptions": { "args": args }
            })
        }
    };
    json!({ "capabilities": { "alwaysMatch": capabilities } })
}
