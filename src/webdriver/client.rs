use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};

use super::error::WebDriverError;
use super::types::{Browser, ElementRef, Envelope, ErrorValue, Locator, NewSession, new_session_body};

/// Minimal W3C WebDriver client bound to one browser session.
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    session_id: String,
}

fn http_client() -> Result<Client, WebDriverError> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .build()?;
    Ok(client)
}

impl WebDriverClient {
    /// Opens a new browser session on the WebDriver server at `base_url`.
    pub async fn connect(
        base_url: &str,
        browser: Browser,
        headless: bool,
    ) -> Result<Self, WebDriverError> {
        let client = http_client()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let response = client
            .post(format!("{base_url}/session"))
            .json(&new_session_body(browser, headless))
            .send()
            .await?;
        let session: NewSession = decode(response).await?;
        Ok(Self {
            client,
            base_url,
            session_id: session.session_id,
        })
    }

    /// Reuses an already created session.
    #[cfg(test)]
    pub fn attach(base_url: &str, session_id: impl Into<String>) -> Result<Self, WebDriverError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: session_id.into(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{path}", self.base_url, self.session_id)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, WebDriverError> {
        let response = self.client.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, WebDriverError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    /// Ends the browser session.
    pub async fn quit(self) -> Result<(), WebDriverError> {
        let response = self.client.delete(self.url("")).send().await?;
        decode::<Value>(response).await?;
        Ok(())
    }

    pub async fn goto(&self, url: &str) -> Result<(), WebDriverError> {
        self.post::<Value>("/url", &json!({ "url": url })).await?;
        Ok(())
    }

    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, WebDriverError> {
        self.post("/elements", &locator.to_body()).await
    }

    /// Searches below `parent` only.
    pub async fn find_all_in(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, WebDriverError> {
        self.post(&format!("/element/{}/elements", parent.id), &locator.to_body())
            .await
    }

    pub async fn find(&self, locator: &Locator) -> Result<ElementRef, WebDriverError> {
        self.find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WebDriverError::NoSuchElement(locator.to_string()))
    }

    /// First match below `parent`, if any.
    pub async fn find_in(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Option<ElementRef>, WebDriverError> {
        Ok(self.find_all_in(parent, locator).await?.into_iter().next())
    }

    pub async fn click(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.post::<Value>(&format!("/element/{}/click", element.id), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn clear(&self, element: &ElementRef) -> Result<(), WebDriverError> {
        self.post::<Value>(&format!("/element/{}/clear", element.id), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), WebDriverError> {
        self.post::<Value>(
            &format!("/element/{}/value", element.id),
            &json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        self.get(&format!("/element/{}/text", element.id)).await
    }

    pub async fn is_selected(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.get(&format!("/element/{}/selected", element.id)).await
    }

    pub async fn is_enabled(&self, element: &ElementRef) -> Result<bool, WebDriverError> {
        self.get(&format!("/element/{}/enabled", element.id)).await
    }

    /// Polls until `locator` matches at least one element.
    pub async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<ElementRef, WebDriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.find_all(locator).await?.into_iter().next() {
                return Ok(el);
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::Timeout {
                    what: locator.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            sleep(poll).await;
        }
    }

    /// Polls until the first match of `locator` reports itself enabled.
    pub async fn wait_until_enabled(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<ElementRef, WebDriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.find_all(locator).await?.into_iter().next()
                && self.is_enabled(&el).await?
            {
                return Ok(el);
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::Timeout {
                    what: format!("{locator} to be enabled"),
                    secs: timeout.as_secs(),
                });
            }
            sleep(poll).await;
        }
    }
}

/// Unwraps the `{"value": ...}` envelope, mapping protocol errors.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, WebDriverError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let err = serde_json::from_str::<Envelope<ErrorValue>>(&body)
            .map(|e| e.value)
            .map_err(|_| WebDriverError::Malformed(format!("status {status}: {body}")))?;
        if err.error == "no such element" {
            return Err(WebDriverError::NoSuchElement(err.message));
        }
        return Err(WebDriverError::Protocol {
            status: status.as_u16(),
            error: err.error,
            message: err.message,
        });
    }

    serde_json::from_str::<Envelope<T>>(&body)
        .map(|e| e.value)
        .map_err(|e| WebDriverError::Malformed(format!("{e}: {body}")))
}
