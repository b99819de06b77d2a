//! Remote grid client implementation
//!
//! Async HTTP client for the grid's WebDriver-style wire protocol: session
//! creation and commands against the `wd` endpoint, job-result reporting
//! against the REST endpoint. Session ids are accepted in both the legacy
//! top-level `sessionId` shape and the W3C `value.sessionId` shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{BrowserCapability, Config, GridConfig, GridRunError, Result};
use crate::grid::traits::{GridBackend, GridSession};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Remote grid API client
#[derive(Clone)]
pub struct RemoteGrid {
    client: Client,
    config: GridConfig,
    debug: bool,
}

/// New-session request body
#[derive(Debug, Serialize)]
struct NewSessionRequest<'a> {
    #[serde(rename = "desiredCapabilities")]
    desired_capabilities: &'a BrowserCapability,
}

/// New-session response, covering both wire dialects
#[derive(Debug, Deserialize)]
struct NewSessionResponse {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    value: Option<NewSessionValue>,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Element-lookup request body
#[derive(Debug, Serialize)]
struct ElementsRequest<'a> {
    using: &'static str,
    value: &'a str,
}

/// Element reference, in either wire dialect
#[derive(Debug, Deserialize)]
struct ElementRef {
    #[serde(rename = "ELEMENT")]
    legacy_id: Option<String>,
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    w3c_id: Option<String>,
}

impl ElementRef {
    fn id(&self) -> Option<&str> {
        self.legacy_id.as_deref().or(self.w3c_id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ElementsResponse {
    #[serde(default)]
    value: Vec<ElementRef>,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct HandlesResponse {
    #[serde(default)]
    value: Vec<String>,
}

/// Navigation request body
#[derive(Debug, Serialize)]
struct NavigateRequest<'a> {
    url: &'a str,
}

/// Window-switch request body; both dialects read their own key
#[derive(Debug, Serialize)]
struct SwitchWindowRequest<'a> {
    name: &'a str,
    handle: &'a str,
}

/// Job-result report body
#[derive(Debug, Serialize)]
struct ReportBody {
    passed: bool,
}

impl RemoteGrid {
    /// Create a grid client from configuration
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config: config.grid.clone(),
            debug: config.runner.debug,
        }
    }

    fn session_url(&self, session_id: &str, command: &str) -> String {
        format!("{}/session/{}{}", self.config.wd_url, session_id, command)
    }

    fn job_resource_url(&self, session_id: &str) -> String {
        format!(
            "{}/{}/jobs/{}",
            self.config.api_url, self.config.username, session_id
        )
    }

    /// Debug print if enabled
    fn debug_print(&self, label: &str, content: &str) {
        if self.debug {
            eprintln!("DEBUG {}: {}", label, content);
        }
    }
}

#[async_trait]
impl GridBackend for RemoteGrid {
    async fn create_session(&self, capability: &BrowserCapability) -> Result<Box<dyn GridSession>> {
        let request = NewSessionRequest {
            desired_capabilities: capability,
        };
        self.debug_print(
            "New session",
            &serde_json::to_string(&request).unwrap_or_default(),
        );

        let response = self
            .client
            .post(format!("{}/session", self.config.wd_url))
            .basic_auth(&self.config.username, Some(&self.config.access_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GridRunError::grid(format!(
                        "cannot reach grid at {}: {}",
                        self.config.wd_url, e
                    ))
                } else {
                    GridRunError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GridRunError::grid(format!(
                "session request rejected ({}): {}",
                status, body
            )));
        }

        let parsed: NewSessionResponse = response.json().await?;
        let session_id = parsed
            .session_id
            .or_else(|| parsed.value.and_then(|v| v.session_id))
            .ok_or_else(|| GridRunError::grid("session response carried no session id"))?;

        Ok(Box::new(WebDriverSession {
            client: self.clone(),
            session_id,
        }))
    }

    async fn report_result(&self, session_id: &str, passed: bool) -> Result<()> {
        let response = self
            .client
            .put(self.job_resource_url(session_id))
            .basic_auth(&self.config.username, Some(&self.config.access_key))
            .json(&ReportBody { passed })
            .send()
            .await
            .map_err(|e| GridRunError::reporting(format!("job update failed: {}", e)))?;

        if response.status().as_u16() != 200 {
            return Err(GridRunError::reporting(format!(
                "job update for {} returned http status {}",
                session_id,
                response.status()
            )));
        }

        Ok(())
    }

    fn job_link(&self, session_id: &str) -> String {
        format!("{}/{}", self.config.job_link_base, session_id)
    }

    fn name(&self) -> &str {
        "remote-grid"
    }
}

/// One open WebDriver session on the remote grid
struct WebDriverSession {
    client: RemoteGrid,
    session_id: String,
}

impl WebDriverSession {
    async fn command<B: Serialize>(
        &self,
        method: reqwest::Method,
        command: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = self.client.session_url(&self.session_id, command);
        let mut request = self
            .client
            .client
            .request(method, url)
            .basic_auth(
                &self.client.config.username,
                Some(&self.client.config.access_key),
            );
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GridRunError::session(format!("command {} failed: {}", command, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GridRunError::session(format!(
                "command {} failed ({}): {}",
                command, status, text
            )));
        }

        Ok(response)
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let request = ElementsRequest {
            using: "css selector",
            value: selector,
        };
        let response = self
            .command(reqwest::Method::POST, "/elements", Some(&request))
            .await?;
        let parsed: ElementsResponse = response.json().await?;
        Ok(parsed.value)
    }
}

#[async_trait]
impl GridSession for WebDriverSession {
    fn id(&self) -> &str {
        &self.session_id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.command(reqwest::Method::POST, "/url", Some(&NavigateRequest { url }))
            .await?;
        Ok(())
    }

    async fn count_elements(&self, selector: &str) -> Result<usize> {
        Ok(self.find_elements(selector).await?.len())
    }

    async fn element_texts(&self, selector: &str) -> Result<Vec<String>> {
        let elements = self.find_elements(selector).await?;
        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            let id = element
                .id()
                .ok_or_else(|| GridRunError::session("element reference carried no id"))?;
            let response = self
                .command::<()>(
                    reqwest::Method::GET,
                    &format!("/element/{}/text", id),
                    None,
                )
                .await?;
            let parsed: TextResponse = response.json().await?;
            texts.push(parsed.value);
        }
        Ok(texts)
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        let response = self
            .command::<()>(reqwest::Method::GET, "/window_handles", None)
            .await?;
        let parsed: HandlesResponse = response.json().await?;
        Ok(parsed.value)
    }

    async fn switch_window(&self, handle: &str) -> Result<()> {
        let request = SwitchWindowRequest {
            name: handle,
            handle,
        };
        self.command(reqwest::Method::POST, "/window", Some(&request))
            .await?;
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        self.command::<()>(reqwest::Method::DELETE, "", None).await?;
        Ok(())
    }
}
