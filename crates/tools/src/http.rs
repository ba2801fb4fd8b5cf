//! Shared HTTP client for the data-source adapters.
//!
//! Every adapter holds a clone of one [`HttpClient`]; reqwest clients share
//! their connection pool across clones.

use serde::de::DeserializeOwned;
use std::time::Duration;
use toolweave_core::error::ToolError;
use tracing::debug;

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("toolweave/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            timeout_secs,
        }
    }

    /// GET a JSON document. Non-2xx statuses are execution failures.
    pub async fn get_json<T: DeserializeOwned>(&self, tool: &str, url: &str) -> Result<T, ToolError> {
        self.get_json_opt(tool, url)
            .await?
            .ok_or_else(|| failed(tool, "upstream returned 404"))
    }

    /// Like [`get_json`](Self::get_json), but a 404 is `Ok(None)`.
    pub async fn get_json_opt<T: DeserializeOwned>(
        &self,
        tool: &str,
        url: &str,
    ) -> Result<Option<T>, ToolError> {
        debug!(tool, url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_err(tool, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(tool, response).await.map(Some)
    }

    /// POST a JSON body and decode the JSON reply.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        tool: &str,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ToolError> {
        debug!(tool, url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_err(tool, e))?;
        Self::decode(tool, response).await
    }

    async fn decode<T: DeserializeOwned>(tool: &str, response: reqwest::Response) -> Result<T, ToolError> {
        let status = response.status();
        if !status.is_success() {
            return Err(failed(tool, format!("upstream returned {}", status.as_u16())));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| failed(tool, format!("invalid response body: {e}")))
    }

    fn map_err(&self, tool: &str, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout {
                tool_name: tool.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            failed(tool, err.to_string())
        }
    }
}

pub(crate) fn failed(tool: &str, reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: reason.into(),
    }
}
