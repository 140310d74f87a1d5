//! Livy REST client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use dqjobs_protocols::{ExecutionError, ExecutionService, RemoteSession, SubmitRequest};

use crate::types::{BatchRequest, parse_session};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Connection and submission settings.
#[derive(Debug, Clone)]
pub struct LivyOptions {
    /// Batch endpoint, e.g. `http://livy:8998/batches`.
    pub uri: String,
    pub spark_uri: String,
    pub timeout: Duration,
    pub file: String,
    pub class_name: String,
    pub conf: HashMap<String, String>,
}

impl LivyOptions {
    pub fn new(uri: impl Into<String>, spark_uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            spark_uri: spark_uri.into(),
            timeout: Duration::from_secs(30),
            file: String::new(),
            class_name: String::new(),
            conf: HashMap::new(),
        }
    }
}

/// Livy batch client.
pub struct LivyClient {
    client: Client,
    options: LivyOptions,
}

impl LivyClient {
    pub fn new(options: LivyOptions) -> Result<Self, ExecutionError> {
        Url::parse(&options.uri)
            .map_err(|e| ExecutionError::Transport(format!("invalid Livy URI '{}': {}", options.uri, e)))?;
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        Ok(Self { client, options })
    }

    fn base_uri(&self) -> &str {
        self.options.uri.trim_end_matches('/')
    }

    fn session_uri(&self, session_id: i64) -> String {
        format!("{}/{}", self.base_uri(), session_id)
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ExecutionError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ExecutionError::Transport(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        Ok(body)
    }
}

#[async_trait]
impl ExecutionService for LivyClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<RemoteSession, ExecutionError> {
        let args = vec![
            serde_json::to_string(&request.measure)
                .map_err(|e| ExecutionError::MalformedBody(e.to_string()))?,
            serde_json::to_string(&request.schedule)
                .map_err(|e| ExecutionError::MalformedBody(e.to_string()))?,
        ];
        let batch = BatchRequest {
            file: &self.options.file,
            class_name: &self.options.class_name,
            name: &request.name,
            args,
            conf: &self.options.conf,
        };

        debug!("Submitting Livy batch '{}' to {}", request.name, self.base_uri());

        let response = self
            .client
            .post(self.base_uri())
            .json(&batch)
            .send()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        let body = Self::read_body(response).await?;
        parse_session(&body, &self.options.spark_uri)
    }

    async fn session_status(&self, session_id: i64) -> Result<RemoteSession, ExecutionError> {
        let uri = self.session_uri(session_id);
        debug!("Fetching Livy session status from {}", uri);

        let response = self
            .client
            .get(&uri)
            .send()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        let body = Self::read_body(response).await?;
        parse_session(&body, &self.options.spark_uri)
    }
}
