//! Batched remote query/mutation client.
//!
//! The endpoint is a single HTTP POST JSON surface that takes a string query
//! document and answers with `{"data": {...}}`. Multi-item requests are built
//! with field aliases (`item0`, `item1`, ...) and demultiplexed by alias on
//! the way back, so one round trip covers a whole batch.
//!
//! Failure is a typed value (`RemoteError`), never a panic: the pipelines
//! degrade a failed batch to sentinel records and keep going.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Executes one query document and returns the response's `data` object.
pub trait RemoteTransport {
    fn execute(&self, document: &str) -> Result<Map<String, Value>, RemoteError>;
}

/// Alias for the `i`-th item of a batched request.
pub fn alias(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}")
}

/// HTTP transport bound to one endpoint and one API key.
pub struct HttpTransport {
    agent: ureq::Agent,
    url: String,
    api_key: String,
}

impl HttpTransport {
    /// `origin` is the scheme+host of the current page, `endpoint_path` the
    /// API route under it (query API or authoring API).
    pub fn new(origin: &str, endpoint_path: &str, api_key: &str) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            url: format!("{}{}", origin.trim_end_matches('/'), endpoint_path),
            api_key: api_key.to_string(),
        }
    }
}

impl RemoteTransport for HttpTransport {
    fn execute(&self, document: &str) -> Result<Map<String, Value>, RemoteError> {
        let response = self
            .agent
            .post(&self.url)
            .query("sc_apikey", &self.api_key)
            .header("Accept", "application/json")
            .send_json(serde_json::json!({ "query": document }))
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let body: Value = response
            .into_body()
            .read_json()
            .map_err(|e| RemoteError::Malformed(format!("response is not JSON: {e}")))?;

        match body.get("data") {
            Some(Value::Object(data)) => Ok(data.clone()),
            Some(other) => Err(RemoteError::Malformed(format!(
                "data is not an object: {other}"
            ))),
            None => Err(RemoteError::Malformed("response missing data".to_string())),
        }
    }
}
