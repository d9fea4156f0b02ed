//! Remote execution of the candidate's code.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("code executor unreachable: {0}")]
    Unreachable(String),
    #[error("code executor returned a malformed response: {0}")]
    BadResponse(String),
}

/// Output of one run. Opaque text; the core never interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub output: String,
}

/// Executes submitted code somewhere else. One request, one response; no
/// streaming and no retries.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, code: &str) -> Result<RunOutput, RunnerError>;
}

#[derive(Serialize)]
struct RunRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct RunResponse {
    #[serde(default)]
    output: Option<String>,
}

/// [`CodeRunner`] over the executor's HTTP surface: `POST {base}/run` with
/// `{"code": ...}`, answered by `{"output": ...}`.
pub struct HttpCodeRunner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCodeRunner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CodeRunner for HttpCodeRunner {
    async fn run(&self, code: &str) -> Result<RunOutput, RunnerError> {
        let url = format!("{}/run", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&RunRequest { code })
            .send()
            .await
            .map_err(|e| RunnerError::Unreachable(e.to_string()))?;
        let body: RunResponse = response
            .json()
            .await
            .map_err(|e| RunnerError::BadResponse(e.to_string()))?;
        Ok(RunOutput {
            output: body.output.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_is_a_bare_code_field() {
        let body = serde_json::to_value(RunRequest { code: "print('hi')" }).unwrap();
        assert_eq!(body, serde_json::json!({"code": "print('hi')"}));
    }

    #[test]
    fn response_output_may_be_absent() {
        let full: RunResponse = serde_json::from_str(r#"{"output": "hi\n"}"#).unwrap();
        assert_eq!(full.output.as_deref(), Some("hi\n"));

        let empty: RunResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.output, None);
    }

    /// Needs a live executor; point `COACH_RUNNER_URL` at one and run with
    /// `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn runs_code_against_a_live_executor() {
        dotenvy::dotenv_override().ok();
        let base = std::env::var("COACH_RUNNER_URL").expect("COACH_RUNNER_URL not set");
        let runner = HttpCodeRunner::new(base);
        let out = runner.run("print('ok')").await.expect("executor reachable");
        assert!(out.output.contains("ok"));
    }
}
