// src/core/retry.rs
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use super::net::{HttpResponse, Method, Request, Transport};
use crate::config::options::RetryPolicy;
use crate::error::{Result, ScrapeError};

pub type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Runs idempotent requests with bounded exponential backoff.
///
/// 5xx statuses in the policy's list are turned into retry triggers, as are
/// timeouts and connection failures. Anything else is returned as-is.
pub struct Executor {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
    sleep: Sleeper,
}

impl Executor {
    pub fn new(transport: Box<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy, sleep: Box::new(std::thread::sleep) }
    }

    /// Swap the sleep function (tests use a recorder so nothing actually waits).
    pub fn with_sleeper(mut self, sleep: Sleeper) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.execute(&Request {
            method: Method::Get,
            url,
            headers,
            form: None,
            timeout: self.policy.get_timeout,
        })
    }

    /// Form POST. Only ever used for read-only queries and login.
    pub fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        self.execute(&Request {
            method: Method::Post,
            url,
            headers,
            form: Some(form),
            timeout: self.policy.post_timeout,
        })
    }

    pub fn execute(&self, req: &Request<'_>) -> Result<HttpResponse> {
        let max = self.policy.max_attempts.max(1);
        let mut last_err: Option<ScrapeError> = None;

        for attempt in 1..=max {
            let outcome = match self.transport.send(req) {
                Ok(resp) if self.policy.is_retry_status(resp.status) => {
                    Err(ScrapeError::transient(req.url, format!("HTTP {}", resp.status)))
                }
                other => other,
            };

            match outcome {
                Ok(resp) => {
                    if attempt > 1 {
                        debug!(url = req.url, attempt, "succeeded after retry");
                    }
                    return Ok(resp);
                }
                Err(e) if e.is_retryable() => {
                    if attempt < max {
                        let wait = self.policy.backoff(attempt, rand::thread_rng().r#gen::<f64>());
                        warn!(url = req.url, attempt, max, error = %e, wait_ms = wait.as_millis() as u64, "retrying");
                        (self.sleep)(wait);
                    }
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ScrapeError::Internal(format!("retry loop ended without a result for {}", req.url))
        }))
    }
}
