use crate::core::cancel::CancellationToken;
use crate::core::error::{GenerationError, Result};
use crate::services::llm::LlmClient;
use log::{debug, info, warn};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Transport retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
    /// Per-attempt limit.
    pub timeout: Duration,
    /// Re-dispatches allowed when a reply parses badly or repeats itself.
    pub parse_retries: u32,
    pub duplicate_threshold: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            backoff_factor: 2,
            timeout: Duration::from_secs(60),
            parse_retries: 1,
            duplicate_threshold: 0.78,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(self.backoff_factor.saturating_pow(attempt))
    }
}

/// Resolves when either token fires.
async fn interrupted(caller: &CancellationToken, own: &CancellationToken) {
    tokio::select! {
        _ = caller.cancelled() => {}
        _ = own.cancelled() => {}
    }
}

/// Sleeps for `delay` unless one of the tokens fires first.
pub async fn wait_backoff(
    delay: Duration,
    caller: &CancellationToken,
    own: &CancellationToken,
) -> Result<()> {
    tokio::select! {
        _ = interrupted(caller, own) => Err(GenerationError::Cancelled),
        _ = sleep(delay) => Ok(()),
    }
}

/// Sends requests to a backend with timeout, retry and cancellation.
///
/// At most one dispatch is in flight: starting a new one cancels the previous.
#[derive(Debug, Default)]
pub struct BackendDispatcher {
    policy: RetryPolicy,
    current: Mutex<Option<CancellationToken>>,
}

impl BackendDispatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            current: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn abort_current(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.take() {
            debug!("Aborting in-flight dispatch");
            token.cancel();
        }
    }

    pub async fn dispatch(
        &self,
        client: &dyn LlmClient,
        system: &str,
        request: &str,
        token: &CancellationToken,
    ) -> Result<String> {
        let own = CancellationToken::new();
        {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = current.replace(own.clone()) {
                info!("Superseding previous dispatch");
                previous.cancel();
            }
        }

        let result = self.run(client, system, request, token, &own).await;

        {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if current.as_ref().is_some_and(|t| t.same_as(&own)) {
                *current = None;
            }
        }
        result
    }

    async fn run(
        &self,
        client: &dyn LlmClient,
        system: &str,
        request: &str,
        caller: &CancellationToken,
        own: &CancellationToken,
    ) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            if caller.is_cancelled() || own.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            debug!(
                "Dispatching request (attempt {}/{}, {} chars)",
                attempt + 1,
                self.policy.max_retries + 1,
                request.chars().count()
            );
            let call = tokio::time::timeout(self.policy.timeout, client.generate(system, request));
            let outcome = tokio::select! {
                _ = interrupted(caller, own) => return Err(GenerationError::Cancelled),
                res = call => match res {
                    Ok(inner) => inner,
                    Err(_) => Err(GenerationError::BackendGeneric(format!(
                        "request timed out after {}s",
                        self.policy.timeout.as_secs_f64()
                    ))),
                },
            };

            match outcome {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Backend call failed (retry {}/{} in {:?}): {}",
                        attempt, self.policy.max_retries, delay, e
                    );
                    wait_backoff(delay, caller, own).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
