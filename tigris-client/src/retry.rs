//! Signed dispatch with exponential backoff

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tigris_auth::SigningContext;
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::error::TigrisError;
use crate::request::ApiRequest;
use crate::transport::{RawResponse, Transport};

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Doubling delays starting at `base_delay`, each capped at `max_delay`
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        let max = self.max_delay;
        std::iter::successors(Some(self.base_delay.min(max)), move |d| {
            Some(d.saturating_mul(2).min(max))
        })
    }

    /// One delay per attempt. Only the delays that precede another attempt
    /// are ever slept.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        self.backoff().take(self.max_attempts as usize)
    }
}

/// Sends bucket API requests, re-signing and retrying on transient failure.
///
/// An attempt is retried when the server answers 5xx or the exchange fails
/// at the transport level. 4xx answers and signing failures end the call at
/// once. When the attempts run out, the last response or transport error is
/// handed back unchanged.
///
/// Mutating requests are retried blindly. This relies on the service
/// treating repeats as idempotent: creating an owned bucket again has a
/// defined outcome, an update sets the same attributes again and deleting an
/// absent bucket is tolerated. If the service ever attaches side effects to
/// individual calls, retried requests need idempotency keys.
#[derive(Clone)]
pub struct SignedRetryExecutor {
    signer: SigningContext,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl SignedRetryExecutor {
    pub fn new(signer: SigningContext, transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            signer,
            transport,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn signer(&self) -> &SigningContext {
        &self.signer
    }

    /// Execute `request`, honouring the cancellation and deadline of `ctx`
    /// before and during every send and every backoff sleep.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        request: &ApiRequest,
    ) -> Result<RawResponse, TigrisError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delays = self.policy.backoff();
        let mut attempt: u32 = 1;

        loop {
            ctx.check()?;

            // Fresh timestamp and signature for every transmission
            let signed = request.sign(&self.signer, Utc::now())?;
            debug!(
                method = %signed.method,
                url = %signed.url,
                attempt,
                "dispatching request"
            );

            let outcome = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                outcome = self.transport.send(signed) => outcome,
            };

            let retryable = match &outcome {
                Ok(response) => response.is_server_error(),
                Err(e) => e.is_retryable(),
            };
            if !retryable {
                return outcome.map_err(TigrisError::from);
            }
            if attempt >= max_attempts {
                warn!(attempt, "giving up after {max_attempts} attempts");
                return outcome.map_err(TigrisError::from);
            }

            let delay = delays.next().unwrap_or(self.policy.max_delay);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            match &outcome {
                Ok(response) => warn!(
                    attempt,
                    status = response.status,
                    delay_ms,
                    "server error, retrying"
                ),
                Err(e) => warn!(attempt, error = %e, delay_ms, "transport error, retrying"),
            }

            ctx.check()?;
            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
