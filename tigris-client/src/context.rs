//! Per-call cancellation and deadline

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TigrisError;

/// Cancellation signal and optional deadline for one call.
///
/// Cloning shares the token, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token (e.g. a shutdown signal)
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fails if the call was cancelled or its deadline has passed
    pub fn check(&self) -> Result<(), TigrisError> {
        if self.token.is_cancelled() {
            return Err(TigrisError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TigrisError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves with the reason once the call is cancelled or out of time
    pub async fn done(&self) -> TigrisError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => TigrisError::Cancelled,
                () = tokio::time::sleep_until(deadline) => TigrisError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                TigrisError::Cancelled
            }
        }
    }

    /// Run `fut` unless the call is cancelled or out of time first
    pub async fn run<F, T>(&self, fut: F) -> Result<T, TigrisError>
    where
        F: std::future::Future<Output = Result<T, TigrisError>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            result = fut => result,
        }
    }
}
