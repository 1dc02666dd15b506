//! In-crate fakes for the transport and S3 seams

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::TigrisError;
use crate::s3::S3Api;
use crate::transport::{RawResponse, SignedRequest, Transport, TransportError};

pub const TEST_ENDPOINT: &str = "https://tigris.test";

/// Transport answering from a script, one entry per send
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    sent: Mutex<Vec<(Instant, SignedRequest)>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Result<RawResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn responses(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok))
    }

    /// Same response `n` times
    pub fn repeat(response: RawResponse, n: usize) -> Self {
        Self::responses(std::iter::repeat(response).take(n))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn sent(&self) -> Vec<SignedRequest> {
        self.sent.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Time between consecutive sends
    pub fn gaps(&self) -> Vec<Duration> {
        let sent = self.sent.lock();
        sent.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: SignedRequest) -> Result<RawResponse, TransportError> {
        self.sent.lock().push((Instant::now(), request));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("script exhausted".into())))
    }
}

pub fn success() -> RawResponse {
    RawResponse::new(200, r#"{"Update":"success"}"#)
}

/// S3 seam backed by an in-memory bucket set
#[derive(Default)]
pub struct FakeS3 {
    buckets: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    fail_with: Mutex<Option<(u16, String)>>,
}

impl FakeS3 {
    pub fn with_buckets<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let fake = Self::default();
        fake.buckets.lock().extend(names.into_iter().map(String::from));
        fake
    }

    /// Fail every later call with an S3 error carrying `code`
    pub fn fail_with(&self, status: u16, code: &str) {
        *self.fail_with.lock() = Some((status, code.to_string()));
    }

    pub fn contains(&self, bucket: &str) -> bool {
        self.buckets.lock().contains(bucket)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, operation: &'static str, bucket: &str) -> Result<(), TigrisError> {
        self.calls.lock().push(format!("{operation} {bucket}"));
        match self.fail_with.lock().as_ref() {
            Some((status, code)) => Err(s3_error(operation, code, *status)),
            None => Ok(()),
        }
    }
}

fn s3_error(operation: &'static str, code: &str, status: u16) -> TigrisError {
    TigrisError::S3 {
        operation,
        code: Some(code.to_string()),
        source: format!("service returned {status}").into(),
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn create_bucket(&self, bucket: &str) -> Result<(), TigrisError> {
        self.record("CreateBucket", bucket)?;
        self.buckets.lock().insert(bucket.to_string());
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), TigrisError> {
        self.record("HeadBucket", bucket)?;
        if self.contains(bucket) {
            Ok(())
        } else {
            Err(TigrisError::NotFound {
                bucket: bucket.to_string(),
            })
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), TigrisError> {
        self.record("DeleteBucket", bucket)?;
        if self.buckets.lock().remove(bucket) {
            Ok(())
        } else {
            Err(s3_error("DeleteBucket", "NoSuchBucket", 404))
        }
    }
}
