//! Bucket operations

use std::sync::Arc;

use tigris_auth::{Credentials, SigningContext};
use tigris_core::{validate_bucket_name, BucketAttributes, BucketMetadata, BucketUpdateInput};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::TigrisError;
use crate::request::{validate_input, RequestBuilder};
use crate::response::{decode_metadata, decode_update_response};
use crate::retry::SignedRetryExecutor;
use crate::s3::{S3Api, SdkS3Api};
use crate::transport::{ReqwestTransport, Transport};

/// Client for the Tigris bucket control plane.
///
/// Holds only immutable configuration, so one client can serve any number
/// of concurrent calls.
#[derive(Clone)]
pub struct TigrisClient {
    builder: RequestBuilder,
    executor: SignedRetryExecutor,
    s3: Arc<dyn S3Api>,
}

impl TigrisClient {
    pub fn new(config: ClientConfig) -> Result<Self, TigrisError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        let s3 = SdkS3Api::new(&config);
        Self::with_parts(&config, Arc::new(transport), Arc::new(s3))
    }

    /// Client over caller-supplied transport and S3 implementations
    pub fn with_parts(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        s3: Arc<dyn S3Api>,
    ) -> Result<Self, TigrisError> {
        let builder = RequestBuilder::new(&config.endpoint)?;
        let signer = SigningContext::new(
            Credentials::new(&config.access_key_id, &config.secret_access_key),
            config.region.clone(),
        );
        let executor = SignedRetryExecutor::new(signer, transport, config.retry_policy());

        Ok(Self {
            builder,
            executor,
            s3,
        })
    }

    /// Create the bucket, then apply whatever attributes `input` sets.
    ///
    /// Creating a bucket the caller already owns succeeds, so a retried
    /// create converges on the same state.
    pub async fn create_bucket(
        &self,
        ctx: &CallContext,
        input: &BucketUpdateInput,
    ) -> Result<(), TigrisError> {
        validate_input(input)?;

        info!(bucket = %input.bucket, "creating bucket");
        ctx.run(self.s3.create_bucket(&input.bucket)).await?;

        self.update_bucket(ctx, input).await
    }

    /// Apply the attribute changes in `input`. Nothing is sent when it
    /// changes nothing.
    pub async fn update_bucket(
        &self,
        ctx: &CallContext,
        input: &BucketUpdateInput,
    ) -> Result<(), TigrisError> {
        validate_input(input)?;
        if !input.has_changes() {
            debug!(bucket = %input.bucket, "no attribute changes");
            return Ok(());
        }

        let request = self.builder.update_bucket(input)?;
        info!(
            bucket = %input.bucket,
            acl = input.acl.is_changed(),
            public_list_objects = input.public_list_objects.is_changed(),
            website = input.website.is_changed(),
            shadow = input.shadow.is_changed(),
            "updating bucket"
        );
        let response = self.executor.execute(ctx, &request).await?;
        decode_update_response(response)
    }

    /// Whether the bucket exists. A missing bucket is `Ok(false)`, any other
    /// failure is an error.
    pub async fn head_bucket(&self, ctx: &CallContext, bucket: &str) -> Result<bool, TigrisError> {
        validate_bucket_name(bucket)?;

        match ctx.run(self.s3.head_bucket(bucket)).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                debug!(bucket = %bucket, "bucket not found");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the bucket. Deleting a bucket that is already gone succeeds.
    pub async fn delete_bucket(&self, ctx: &CallContext, bucket: &str) -> Result<(), TigrisError> {
        validate_bucket_name(bucket)?;

        info!(bucket = %bucket, "deleting bucket");
        match ctx.run(self.s3.delete_bucket(bucket)).await {
            Err(e) if e.is_not_found() => {
                debug!(bucket = %bucket, "bucket already absent");
                Ok(())
            }
            result => result,
        }
    }

    pub async fn get_bucket_metadata(
        &self,
        ctx: &CallContext,
        bucket: &str,
    ) -> Result<BucketMetadata, TigrisError> {
        let request = self.builder.bucket_metadata(bucket)?;
        let response = self.executor.execute(ctx, &request).await?;
        decode_metadata(response)
    }

    /// Bring the bucket to `desired`, sending only the attributes that
    /// differ from what the service reports. Returns whether anything was
    /// sent.
    pub async fn apply_attributes(
        &self,
        ctx: &CallContext,
        bucket: &str,
        desired: &BucketAttributes,
    ) -> Result<bool, TigrisError> {
        let current = self.get_bucket_metadata(ctx, bucket).await?.attributes();
        let input = BucketUpdateInput::from_diff(bucket, &current, desired);
        if !input.has_changes() {
            return Ok(false);
        }
        self.update_bucket(ctx, &input).await?;
        Ok(true)
    }
}
