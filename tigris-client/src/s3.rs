//! S3-compatible bucket calls

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use tigris_core::headers;

use crate::config::ClientConfig;
use crate::error::TigrisError;

/// Bucket lifecycle calls that go through the S3-compatible API
#[async_trait]
pub trait S3Api: Send + Sync {
    /// Create `bucket`. A bucket the caller already owns counts as created.
    async fn create_bucket(&self, bucket: &str) -> Result<(), TigrisError>;

    /// [`TigrisError::NotFound`] when the bucket does not exist
    async fn head_bucket(&self, bucket: &str) -> Result<(), TigrisError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), TigrisError>;
}

/// [`S3Api`] backed by the AWS SDK, using path-style addressing
#[derive(Debug, Clone)]
pub struct SdkS3Api {
    client: aws_sdk_s3::Client,
    identity: String,
}

impl SdkS3Api {
    pub fn new(config: &ClientConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "tigris",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint.clone())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            identity: config.access_key_id.clone(),
        }
    }
}

#[async_trait]
impl S3Api for SdkS3Api {
    async fn create_bucket(&self, bucket: &str) -> Result<(), TigrisError> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                tracing::debug!(bucket = %bucket, "bucket already owned by caller");
                Ok(())
            }
            Err(e) => Err(sdk_error("CreateBucket", e)),
        }
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), TigrisError> {
        let identity = self.identity.clone();
        let result = self
            .client
            .head_bucket()
            .bucket(bucket)
            .customize()
            .mutate_request(move |req| {
                req.headers_mut().insert(headers::IDENTITY_ID, identity.clone());
            })
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(TigrisError::NotFound {
                bucket: bucket.to_string(),
            }),
            Err(e) => Err(sdk_error("HeadBucket", e)),
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), TigrisError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| sdk_error("DeleteBucket", e))
    }
}

fn is_not_found(
    err: &SdkError<aws_sdk_s3::operation::head_bucket::HeadBucketError, HttpResponse>,
) -> bool {
    err.as_service_error().is_some_and(|e| e.is_not_found())
        || err.raw_response().is_some_and(|r| r.status().as_u16() == 404)
}

fn sdk_error<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> TigrisError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    TigrisError::S3 {
        operation,
        code: err.code().map(String::from),
        source: Box::new(err),
    }
}
