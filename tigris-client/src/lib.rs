//! Control-plane client for Tigris buckets
//!
//! Buckets are created, checked and deleted through the S3-compatible API and
//! configured (ACL, public listing, website domain, shadow bucket) through
//! Tigris' JSON bucket API. Requests to the latter are signed with AWS
//! Signature Version 4 and retried on server errors.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tigris_client::{BucketUpdateInput, CallContext, CannedAcl, ClientConfig, TigrisClient};
//!
//! # async fn run() -> Result<(), tigris_client::TigrisError> {
//! let client = TigrisClient::new(ClientConfig::load()?)?;
//! let ctx = CallContext::new();
//!
//! client
//!     .create_bucket(&ctx, &BucketUpdateInput::new("my-bucket").acl(CannedAcl::PublicRead))
//!     .await?;
//! let metadata = client.get_bucket_metadata(&ctx, "my-bucket").await?;
//! assert_eq!(metadata.canned_acl(), CannedAcl::PublicRead);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod s3;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::TigrisClient;
pub use crate::config::{ClientConfig, RetrySettings, DEFAULT_ENDPOINT, DEFAULT_REGION};
pub use context::CallContext;
pub use error::TigrisError;
pub use request::{ApiRequest, RequestBuilder};
pub use retry::{RetryPolicy, SignedRetryExecutor};
pub use s3::{S3Api, SdkS3Api};
pub use transport::{RawResponse, ReqwestTransport, SignedRequest, Transport, TransportError};

pub use tigris_core::{
    BucketAttributes, BucketMetadata, BucketUpdateInput, CannedAcl, Field, ShadowConfig,
    WebsiteConfig,
};
