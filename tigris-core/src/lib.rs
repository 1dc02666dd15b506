//! Core types for the Tigris bucket control plane
//!
//! This crate holds the bucket model shared by the client, the signer and the
//! test server: name validation, the update changeset, the metadata read
//! model and the service error vocabulary.

pub mod bucket;
pub mod error;
pub mod headers;
pub mod request_id;
pub mod types;

pub use bucket::{validate_bucket_name, InvalidBucketName};
pub use error::{ErrorCode, ServiceError};
pub use request_id::RequestId;
pub use types::{
    BucketAttributes, BucketMd, BucketMetadata, BucketUpdateBody, BucketUpdateInput,
    BucketUpdateResponse, CannedAcl, Field, ShadowConfig, WebsiteConfig,
};
