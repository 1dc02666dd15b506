//! Header names used by the bucket API (all lowercase, the form they are
//! signed in)

pub const CONTENT_TYPE: &str = "content-type";
pub const ACCEPT: &str = "accept";
pub const HOST: &str = "host";
pub const AUTHORIZATION: &str = "authorization";
pub const AMZ_DATE: &str = "x-amz-date";
pub const AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";
pub const AMZ_ACL: &str = "x-amz-acl";
pub const AMZ_PUBLIC_LIST_OBJECTS: &str = "x-amz-acl-public-list-objects-enabled";
pub const IDENTITY_ID: &str = "s3-identity-id";

pub const APPLICATION_JSON: &str = "application/json";
