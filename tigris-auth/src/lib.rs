//! Request authentication for the Tigris bucket API
//!
//! Implements AWS Signature Version 4: signing on the client side and the
//! matching verification used by the test server.

pub mod credentials;
pub mod sigv4;

pub use credentials::Credentials;
pub use sigv4::{
    parse_authorization_header, payload_hash, verify_signature, AuthorizationHeader,
    SigV4Error, SignableRequest, SigningContext, SigningOutput, VerifiableRequest,
};
