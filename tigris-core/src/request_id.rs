//! Service request IDs

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

/// Response header carrying the primary request ID
pub const REQUEST_ID_HEADER: &str = "x-amz-request-id";

/// Response header carrying the extended request ID
pub const EXTENDED_REQUEST_ID_HEADER: &str = "x-amz-id-2";

/// The ID pair the service attaches to every response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId {
    /// Uppercase hex, sent as `x-amz-request-id`
    pub id: String,
    /// Base64, sent as `x-amz-id-2`
    pub extended_id: String,
}

impl RequestId {
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string().to_uppercase(),
            extended_id: STANDARD.encode(Uuid::new_v4().as_bytes()),
        }
    }

    /// Both IDs as response headers
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            (REQUEST_ID_HEADER, self.id.as_str()),
            (EXTENDED_REQUEST_ID_HEADER, self.extended_id.as_str()),
        ]
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();

        assert_ne!(a.id, b.id);
        assert_ne!(a.extended_id, b.extended_id);
        assert_eq!(a.id.len(), 32);
        assert!(a.id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(STANDARD.decode(&a.extended_id).unwrap().len(), 16);
    }

    #[test]
    fn test_headers() {
        let id = RequestId::generate();
        let headers = id.headers();

        assert_eq!(headers[0], ("x-amz-request-id", id.id.as_str()));
        assert_eq!(headers[1].0, "x-amz-id-2");
        assert_eq!(id.to_string(), id.id);
    }
}
