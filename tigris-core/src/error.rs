//! Service error codes and formatting

use std::str::FromStr;
use thiserror::Error;

/// Error codes reported by the Tigris endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication
    AccessDenied,
    InvalidAccessKeyId,
    InvalidSignature,
    RequestTimeTooSkewed,

    // Bucket
    NoSuchBucket,
    BucketAlreadyExists,
    BucketAlreadyOwnedByYou,
    BucketNotEmpty,
    InvalidBucketName,
    InvalidArgument,
    MalformedJson,

    // Server side
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::InvalidSignature => "SignatureDoesNotMatch",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidArgument => "InvalidArgument",
            Self::MalformedJson => "MalformedJSON",
            Self::InternalError => "InternalError",
            Self::ServiceUnavailable => "ServiceUnavailable",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::AccessDenied
            | Self::InvalidAccessKeyId
            | Self::InvalidSignature
            | Self::RequestTimeTooSkewed => 403,
            Self::NoSuchBucket => 404,
            Self::BucketAlreadyExists | Self::BucketAlreadyOwnedByYou | Self::BucketNotEmpty => 409,
            Self::InvalidBucketName | Self::InvalidArgument | Self::MalformedJson => 400,
            Self::InternalError => 500,
            Self::ServiceUnavailable => 503,
        }
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let code = match code {
            "AccessDenied" => Self::AccessDenied,
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId,
            "SignatureDoesNotMatch" => Self::InvalidSignature,
            "RequestTimeTooSkewed" => Self::RequestTimeTooSkewed,
            "NoSuchBucket" => Self::NoSuchBucket,
            "BucketAlreadyExists" => Self::BucketAlreadyExists,
            "BucketAlreadyOwnedByYou" => Self::BucketAlreadyOwnedByYou,
            "BucketNotEmpty" => Self::BucketNotEmpty,
            "InvalidBucketName" => Self::InvalidBucketName,
            "InvalidArgument" => Self::InvalidArgument,
            "MalformedJSON" => Self::MalformedJson,
            "InternalError" => Self::InternalError,
            "ServiceUnavailable" => Self::ServiceUnavailable,
            _ => return Err(()),
        };
        Ok(code)
    }
}

/// An error as the Tigris endpoint reports it
#[derive(Debug, Error)]
#[error("{}: {}", .code.as_str(), .message)]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
    /// Bucket the error refers to, if any
    pub resource: Option<String>,
    pub request_id: Option<String>,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
            request_id: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.code.http_status()
    }

    /// `<Error>` document, as the S3-compatible API answers
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Error>"#);
        push_element(&mut xml, "Code", self.code.as_str());
        push_element(&mut xml, "Message", &self.message);
        if let Some(resource) = &self.resource {
            push_element(&mut xml, "BucketName", resource);
        }
        if let Some(request_id) = &self.request_id {
            push_element(&mut xml, "RequestId", request_id);
        }
        xml.push_str("</Error>");
        xml
    }

    /// `{"Code", "Message"}` document, as the bucket API answers
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "Code": self.code.as_str(),
            "Message": self.message,
        })
        .to_string()
    }
}

fn push_element(xml: &mut String, name: &str, text: &str) {
    xml.push('<');
    xml.push_str(name);
    xml.push('>');
    for c in text.chars() {
        match c {
            '&' => xml.push_str("&amp;"),
            '<' => xml.push_str("&lt;"),
            '>' => xml.push_str("&gt;"),
            _ => xml.push(c),
        }
    }
    xml.push_str("</");
    xml.push_str(name);
    xml.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_xml_format() {
        let error = ServiceError::new(ErrorCode::NoSuchBucket, "no such bucket")
            .with_resource("my-bucket")
            .with_request_id("test-request-id");

        let xml = error.to_xml();
        assert!(xml.contains("<Code>NoSuchBucket</Code>"));
        assert!(xml.contains("<BucketName>my-bucket</BucketName>"));
        assert!(xml.contains("<RequestId>test-request-id</RequestId>"));
        assert_eq!(error.status(), 404);
    }

    #[test]
    fn test_error_xml_escapes_text() {
        let xml = ServiceError::new(ErrorCode::InvalidArgument, "a < b & c").to_xml();
        assert!(xml.contains("<Message>a &lt; b &amp; c</Message>"));
        assert!(!xml.contains("RequestId"));
    }

    #[test]
    fn test_error_json_format() {
        let error = ServiceError::new(ErrorCode::InvalidSignature, "signature mismatch");

        let json: serde_json::Value = serde_json::from_str(&error.to_json()).unwrap();
        assert_eq!(json["Code"], "SignatureDoesNotMatch");
        assert_eq!(json["Message"], "signature mismatch");
    }

    #[test]
    fn test_error_code_round_trips_through_wire_name() {
        for code in [
            ErrorCode::InvalidSignature,
            ErrorCode::BucketAlreadyOwnedByYou,
            ErrorCode::MalformedJson,
        ] {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
        }
        assert!("SomethingElse".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn test_display_uses_wire_code() {
        let error = ServiceError::new(ErrorCode::NoSuchBucket, "gone");
        assert_eq!(error.to_string(), "NoSuchBucket: gone");
    }
}
