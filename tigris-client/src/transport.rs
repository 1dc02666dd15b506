//! HTTP transport seam for the bucket API

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use thiserror::Error;
use tigris_core::request_id::REQUEST_ID_HEADER;
use url::Url;

use crate::error::BoxError;

/// Errors from a single HTTP exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange failed after the connection was made.
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),

    /// Connecting failed or the exchange timed out.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// The request could not be built; sending it again would not help.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] BoxError),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::InvalidRequest(Box::new(e))
        } else if e.is_connect() || e.is_timeout() {
            Self::Connection(Box::new(e))
        } else {
            Self::Request(e)
        }
    }
}

/// A request with its signature applied, sent exactly as it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl SignedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            request_id: None,
            body: body.into(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Sends one signed request and reads the whole response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: SignedRequest) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: SignedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await?;
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            request_id,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_range() {
        assert!(RawResponse::new(500, "").is_server_error());
        assert!(RawResponse::new(503, "").is_server_error());
        assert!(!RawResponse::new(404, "").is_server_error());
        assert!(!RawResponse::new(200, "").is_server_error());
    }

    #[test]
    fn test_retryable_transport_errors() {
        assert!(TransportError::Connection("reset".into()).is_retryable());
        assert!(!TransportError::InvalidRequest("bad header".into()).is_retryable());
    }

    fn request_to(url: &str, headers: &[(&str, &str)]) -> SignedRequest {
        SignedRequest {
            method: Method::GET,
            url: Url::parse(url).unwrap(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .send(request_to(&format!("http://{addr}/bucket"), &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Connection(_)), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_invalid() {
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .send(request_to("http://127.0.0.1:9/bucket", &[("bad header", "x")]))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::InvalidRequest(_)), "{err:?}");
        assert!(!err.is_retryable());
    }
}
