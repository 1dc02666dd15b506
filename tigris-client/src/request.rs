//! Request construction for the bucket API

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Method;
use tigris_auth::{payload_hash, SigV4Error, SignableRequest, SigningContext};
use tigris_core::{headers, validate_bucket_name, BucketUpdateInput, Field};
use url::Url;

use crate::error::TigrisError;
use crate::transport::SignedRequest;

/// An unsigned request with its body already materialized.
///
/// Cloning shares the body bytes, so every attempt built from the same
/// `ApiRequest` transmits an identical payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Headers keyed by lowercase name
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl ApiRequest {
    fn new(method: Method, url: Url) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(headers::CONTENT_TYPE.to_string(), headers::APPLICATION_JSON.to_string());
        headers.insert(headers::ACCEPT.to_string(), headers::APPLICATION_JSON.to_string());
        Self {
            method,
            url,
            headers,
            body: Bytes::new(),
        }
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Set the final body and the content hash that covers it
    fn body(mut self, body: Bytes) -> Self {
        self.headers
            .insert(headers::AMZ_CONTENT_SHA256.to_string(), payload_hash(&body));
        self.body = body;
        self
    }

    /// Sign a copy of this request as of `timestamp`
    pub fn sign(
        &self,
        signer: &SigningContext,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedRequest, SigV4Error> {
        let output = signer.sign(
            &SignableRequest {
                method: self.method.as_str(),
                url: &self.url,
                headers: &self.headers,
                payload: &self.body,
            },
            timestamp,
        )?;

        let mut headers = self.headers.clone();
        headers.extend(output.headers);

        Ok(SignedRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
            body: self.body.clone(),
        })
    }
}

/// Local checks an update input must pass before anything is sent
pub fn validate_input(input: &BucketUpdateInput) -> Result<(), TigrisError> {
    validate_bucket_name(&input.bucket)?;
    if let Field::Set(shadow) = &input.shadow {
        if let Some(field) = shadow.missing_field() {
            return Err(TigrisError::MissingField { field });
        }
    }
    Ok(())
}

/// Builds bucket API requests against one endpoint
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: Url,
}

impl RequestBuilder {
    pub fn new(endpoint: &str) -> Result<Self, TigrisError> {
        let endpoint = Url::parse(endpoint).map_err(|source| TigrisError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(TigrisError::Config(format!(
                "endpoint cannot carry a path: {endpoint}"
            )));
        }
        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `{endpoint}/{bucket}` with `query` appended in the given order
    pub fn bucket_url(&self, bucket: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(bucket);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// `PATCH /{bucket}` carrying only the attributes `input` changes.
    ///
    /// ACL and public listing travel as headers, website and shadow settings
    /// as JSON body fields. Unchanged attributes appear in neither.
    pub fn update_bucket(&self, input: &BucketUpdateInput) -> Result<ApiRequest, TigrisError> {
        validate_input(input)?;

        let body = serde_json::to_vec(&input.body()).map_err(TigrisError::Encode)?;
        let mut request = ApiRequest::new(Method::PATCH, self.bucket_url(&input.bucket, &[]));

        if let Some(acl) = input.acl_header() {
            request = request.header(headers::AMZ_ACL, acl.as_str());
        }
        if let Some(enabled) = input.public_list_objects_header() {
            request = request.header(headers::AMZ_PUBLIC_LIST_OBJECTS, enabled.to_string());
        }

        Ok(request.body(Bytes::from(body)))
    }

    /// `GET /{bucket}?metadata=`
    pub fn bucket_metadata(&self, bucket: &str) -> Result<ApiRequest, TigrisError> {
        validate_bucket_name(bucket)?;
        let url = self.bucket_url(bucket, &[("metadata", "")]);
        Ok(ApiRequest::new(Method::GET, url).body(Bytes::new()))
    }
}
