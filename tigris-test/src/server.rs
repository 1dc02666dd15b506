//! In-process mock of the Tigris bucket endpoints

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tigris_auth::{verify_signature, SigV4Error, VerifiableRequest};
use tigris_core::types::UPDATE_NOT_MODIFIED;
use tigris_core::{
    headers, BucketMd, BucketMetadata, BucketUpdateBody, BucketUpdateResponse, ErrorCode,
    RequestId, ServiceError,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub const TEST_ACCESS_KEY_ID: &str = "tid_mock_access";
pub const TEST_SECRET_ACCESS_KEY: &str = "tsec_mock_secret";

/// A request as the mock received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct StoredBucket {
    metadata: BucketMetadata,
    /// Created by someone other than the test credentials
    foreign: bool,
}

struct MockState {
    access_key_id: String,
    secret_access_key: String,
    buckets: DashMap<String, StoredBucket>,
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<VecDeque<StatusCode>>,
}

/// A running mock server, stopped on drop
pub struct MockTigris {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockTigris {
    /// Start on a free local port, accepting [`TEST_ACCESS_KEY_ID`] /
    /// [`TEST_SECRET_ACCESS_KEY`]
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with_credentials(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY).await
    }

    pub async fn start_with_credentials(
        access_key_id: &str,
        secret_access_key: &str,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            buckets: DashMap::new(),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        });

        let router = Router::new()
            .route("/:bucket", any(handle_bucket))
            // Path-style S3 clients address buckets as `/{bucket}/`
            .route("/:bucket/", any(handle_bucket))
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });

        info!(%addr, "mock Tigris listening");
        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn access_key_id(&self) -> &str {
        &self.state.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.state.secret_access_key
    }

    /// Answer the next `count` bucket API calls (PATCH and metadata GET)
    /// with `status`
    pub fn fail_next(&self, count: usize, status: u16) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.state
            .failures
            .lock()
            .extend(std::iter::repeat(status).take(count));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Recorded requests with the given method, e.g. `"PATCH"`
    pub fn requests_with(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.as_str() == method)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.requests.lock().clear();
    }

    pub fn bucket(&self, name: &str) -> Option<BucketMetadata> {
        self.state.buckets.get(name).map(|b| b.metadata.clone())
    }

    /// Seed a bucket owned by the test credentials
    pub fn insert_bucket(&self, metadata: BucketMetadata) {
        self.state.buckets.insert(
            metadata.name.clone(),
            StoredBucket {
                metadata,
                foreign: false,
            },
        );
    }

    /// Seed a bucket owned by another account
    pub fn insert_foreign_bucket(&self, name: &str) {
        self.state.buckets.insert(
            name.to_string(),
            StoredBucket {
                metadata: new_metadata(name),
                foreign: true,
            },
        );
    }
}

impl Drop for MockTigris {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn new_metadata(name: &str) -> BucketMetadata {
    let now = Utc::now();
    BucketMetadata {
        name: name.to_string(),
        md: Some(BucketMd::default()),
        created_at: Some(now),
        initial_created_at: Some(now),
        ..BucketMetadata::default()
    }
}

/// Handle bucket-level operations
async fn handle_bucket(
    State(state): State<Arc<MockState>>,
    Path(bucket): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        headers: headers.clone(),
        body: body.clone(),
    });

    let ids = RequestId::generate();
    let request_id = ids.id.clone();
    let mut response = match method {
        Method::PUT => create_bucket(&state, &bucket, &request_id),
        Method::HEAD => head_bucket(&state, &bucket),
        Method::DELETE => delete_bucket(&state, &bucket, &request_id),
        Method::PATCH => bucket_api(&state, &method, &uri, &headers, &body, &request_id)
            .unwrap_or_else(|| update_bucket(&state, &bucket, &headers, &body, &request_id)),
        Method::GET if is_metadata_query(&uri) => {
            bucket_api(&state, &method, &uri, &headers, &body, &request_id)
                .unwrap_or_else(|| get_metadata(&state, &bucket, &request_id))
        }
        _ => xml_error(
            StatusCode::METHOD_NOT_ALLOWED,
            &ServiceError::new(ErrorCode::InvalidArgument, "method not supported by mock")
                .with_request_id(&request_id),
        ),
    };

    for (name, value) in ids.headers() {
        if let Ok(value) = HeaderValue::from_str(value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

fn is_metadata_query(uri: &Uri) -> bool {
    uri.query()
        .is_some_and(|q| q.split('&').any(|p| p == "metadata" || p.starts_with("metadata=")))
}

/// Injected failures and authentication shared by the signed endpoints.
/// `None` lets the call through.
fn bucket_api(
    state: &MockState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
    request_id: &str,
) -> Option<Response> {
    if let Some(status) = state.failures.lock().pop_front() {
        debug!(%status, "injected failure");
        let code = if status == StatusCode::SERVICE_UNAVAILABLE {
            ErrorCode::ServiceUnavailable
        } else {
            ErrorCode::InternalError
        };
        return Some(json_error(
            status,
            &ServiceError::new(code, "injected failure").with_request_id(request_id),
        ));
    }

    authenticate(state, method, uri, headers, body)
        .err()
        .map(|e| json_error(status_of(e.code), &e.with_request_id(request_id)))
}

fn authenticate(
    state: &MockState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), ServiceError> {
    let pairs: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = VerifiableRequest {
        method: method.as_str(),
        path: uri.path(),
        query: uri.query().unwrap_or(""),
        headers: &pairs,
        payload: body,
    };

    let auth = verify_signature(&request, &state.secret_access_key, Utc::now()).map_err(|e| {
        debug!(error = %e, "signature rejected");
        let code = match e {
            SigV4Error::SignatureMismatch | SigV4Error::PayloadHashMismatch => {
                ErrorCode::InvalidSignature
            }
            SigV4Error::RequestTimeTooSkewed => ErrorCode::RequestTimeTooSkewed,
            _ => ErrorCode::AccessDenied,
        };
        ServiceError::new(code, e.to_string())
    })?;

    if auth.access_key != state.access_key_id {
        return Err(ServiceError::new(
            ErrorCode::InvalidAccessKeyId,
            "The access key ID does not exist in our records.",
        ));
    }
    Ok(())
}

fn create_bucket(state: &MockState, bucket: &str, request_id: &str) -> Response {
    if let Some(existing) = state.buckets.get(bucket) {
        let (code, message) = if existing.foreign {
            (
                ErrorCode::BucketAlreadyExists,
                "The requested bucket name is not available.",
            )
        } else {
            (
                ErrorCode::BucketAlreadyOwnedByYou,
                "Your previous request to create the named bucket succeeded and you already own it.",
            )
        };
        return xml_error(
            StatusCode::CONFLICT,
            &ServiceError::new(code, message)
                .with_resource(bucket)
                .with_request_id(request_id),
        );
    }

    state.buckets.insert(
        bucket.to_string(),
        StoredBucket {
            metadata: new_metadata(bucket),
            foreign: false,
        },
    );
    info!(bucket = %bucket, "bucket created");
    (StatusCode::OK, [(header::LOCATION, format!("/{bucket}"))]).into_response()
}

fn head_bucket(state: &MockState, bucket: &str) -> Response {
    if state.buckets.contains_key(bucket) {
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn delete_bucket(state: &MockState, bucket: &str, request_id: &str) -> Response {
    if state.buckets.remove(bucket).is_some() {
        info!(bucket = %bucket, "bucket deleted");
        StatusCode::NO_CONTENT.into_response()
    } else {
        xml_error(
            StatusCode::NOT_FOUND,
            &ServiceError::new(ErrorCode::NoSuchBucket, "The specified bucket does not exist")
                .with_resource(bucket)
                .with_request_id(request_id),
        )
    }
}

fn update_bucket(
    state: &MockState,
    bucket: &str,
    headers: &HeaderMap,
    body: &Bytes,
    request_id: &str,
) -> Response {
    let update: BucketUpdateBody = match serde_json::from_slice(body) {
        Ok(update) => update,
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &ServiceError::new(ErrorCode::MalformedJson, e.to_string())
                    .with_request_id(request_id),
            )
        }
    };

    let Some(mut stored) = state.buckets.get_mut(bucket) else {
        return json_error(
            StatusCode::NOT_FOUND,
            &ServiceError::new(ErrorCode::NoSuchBucket, "The specified bucket does not exist")
                .with_resource(bucket)
                .with_request_id(request_id),
        );
    };

    let metadata = &mut stored.metadata;
    let before = metadata.clone();
    let md = metadata.md.get_or_insert_with(BucketMd::default);
    if let Some(acl) = header_str(headers, headers::AMZ_ACL) {
        md.acl = Some(acl.to_string());
    }
    if let Some(flag) = header_str(headers, headers::AMZ_PUBLIC_LIST_OBJECTS) {
        md.public_list_objects = Some(flag.to_string());
    }
    if let Some(website) = update.website {
        metadata.website = Some(website).filter(|w| !w.domain_name.is_empty());
    }
    if let Some(shadow) = update.shadow {
        metadata.shadow = Some(shadow).filter(|s| !s.name.is_empty());
    }

    let answer = if *metadata == before {
        BucketUpdateResponse {
            update: UPDATE_NOT_MODIFIED.to_string(),
            ..BucketUpdateResponse::default()
        }
    } else {
        BucketUpdateResponse::success()
    };
    info!(bucket = %bucket, update = %answer.update, "bucket updated");
    json_response(StatusCode::OK, serde_json::to_string(&answer).unwrap_or_default())
}

fn get_metadata(state: &MockState, bucket: &str, request_id: &str) -> Response {
    match state.buckets.get(bucket) {
        Some(stored) => json_response(
            StatusCode::OK,
            serde_json::to_string(&stored.metadata).unwrap_or_default(),
        ),
        None => json_error(
            StatusCode::NOT_FOUND,
            &ServiceError::new(ErrorCode::NoSuchBucket, "The specified bucket does not exist")
                .with_resource(bucket)
                .with_request_id(request_id),
        ),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn status_of(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn json_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, headers::APPLICATION_JSON)],
        Body::from(body),
    )
        .into_response()
}

fn json_error(status: StatusCode, error: &ServiceError) -> Response {
    json_response(status, error.to_json())
}

fn xml_error(status: StatusCode, error: &ServiceError) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/xml")],
        Body::from(error.to_xml()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tigris_core::request_id::REQUEST_ID_HEADER;

    #[tokio::test]
    async fn test_s3_bucket_lifecycle() {
        let server = MockTigris::start().await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/life-bucket", server.endpoint());

        let created = client.put(&url).send().await.unwrap();
        assert_eq!(created.status(), 200);
        assert!(created.headers().contains_key(REQUEST_ID_HEADER));

        let again = client.put(&url).send().await.unwrap();
        assert_eq!(again.status(), 409);
        assert!(again.text().await.unwrap().contains("BucketAlreadyOwnedByYou"));

        assert_eq!(client.head(&url).send().await.unwrap().status(), 200);
        assert_eq!(client.delete(&url).send().await.unwrap().status(), 204);
        assert_eq!(client.head(&url).send().await.unwrap().status(), 404);

        let missing = client.delete(&url).send().await.unwrap();
        assert_eq!(missing.status(), 404);
        assert!(missing.text().await.unwrap().contains("NoSuchBucket"));
    }

    #[tokio::test]
    async fn test_path_style_trailing_slash() {
        let server = MockTigris::start().await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/slash-bucket/", server.endpoint());

        assert_eq!(client.put(&url).send().await.unwrap().status(), 200);
        assert!(server.bucket("slash-bucket").is_some());
        assert_eq!(client.head(&url).send().await.unwrap().status(), 200);
        assert_eq!(client.delete(&url).send().await.unwrap().status(), 204);
        assert_eq!(client.head(&url).send().await.unwrap().status(), 404);
        assert_eq!(server.requests().last().unwrap().path, "/slash-bucket/");
    }

    #[tokio::test]
    async fn test_foreign_bucket_conflict() {
        let server = MockTigris::start().await.unwrap();
        server.insert_foreign_bucket("someone-elses");

        let response = reqwest::Client::new()
            .put(format!("{}/someone-elses", server.endpoint()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 409);
        assert!(response.text().await.unwrap().contains("BucketAlreadyExists"));
    }

    #[tokio::test]
    async fn test_unsigned_bucket_api_call_is_rejected() {
        let server = MockTigris::start().await.unwrap();
        server.insert_bucket(new_metadata("guarded"));

        let response = reqwest::Client::new()
            .patch(format!("{}/guarded", server.endpoint()))
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 403);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["Code"], "AccessDenied");
    }

    #[tokio::test]
    async fn test_injected_failures_come_first() {
        let server = MockTigris::start().await.unwrap();
        server.fail_next(2, 503);
        let client = reqwest::Client::new();
        let url = format!("{}/any-bucket?metadata=", server.endpoint());

        assert_eq!(client.get(&url).send().await.unwrap().status(), 503);
        assert_eq!(client.get(&url).send().await.unwrap().status(), 503);
        assert_eq!(client.get(&url).send().await.unwrap().status(), 403);
        assert_eq!(server.requests().len(), 3);
    }

    #[test]
    fn test_metadata_query_detection() {
        assert!(is_metadata_query(&"/b?metadata=".parse().unwrap()));
        assert!(is_metadata_query(&"/b?x=1&metadata".parse().unwrap()));
        assert!(!is_metadata_query(&"/b?metadatax=1".parse().unwrap()));
        assert!(!is_metadata_query(&"/b".parse().unwrap()));
    }
}
