//! Test utilities for the Tigris client
//!
//! Provides an in-process stand-in for the Tigris endpoint:
//! - S3-compatible CreateBucket / HeadBucket / DeleteBucket
//! - the signed bucket API (`PATCH /{bucket}`, `GET /{bucket}?metadata=`)
//! - request recording and failure injection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tigris_test::MockTigris;
//!
//! # async fn run() -> std::io::Result<()> {
//! let server = MockTigris::start().await?;
//! println!("mock endpoint: {}", server.endpoint());
//!
//! // The next two bucket API calls answer 503
//! server.fail_next(2, 503);
//! # Ok(())
//! # }
//! ```

pub mod server;

pub use server::{MockTigris, RecordedRequest, TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY};

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tigris_client=debug,tigris_test=debug,tower_http=info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
