//! Bucket name validation
//!
//! Names must be usable as a DNS label: 3-63 characters of lowercase
//! letters, digits, hyphens and dots, no leading or trailing dot, no
//! consecutive dots and not shaped like an IPv4 address.

use thiserror::Error;

/// Minimum bucket name length.
pub const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum bucket name length.
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// A bucket name that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bucket name {name:?}: {reason}")]
pub struct InvalidBucketName {
    pub name: String,
    pub reason: &'static str,
}

impl InvalidBucketName {
    fn new(name: &str, reason: &'static str) -> Self {
        Self {
            name: name.to_owned(),
            reason,
        }
    }
}

/// Validate a bucket name before it is put on the wire.
///
/// # Examples
///
/// ```
/// use tigris_core::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-bucket").is_ok());
/// assert!(validate_bucket_name("My-Bucket").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), InvalidBucketName> {
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
        return Err(InvalidBucketName::new(
            name,
            "must be between 3 and 63 characters long",
        ));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(InvalidBucketName::new(
            name,
            "must only contain lowercase letters, numbers, hyphens and dots",
        ));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(InvalidBucketName::new(name, "must not start or end with a dot"));
    }

    if name.contains("..") {
        return Err(InvalidBucketName::new(name, "must not contain consecutive dots"));
    }

    if is_ip_shaped(name) {
        return Err(InvalidBucketName::new(
            name,
            "must not be formatted as an IP address",
        ));
    }

    Ok(())
}

/// Four dot-separated groups of one to three digits, whether or not the
/// octets are in range.
fn is_ip_shaped(name: &str) -> bool {
    let groups: Vec<&str> = name.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}
