//! Bucket model: the update changeset, the wire bodies and the metadata
//! read model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `Update` value the service returns when the change was applied
pub const UPDATE_SUCCESS: &str = "success";

/// `Update` value the service returns when nothing had to change
pub const UPDATE_NOT_MODIFIED: &str = "not modified";

/// Default region of a shadow bucket
pub const DEFAULT_SHADOW_REGION: &str = "us-east-1";

/// Default endpoint of a shadow bucket
pub const DEFAULT_SHADOW_ENDPOINT: &str = "https://s3.us-east-1.amazonaws.com";

/// Predefined access-control preset of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CannedAcl {
    #[default]
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "public-read")]
    PublicRead,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
        }
    }

    pub fn values() -> [CannedAcl; 2] {
        [Self::Private, Self::PublicRead]
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CannedAcl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            other => Err(format!("unknown canned ACL: {other}")),
        }
    }
}

/// A change to one optional bucket attribute.
///
/// `Unchanged` leaves the attribute out of the request entirely, `Clear`
/// resets it to the service default and `Set` replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Unchanged
    }
}

impl<T> Field<T> {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Resolve the field into the value to transmit, using `cleared` for
    /// `Clear`. `None` means the attribute is not sent.
    pub fn resolve(&self, cleared: impl FnOnce() -> T) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Self::Unchanged => None,
            Self::Clear => Some(cleared()),
            Self::Set(value) => Some(value.clone()),
        }
    }
}

/// Custom website domain of a bucket
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteConfig {
    #[serde(default)]
    pub domain_name: String,
}

impl WebsiteConfig {
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
        }
    }
}

/// Remote bucket used as a replication / write-through target
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShadowConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub write_through: bool,
}

impl ShadowConfig {
    /// Shadow target with the default region, endpoint and write-through on
    pub fn new(
        name: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: DEFAULT_SHADOW_REGION.to_owned(),
            name: name.into(),
            endpoint: DEFAULT_SHADOW_ENDPOINT.to_owned(),
            write_through: true,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_write_through(mut self, write_through: bool) -> Self {
        self.write_through = write_through;
        self
    }

    /// Name of the first required field that is empty
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("shadow_bucket.name")
        } else if self.access_key.is_empty() {
            Some("shadow_bucket.access_key")
        } else if self.secret_key.is_empty() {
            Some("shadow_bucket.secret_key")
        } else {
            None
        }
    }
}

impl fmt::Debug for ShadowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowConfig")
            .field("name", &self.name)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("write_through", &self.write_through)
            .finish()
    }
}

/// JSON body of a bucket PATCH. Attributes that are `None` are left out of
/// the document, never sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketUpdateBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<WebsiteConfig>,
    #[serde(rename = "shadow_bucket", default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowConfig>,
}

/// JSON answer to a bucket PATCH
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketUpdateResponse {
    #[serde(rename = "Update", default)]
    pub update: String,
    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "Code", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl BucketUpdateResponse {
    pub fn success() -> Self {
        Self {
            update: UPDATE_SUCCESS.to_owned(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.update == UPDATE_SUCCESS || self.update == UPDATE_NOT_MODIFIED
    }
}

/// The set of attribute changes one UpdateBucket call carries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BucketUpdateInput {
    pub bucket: String,
    pub acl: Field<CannedAcl>,
    pub public_list_objects: Field<bool>,
    pub website: Field<WebsiteConfig>,
    pub shadow: Field<ShadowConfig>,
}

impl BucketUpdateInput {
    /// A changeset for `bucket` with nothing changed yet
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub fn acl(mut self, acl: CannedAcl) -> Self {
        self.acl = Field::Set(acl);
        self
    }

    pub fn clear_acl(mut self) -> Self {
        self.acl = Field::Clear;
        self
    }

    pub fn public_list_objects(mut self, enabled: bool) -> Self {
        self.public_list_objects = Field::Set(enabled);
        self
    }

    pub fn clear_public_list_objects(mut self) -> Self {
        self.public_list_objects = Field::Clear;
        self
    }

    pub fn website(mut self, domain_name: impl Into<String>) -> Self {
        self.website = Field::Set(WebsiteConfig::new(domain_name));
        self
    }

    pub fn clear_website(mut self) -> Self {
        self.website = Field::Clear;
        self
    }

    pub fn shadow(mut self, shadow: ShadowConfig) -> Self {
        self.shadow = Field::Set(shadow);
        self
    }

    pub fn clear_shadow(mut self) -> Self {
        self.shadow = Field::Clear;
        self
    }

    /// Minimal changeset turning `current` into `desired`
    pub fn from_diff(
        bucket: impl Into<String>,
        current: &BucketAttributes,
        desired: &BucketAttributes,
    ) -> Self {
        let mut input = Self::new(bucket);

        if current.acl != desired.acl {
            input.acl = Field::Set(desired.acl);
        }
        if current.public_list_objects != desired.public_list_objects {
            input.public_list_objects = Field::Set(desired.public_list_objects);
        }
        input.website = diff_optional(&current.website, &desired.website);
        input.shadow = diff_optional(&current.shadow, &desired.shadow);

        input
    }

    pub fn has_changes(&self) -> bool {
        self.acl.is_changed()
            || self.public_list_objects.is_changed()
            || self.website.is_changed()
            || self.shadow.is_changed()
    }

    /// Value of the `X-Amz-Acl` header, if the ACL is part of this change
    pub fn acl_header(&self) -> Option<CannedAcl> {
        self.acl.resolve(CannedAcl::default)
    }

    /// Value of the public-listing header, if listing is part of this change
    pub fn public_list_objects_header(&self) -> Option<bool> {
        self.public_list_objects.resolve(|| true)
    }

    /// Body attributes of this change
    pub fn body(&self) -> BucketUpdateBody {
        BucketUpdateBody {
            website: self.website.resolve(WebsiteConfig::default),
            shadow: self.shadow.resolve(ShadowConfig::default),
        }
    }
}

fn diff_optional<T: Clone + PartialEq>(current: &Option<T>, desired: &Option<T>) -> Field<T> {
    match (current, desired) {
        (current, Some(desired)) if current.as_ref() != Some(desired) => {
            Field::Set(desired.clone())
        }
        (Some(_), None) => Field::Clear,
        _ => Field::Unchanged,
    }
}

/// Access settings nested in the bucket metadata, flags as strings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketMd {
    #[serde(rename = "X-Amz-Acl", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    #[serde(
        rename = "X-Amz-Acl-Public-List-Objects-Enabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_list_objects: Option<String>,
}

/// Bucket state as reported by `GET /{bucket}?metadata=`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cache_control: String,
    #[serde(default)]
    pub object_regions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md: Option<BucketMd>,
    #[serde(rename = "shadow_bucket", default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<WebsiteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_created_at: Option<DateTime<Utc>>,
}

impl BucketMetadata {
    /// The bucket ACL, `private` when the service reports none
    pub fn canned_acl(&self) -> CannedAcl {
        self.md
            .as_ref()
            .and_then(|md| md.acl.as_deref())
            .and_then(|acl| acl.parse().ok())
            .unwrap_or_default()
    }

    /// Whether public object listing is on, `true` when the service
    /// reports nothing
    pub fn public_list_objects(&self) -> bool {
        self.md
            .as_ref()
            .and_then(|md| md.public_list_objects.as_deref())
            .and_then(|flag| flag.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or(true)
    }

    /// Website settings, if a domain is configured
    pub fn website(&self) -> Option<&WebsiteConfig> {
        self.website.as_ref().filter(|w| !w.domain_name.is_empty())
    }

    /// Shadow settings, if a shadow bucket is configured
    pub fn shadow(&self) -> Option<&ShadowConfig> {
        self.shadow.as_ref().filter(|s| !s.name.is_empty())
    }

    /// Reconcile the reported state into concrete attribute values
    pub fn attributes(&self) -> BucketAttributes {
        BucketAttributes {
            acl: self.canned_acl(),
            public_list_objects: self.public_list_objects(),
            website: self.website().cloned(),
            shadow: self.shadow().cloned(),
        }
    }
}

/// Concrete configurable state of a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAttributes {
    pub acl: CannedAcl,
    pub public_list_objects: bool,
    pub website: Option<WebsiteConfig>,
    pub shadow: Option<ShadowConfig>,
}

impl Default for BucketAttributes {
    fn default() -> Self {
        Self {
            acl: CannedAcl::Private,
            public_list_objects: true,
            website: None,
            shadow: None,
        }
    }
}
