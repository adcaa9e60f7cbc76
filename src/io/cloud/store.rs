//! Object storage capability consumed by the byte-stream adapter.
//!
//! The real client (credentials, endpoint and region resolution, request
//! signing) lives outside this crate; anything implementing [`ObjectStore`]
//! can back `scheme://bucket/key` locators.

use std::error::Error;
use std::fmt;

/// Error raised by an [`ObjectStore`] implementation.
#[derive(Debug, Clone)]
pub struct StoreError {
    pub message: String,
    pub kind: StoreErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreErrorKind {
    Authentication,
    Authorization,
    NotFound,
    InvalidInput,
    Network,
    Timeout,
    ServiceUnavailable,
    Other,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for StoreError {}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata for an object in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
}

/// Blocking object storage operations.
pub trait ObjectStore: Send + Sync {
    /// Upload an object, replacing any existing one. `acl` is a canned access
    /// policy passed through to the provider unchanged.
    ///
    /// # Errors
    /// Returns an error if the bucket doesn't exist, permissions are not enough, or the upload fails
    fn put_object(&self, bucket: &str, key: &str, data: &[u8], acl: Option<&str>) -> StoreResult<()>;

    /// Download an object.
    ///
    /// # Errors
    /// Returns an error if the object doesn't exist, permissions are not enough, or the download fails
    fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// List objects whose key starts with `prefix`, sorted by key.
    ///
    /// # Errors
    /// Returns an error if the bucket doesn't exist, permissions are not enough, or the listing fails
    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> StoreResult<Vec<ObjectMetadata>>;

    /// Check if an object exists
    ///
    /// # Errors
    /// Returns an error if permissions are not enough or the check fails
    fn object_exists(&self, bucket: &str, key: &str) -> StoreResult<bool>;
}
