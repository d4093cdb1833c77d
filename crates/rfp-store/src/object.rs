//! Object store adapter: content-addressed by key, with a prefix
//! allowlist (`spec.md` §3, §9 "Object store").

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rfp_error::{ErrorCode, RfpError};
use rfp_glob::MatchDecision;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Longest a presigned GET URL may live.
pub const MAX_PRESIGN_GET: Duration = Duration::hours(24);
/// Longest a presigned PUT URL may live.
pub const MAX_PRESIGN_PUT: Duration = Duration::hours(1);

/// Metadata about a stored object, without its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type, if known.
    pub content_type: Option<String>,
}

/// Enforces the `rfp/`, `team/`, `contracting/`, `agent/` key-prefix
/// allowlist (or a caller-supplied set) ahead of every adapter call.
#[derive(Debug, Clone)]
pub struct KeyPrefixAllowlist {
    allowed: rfp_glob::IncludeExcludeGlobs,
}

/// Default key prefixes the object store accepts (`spec.md` §9).
pub const DEFAULT_PREFIXES: &[&str] = &["rfp/**", "team/**", "contracting/**", "agent/**"];

impl KeyPrefixAllowlist {
    /// Compile an allowlist from glob prefixes (e.g. `"rfp/**"`).
    pub fn new(prefixes: &[String]) -> Result<Self, RfpError> {
        let allowed = rfp_glob::IncludeExcludeGlobs::new(prefixes, &[])
            .map_err(|e| RfpError::new(ErrorCode::Internal, format!("invalid key prefix pattern: {e}")))?;
        Ok(Self { allowed })
    }

    /// The platform default prefix set.
    pub fn default_prefixes() -> Result<Self, RfpError> {
        Self::new(&DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    /// Check a key, returning [`ErrorCode::KeyNotAllowed`] if it is outside
    /// every allowed prefix.
    pub fn check(&self, key: &str) -> Result<(), RfpError> {
        match self.allowed.decide_str(key) {
            MatchDecision::Allowed => Ok(()),
            _ => Err(RfpError::new(ErrorCode::KeyNotAllowed, format!("key '{key}' is not on the allowlist"))
                .with_context("key", key)),
        }
    }
}

/// Async object store adapter.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write bytes at `key` with the given content type.
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), RfpError>;

    /// Read bytes at `key`, rejecting objects larger than `max_bytes`.
    async fn get_bytes(&self, key: &str, max_bytes: u64) -> Result<Vec<u8>, RfpError>;

    /// Read metadata without the object body.
    async fn head(&self, key: &str) -> Result<ObjectHead, RfpError>;

    /// Copy an object to a new key.
    async fn copy(&self, from: &str, to: &str) -> Result<(), RfpError>;

    /// Move (copy + delete) an object to a new key.
    async fn move_object(&self, from: &str, to: &str) -> Result<(), RfpError> {
        self.copy(from, to).await?;
        self.delete(from).await
    }

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), RfpError>;

    /// Produce a time-limited GET URL, capped at [`MAX_PRESIGN_GET`].
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, RfpError>;

    /// Produce a time-limited PUT URL, capped at [`MAX_PRESIGN_PUT`].
    async fn presign_put(&self, key: &str, content_type: &str, ttl: Duration) -> Result<String, RfpError>;
}

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory [`ObjectStore`] reference implementation, enforcing the key
/// prefix allowlist and presign TTL caps the same way a production
/// S3-backed adapter would.
pub struct InMemoryObjectStore {
    allowlist: KeyPrefixAllowlist,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    base_url: String,
}

impl InMemoryObjectStore {
    /// Construct a store enforcing the default key prefixes.
    pub fn new() -> Result<Self, RfpError> {
        Self::with_allowlist(KeyPrefixAllowlist::default_prefixes()?)
    }

    /// Construct a store enforcing a caller-supplied allowlist.
    pub fn with_allowlist(allowlist: KeyPrefixAllowlist) -> Result<Self, RfpError> {
        Ok(Self {
            allowlist,
            objects: Mutex::new(BTreeMap::new()),
            base_url: "https://objects.local".to_string(),
        })
    }

    /// Wrap in an `Arc` for sharing across tool handlers.
    pub fn shared() -> Result<Arc<Self>, RfpError> {
        Ok(Arc::new(Self::new()?))
    }
}

fn presign_url(base_url: &str, key: &str, expires_at: DateTime<Utc>) -> String {
    format!("{base_url}/{key}?expires={}", expires_at.timestamp())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), RfpError> {
        self.allowlist.check(key)?;
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_bytes(&self, key: &str, max_bytes: u64) -> Result<Vec<u8>, RfpError> {
        self.allowlist.check(key)?;
        let objects = self.objects.lock().await;
        let obj = objects
            .get(key)
            .ok_or_else(|| RfpError::new(ErrorCode::NotFound, format!("no object at key '{key}'")))?;
        if obj.bytes.len() as u64 > max_bytes {
            return Err(RfpError::new(
                ErrorCode::Internal,
                format!("object at '{key}' exceeds max_bytes ({} > {max_bytes})", obj.bytes.len()),
            ));
        }
        Ok(obj.bytes.clone())
    }

    async fn head(&self, key: &str) -> Result<ObjectHead, RfpError> {
        self.allowlist.check(key)?;
        let objects = self.objects.lock().await;
        let obj = objects
            .get(key)
            .ok_or_else(|| RfpError::new(ErrorCode::NotFound, format!("no object at key '{key}'")))?;
        Ok(ObjectHead {
            key: key.to_string(),
            size: obj.bytes.len() as u64,
            content_type: Some(obj.content_type.clone()),
        })
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), RfpError> {
        self.allowlist.check(from)?;
        self.allowlist.check(to)?;
        let mut objects = self.objects.lock().await;
        let source = objects
            .get(from)
            .ok_or_else(|| RfpError::new(ErrorCode::NotFound, format!("no object at key '{from}'")))?;
        let copied = StoredObject {
            bytes: source.bytes.clone(),
            content_type: source.content_type.clone(),
        };
        objects.insert(to.to_string(), copied);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RfpError> {
        self.allowlist.check(key)?;
        self.objects.lock().await.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, RfpError> {
        self.allowlist.check(key)?;
        if ttl > MAX_PRESIGN_GET {
            return Err(RfpError::new(ErrorCode::Internal, "presign_get ttl exceeds 24h cap"));
        }
        Ok(presign_url(&self.base_url, key, Utc::now() + ttl))
    }

    async fn presign_put(&self, key: &str, _content_type: &str, ttl: Duration) -> Result<String, RfpError> {
        self.allowlist.check(key)?;
        if ttl > MAX_PRESIGN_PUT {
            return Err(RfpError::new(ErrorCode::Internal, "presign_put ttl exceeds 1h cap"));
        }
        Ok(presign_url(&self.base_url, key, Utc::now() + ttl))
    }
}
