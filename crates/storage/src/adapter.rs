//! High-level storage adapter: key generation, size caps, signed URLs.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use mediaplan_core::config::StorageConfig;
use mediaplan_core::{HubError, HubResult};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::mime;
use crate::object_store::{ObjectStore, StoredObject};

/// Result of storing an uploaded file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub storage_key: String,
    pub size: usize,
    pub content_type: String,
}

struct SignedToken {
    storage_key: String,
    expires_at: DateTime<Utc>,
    /// Download URLs force an attachment disposition.
    download: bool,
}

/// Wraps an [`ObjectStore`] with upload validation, collision-resistant key
/// generation, and signed URL issuance.
pub struct FileStorage {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
    tokens: DashMap<String, SignedToken>,
}

impl FileStorage {
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        info!(
            bucket = %config.bucket,
            max_file_size = config.max_file_size,
            "File storage adapter initialized"
        );
        Self {
            store,
            config,
            tokens: DashMap::new(),
        }
    }

    /// Storage key: UTC timestamp plus a random hex suffix, preserving the
    /// original extension. Collisions would need the same millisecond and
    /// the same 8 random bytes.
    pub fn storage_key(&self, file_name: &str) -> String {
        let mut rng = rand::thread_rng();
        let suffix: [u8; 8] = rng.gen();
        match mime::extension(file_name) {
            Some(ext) => format!(
                "{}/{}-{}.{}",
                self.config.bucket,
                Utc::now().timestamp_millis(),
                hex::encode(suffix),
                ext
            ),
            None => format!(
                "{}/{}-{}",
                self.config.bucket,
                Utc::now().timestamp_millis(),
                hex::encode(suffix)
            ),
        }
    }

    /// Validate and store an uploaded file, returning its storage key.
    pub fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> HubResult<StoredFile> {
        if bytes.len() > self.config.max_file_size {
            return Err(HubError::PayloadTooLarge {
                actual: bytes.len(),
                limit: self.config.max_file_size,
            });
        }
        mime::validate_upload(file_name, content_type)?;

        let storage_key = self.storage_key(file_name);
        let size = bytes.len();
        self.store.put(&storage_key, bytes, content_type)?;
        metrics::counter!("storage.files_uploaded").increment(1);
        info!(storage_key = %storage_key, size, "Stored uploaded file");

        Ok(StoredFile {
            storage_key,
            size,
            content_type: content_type.to_string(),
        })
    }

    /// Fetch stored bytes by key.
    pub fn get(&self, storage_key: &str) -> HubResult<StoredObject> {
        self.store.get(storage_key)
    }

    pub fn delete(&self, storage_key: &str) -> bool {
        self.store.delete(storage_key)
    }

    /// Time-limited signed URL for viewing an object inline.
    pub fn signed_url(&self, storage_key: &str) -> HubResult<String> {
        self.issue(storage_key, self.config.signed_url_ttl_secs, false)
    }

    /// Time-limited signed URL that forces a download disposition.
    pub fn signed_download_url(&self, storage_key: &str) -> HubResult<String> {
        self.issue(storage_key, self.config.signed_download_ttl_secs, true)
    }

    fn issue(&self, storage_key: &str, ttl_secs: u64, download: bool) -> HubResult<String> {
        if !self.store.exists(storage_key) {
            return Err(HubError::Storage(format!(
                "object '{storage_key}' not found"
            )));
        }
        // Sweep dead tokens on every issue so the map tracks live URLs only.
        let now = Utc::now();
        self.tokens.retain(|_, t| t.expires_at > now);

        let mut rng = rand::thread_rng();
        let token_bytes: [u8; 16] = rng.gen();
        let token = hex::encode(token_bytes);
        let expires_at = Utc::now() + Duration::seconds(ttl_secs as i64);
        self.tokens.insert(
            token.clone(),
            SignedToken {
                storage_key: storage_key.to_string(),
                expires_at,
                download,
            },
        );
        Ok(format!(
            "/files/signed/{token}?expires={}",
            expires_at.timestamp()
        ))
    }

    /// Resolve a signed token back to its object. Expired or unknown tokens
    /// are rejected; expired tokens are evicted on touch.
    pub fn resolve_signed(&self, token: &str) -> HubResult<(StoredObject, bool)> {
        let (storage_key, download) = match self.tokens.get(token) {
            Some(entry) => {
                if entry.value().expires_at < Utc::now() {
                    drop(entry);
                    self.tokens.remove(token);
                    warn!(token, "Rejected expired signed URL token");
                    return Err(HubError::Forbidden("signed URL expired".into()));
                }
                (entry.value().storage_key.clone(), entry.value().download)
            }
            None => return Err(HubError::Forbidden("unknown signed URL token".into())),
        };
        Ok((self.store.get(&storage_key)?, download))
    }
}
