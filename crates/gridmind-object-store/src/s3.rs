// gridmind-object-store/src/s3.rs
// ============================================================================
// Module: S3 Object Store
// Description: S3-compatible ObjectStore backend for model artifacts.
// Purpose: Persist artifacts in durable object storage with strict validation.
// Dependencies: gridmind-core, aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! This backend wraps `aws-sdk-s3` behind the synchronous gateway trait.
//! The client owns a dedicated runtime so callers on either sync or async
//! stacks can use it; when invoked from inside a multi-thread runtime the
//! call is serviced in place. Custom endpoints and path-style addressing
//! support MinIO deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use gridmind_config::ObjectStoreConfig;
use gridmind_core::ObjectListing;
use gridmind_core::ObjectStore;
use gridmind_core::ObjectStoreError;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

use crate::keys::validate_key;
use crate::keys::validate_prefix;

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an object-store future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, ObjectStoreError>
where
    F: Future<Output = Result<T, ObjectStoreError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| ObjectStoreError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx.recv().unwrap_or_else(|_| {
            Err(ObjectStoreError::Io("object store thread join failed".to_string()))
        });
    }

    runtime.block_on(future)
}

// ============================================================================
// SECTION: S3 Backend
// ============================================================================

/// S3-backed object store.
pub struct S3ObjectStore {
    /// Underlying S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Prefix applied to all keys.
    prefix: String,
    /// Dedicated runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3ObjectStore {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3ObjectStore {
    /// Builds an S3-backed store from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when configuration is invalid or the
    /// runtime or client cannot be created.
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        config.validate().map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
        let prefix = normalize_prefix(config.prefix.as_deref().unwrap_or(""))?;
        let runtime = Runtime::new().map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let region = config.region.clone();
        let endpoint = config.endpoint.clone();
        let shared_config = block_on_with_runtime(&runtime, async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Applies the configured prefix to a key.
    fn prefixed(&self, key: &str) -> String {
        if self.prefix.is_empty() { key.to_string() } else { format!("{}{key}", self.prefix) }
    }

    /// Returns the runtime or an error if shut down.
    fn runtime(&self) -> Result<&Runtime, ObjectStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| ObjectStoreError::Io("object store runtime closed".to_string()))
    }
}

impl ObjectStore for S3ObjectStore {
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let bucket = self.bucket.clone();
        let key = self.prefixed(key);
        let client = self.client.clone();
        let content_type = content_type.map(str::to_string);
        block_on_with_runtime(self.runtime()?, async move {
            let body = ByteStream::from(bytes);
            let mut request = client.put_object().bucket(bucket).key(key).body(body);
            if let Some(content_type) = content_type {
                request = request.content_type(content_type);
            }
            request.send().await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        validate_key(key)?;
        let bucket = self.bucket.clone();
        let logical_key = key.to_string();
        let key = self.prefixed(key);
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let output = match client.get_object().bucket(bucket).key(key).send().await {
                Ok(output) => output,
                Err(err) => {
                    let service_error = err.into_service_error();
                    if service_error.is_no_such_key() {
                        return Err(ObjectStoreError::NotFound(logical_key));
                    }
                    return Err(ObjectStoreError::Backend(service_error.to_string()));
                }
            };
            let collected = output
                .body
                .collect()
                .await
                .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
            Ok(collected.into_bytes().to_vec())
        })
    }

    fn list(
        &self,
        prefix: &str,
        delimiter: Option<char>,
    ) -> Result<ObjectListing, ObjectStoreError> {
        validate_prefix(prefix)?;
        let bucket = self.bucket.clone();
        let full_prefix = self.prefixed(prefix);
        let client = self.client.clone();
        let configured_prefix = self.prefix.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let mut listing = ObjectListing::default();
            let mut continuation: Option<String> = None;
            loop {
                let mut request =
                    client.list_objects_v2().bucket(bucket.clone()).prefix(full_prefix.clone());
                if let Some(delimiter) = delimiter {
                    request = request.delimiter(delimiter.to_string());
                }
                if let Some(token) = continuation.take() {
                    request = request.continuation_token(token);
                }
                let output = request
                    .send()
                    .await
                    .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
                for object in output.contents() {
                    if let Some(key) = object.key() {
                        listing.keys.push(strip_prefix(&configured_prefix, key));
                    }
                }
                for grouped in output.common_prefixes() {
                    if let Some(prefix) = grouped.prefix() {
                        listing.common_prefixes.push(strip_prefix(&configured_prefix, prefix));
                    }
                }
                match output.next_continuation_token() {
                    Some(token) if output.is_truncated() == Some(true) => {
                        continuation = Some(token.to_string());
                    }
                    _ => break,
                }
            }
            Ok(listing)
        })
    }

    fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError> {
        validate_key(src)?;
        validate_key(dst)?;
        let bucket = self.bucket.clone();
        let source = format!("{bucket}/{}", self.prefixed(src));
        let dst = self.prefixed(dst);
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            client
                .copy_object()
                .bucket(bucket)
                .copy_source(source)
                .key(dst)
                .send()
                .await
                .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            Ok(())
        })
    }

    fn delete_prefix(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let listing = self.list(prefix, None)?;
        let bucket = self.bucket.clone();
        let client = self.client.clone();
        let keys = listing.keys.clone();
        let full_keys: Vec<String> = keys.iter().map(|key| self.prefixed(key)).collect();
        block_on_with_runtime(self.runtime()?, async move {
            for key in full_keys {
                client
                    .delete_object()
                    .bucket(bucket.clone())
                    .key(key)
                    .send()
                    .await
                    .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            }
            Ok(())
        })?;
        Ok(keys)
    }

    fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        let bucket = self.bucket.clone();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            if client.head_bucket().bucket(bucket.clone()).send().await.is_ok() {
                return Ok(());
            }
            match client.create_bucket().bucket(bucket).send().await {
                Ok(_) => Ok(()),
                Err(err) => {
                    let service_error = err.into_service_error();
                    if service_error.is_bucket_already_owned_by_you()
                        || service_error.is_bucket_already_exists()
                    {
                        Ok(())
                    } else {
                        Err(ObjectStoreError::Backend(service_error.to_string()))
                    }
                }
            }
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Normalizes the configured root prefix.
fn normalize_prefix(raw: &str) -> Result<String, ObjectStoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    validate_prefix(trimmed)?;
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    Ok(format!("{normalized}/"))
}

/// Strips the configured prefix from a backend-reported key.
fn strip_prefix(prefix: &str, key: &str) -> String {
    key.strip_prefix(prefix).unwrap_or(key).to_string()
}
