//! # Name resolution collaborator.
//!
//! The content-addressed naming protocol lives outside this crate. The agent
//! only needs "resolve a published name to a versioned manifest" and
//! "download one file of that manifest".

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::FetchError;

/// One file of a published bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestFile {
    /// Path relative to the bundle root (`main.js`, `lib/util.js`).
    pub path: String,
    /// Content hash as published by the naming service.
    pub hash: String,
}

/// A resolved bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    /// Version identifier; changes whenever the bundle changes.
    pub version: String,
    pub files: Vec<ManifestFile>,
}

/// Knobs for a single resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Bypass any caching layer (set on retries).
    pub no_cache: bool,
}

/// Resolves published names and downloads bundle files.
#[async_trait]
pub trait NameResolver: Send + Sync + 'static {
    /// Resolves `name` to the manifest of its latest bundle.
    async fn resolve(&self, name: &str, opts: ResolveOptions) -> Result<Manifest, FetchError>;

    /// Downloads the bytes of one manifest file.
    async fn download(&self, file: &ManifestFile) -> Result<Vec<u8>, FetchError>;
}

#[derive(Default)]
struct Published {
    bundles: HashMap<String, Manifest>,
    blobs: HashMap<String, Vec<u8>>,
    failures: HashMap<String, Vec<String>>,
    resolves: HashMap<String, Vec<ResolveOptions>>,
}

/// In-process resolver serving bundles published with [`MemoryResolver::publish`].
///
/// Used for offline runs and tests. Failures can be queued per name; each
/// queued message fails one `resolve` call.
#[derive(Default)]
pub struct MemoryResolver {
    inner: Mutex<Published>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `files` (path, contents) as `version` under `name`.
    pub fn publish(&self, name: &str, version: &str, files: &[(&str, &str)]) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let mut manifest = Manifest {
            version: version.to_string(),
            files: Vec::with_capacity(files.len()),
        };
        for (path, contents) in files {
            let hash = format!("{name}/{version}/{path}");
            inner.blobs.insert(hash.clone(), contents.as_bytes().to_vec());
            manifest.files.push(ManifestFile {
                path: path.to_string(),
                hash,
            });
        }
        inner.bundles.insert(name.to_string(), manifest);
    }

    /// Makes the next `resolve(name)` call fail with `message`.
    pub fn fail_next(&self, name: &str, message: &str) {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .failures
            .entry(name.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Options of every `resolve(name)` call so far.
    pub fn resolve_calls(&self, name: &str) -> Vec<ResolveOptions> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .resolves
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl NameResolver for MemoryResolver {
    async fn resolve(&self, name: &str, opts: ResolveOptions) -> Result<Manifest, FetchError> {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.resolves.entry(name.to_string()).or_default().push(opts);

        if let Some(queue) = inner.failures.get_mut(name) {
            if !queue.is_empty() {
                let error = queue.remove(0);
                return Err(FetchError::Resolve {
                    name: name.to_string(),
                    error,
                });
            }
        }
        inner
            .bundles
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::Resolve {
                name: name.to_string(),
                error: "name not published".to_string(),
            })
    }

    async fn download(&self, file: &ManifestFile) -> Result<Vec<u8>, FetchError> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner
            .blobs
            .get(&file.hash)
            .cloned()
            .ok_or_else(|| FetchError::Download {
                path: file.path.clone(),
                error: format!("no content for {}", file.hash),
            })
    }
}
