//! # SourceSync: keeps one subnet's bundle installed at its latest version.
//!
//! ## Layout
//! ```text
//! <sources_dir>/
//!   spark/
//!     .v42.partial/     (download in progress)
//!     v41/              (previous version, still the cwd of a live process)
//!     v42/main.js       (current version)
//! ```
//!
//! ## Rules
//! - A bundle is downloaded into a staging directory and renamed into place;
//!   the in-memory version is updated only after the rename succeeded.
//! - Refreshes of the same subnet are serialized by a per-subnet lock;
//!   different subnets refresh concurrently.
//! - Re-resolving an unchanged version is a no-op (`Ok(false)`).

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::FetchError;
use crate::source::resolver::{Manifest, NameResolver, ResolveOptions};
use crate::subnets::SubnetDescriptor;

type Slot = Arc<AsyncMutex<Option<String>>>;

/// Downloads and installs subnet source bundles.
pub struct SourceSync {
    resolver: Arc<dyn NameResolver>,
    sources_dir: PathBuf,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SourceSync {
    /// Creates a sync rooted at `sources_dir`.
    pub fn new(resolver: Arc<dyn NameResolver>, sources_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            sources_dir: sources_dir.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, subnet: &str) -> Slot {
        self.slots
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(subnet.to_string())
            .or_default()
            .clone()
    }

    /// Resolves the subnet's published name and installs a new version if
    /// there is one. Returns whether an update occurred.
    pub async fn refresh(
        &self,
        subnet: &SubnetDescriptor,
        opts: ResolveOptions,
    ) -> Result<bool, FetchError> {
        let slot = self.slot(&subnet.name);
        let mut current = slot.lock().await;

        let manifest = self.resolver.resolve(&subnet.naming_key, opts).await?;
        if current.as_deref() == Some(manifest.version.as_str()) {
            tracing::debug!(subnet = %subnet.name, version = %manifest.version, "source up to date");
            return Ok(false);
        }

        self.install(&subnet.name, &manifest).await?;
        tracing::info!(
            subnet = %subnet.name,
            previous = current.as_deref().unwrap_or("none"),
            version = %manifest.version,
            "installed subnet source"
        );
        *current = Some(manifest.version);
        Ok(true)
    }

    async fn install(&self, subnet: &str, manifest: &Manifest) -> Result<(), FetchError> {
        let version = single_component(&manifest.version)?;
        let subnet_dir = self.sources_dir.join(subnet);
        let staging = subnet_dir.join(format!(".{version}.partial"));
        let target = subnet_dir.join(version);

        remove_dir_if_exists(&staging).await?;
        fs::create_dir_all(&staging).await?;

        for file in &manifest.files {
            let rel = bundle_path(&file.path)?;
            let bytes = self.resolver.download(file).await?;
            let dest = staging.join(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&dest, bytes).await?;
        }

        remove_dir_if_exists(&target).await?;
        fs::rename(&staging, &target).await?;
        Ok(())
    }

    /// Currently installed version of `subnet`.
    pub async fn version(&self, subnet: &str) -> Option<String> {
        self.slot(subnet).lock().await.clone()
    }

    /// Working directory of the installed version of `subnet`.
    pub async fn installed_dir(&self, subnet: &str) -> Option<PathBuf> {
        self.version(subnet)
            .await
            .map(|v| self.sources_dir.join(subnet).join(v))
    }

    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }
}

async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Validates a manifest path: relative, no `..`, no root or prefix.
fn bundle_path(raw: &str) -> Result<PathBuf, FetchError> {
    let path = Path::new(raw);
    let valid = !raw.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(path.to_path_buf())
    } else {
        Err(FetchError::InvalidPath {
            path: raw.to_string(),
        })
    }
}

fn single_component(raw: &str) -> Result<&str, FetchError> {
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !raw.starts_with('.') => Ok(raw),
        _ => Err(FetchError::InvalidPath {
            path: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::resolver::ManifestFile;
    use crate::source::MemoryResolver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn spark() -> SubnetDescriptor {
        SubnetDescriptor::new("spark", "k51-spark")
    }

    #[tokio::test]
    async fn installs_then_skips_unchanged_version() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Arc::new(MemoryResolver::new());
        resolver.publish("k51-spark", "v1", &[("main.js", "one"), ("lib/a.js", "a")]);
        let sync = SourceSync::new(resolver.clone(), dir.path());

        assert!(sync.refresh(&spark(), ResolveOptions::default()).await.unwrap());
        let installed = sync.installed_dir("spark").await.unwrap();
        assert_eq!(installed, dir.path().join("spark").join("v1"));
        assert_eq!(std::fs::read_to_string(installed.join("main.js")).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(installed.join("lib/a.js")).unwrap(), "a");

        assert!(!sync.refresh(&spark(), ResolveOptions::default()).await.unwrap());
        assert_eq!(sync.version("spark").await.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn new_version_is_installed_beside_the_old_one() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Arc::new(MemoryResolver::new());
        let sync = SourceSync::new(resolver.clone(), dir.path());

        resolver.publish("k51-spark", "v1", &[("main.js", "one")]);
        sync.refresh(&spark(), ResolveOptions::default()).await.unwrap();
        resolver.publish("k51-spark", "v2", &[("main.js", "two")]);
        assert!(sync.refresh(&spark(), ResolveOptions::default()).await.unwrap());

        assert!(dir.path().join("spark/v1/main.js").exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("spark/v2/main.js")).unwrap(), "two");
        assert!(!dir.path().join("spark/.v2.partial").exists());
    }

    #[tokio::test]
    async fn failed_download_keeps_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Arc::new(MemoryResolver::new());
        let sync = SourceSync::new(resolver.clone(), dir.path());

        resolver.publish("k51-spark", "v1", &[("main.js", "one")]);
        sync.refresh(&spark(), ResolveOptions::default()).await.unwrap();
        resolver.publish("k51-spark", "v2", &[("../escape.js", "x")]);

        let err = sync
            .refresh(&spark(), ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidPath { .. }));
        assert_eq!(sync.version("spark").await.as_deref(), Some("v1"));
    }

    /// Resolver that holds each `resolve` open for a while and records how
    /// many were in flight at once.
    struct SlowResolver {
        inner: MemoryResolver,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl NameResolver for SlowResolver {
        async fn resolve(&self, name: &str, opts: ResolveOptions) -> Result<Manifest, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.resolve(name, opts).await
        }

        async fn download(&self, file: &ManifestFile) -> Result<Vec<u8>, FetchError> {
            self.inner.download(file).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_refreshes_of_one_subnet_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Arc::new(SlowResolver {
            inner: MemoryResolver::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        resolver.inner.publish("k51-spark", "v1", &[("main.js", "one")]);
        let sync = SourceSync::new(resolver.clone(), dir.path());

        let subnet = spark();
        let (a, b) = tokio::join!(
            sync.refresh(&subnet, ResolveOptions::default()),
            sync.refresh(&subnet, ResolveOptions::default()),
        );
        let changed = [a.unwrap(), b.unwrap()];

        assert_eq!(resolver.peak.load(Ordering::SeqCst), 1);
        assert_eq!(changed.iter().filter(|c| **c).count(), 1);
        assert_eq!(resolver.inner.resolve_calls("k51-spark").len(), 2);
    }

    #[test]
    fn path_validation() {
        assert!(bundle_path("main.js").is_ok());
        assert!(bundle_path("lib/x.js").is_ok());
        assert!(bundle_path("").is_err());
        assert!(bundle_path("/etc/passwd").is_err());
        assert!(bundle_path("a/../../b").is_err());

        assert!(single_component("v1").is_ok());
        assert!(single_component("a/b").is_err());
        assert!(single_component("..").is_err());
        assert!(single_component(".hidden").is_err());
    }
}
