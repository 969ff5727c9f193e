//! Runtime executable collaborator.
//!
//! Downloading and unpacking the workload runtime happens outside this crate;
//! the agent only asks for the path of an installed executable.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::RuntimeError;

/// Installs (or locates) the workload runtime.
#[async_trait]
pub trait RuntimeInstaller: Send + Sync + 'static {
    /// Returns the path of the runtime executable, installing it first if needed.
    async fn ensure_installed(&self, runtime: &str, version: &str) -> Result<PathBuf, RuntimeError>;
}

/// A runtime that is already present on disk.
#[derive(Clone, Debug)]
pub struct PreinstalledRuntime {
    path: PathBuf,
}

impl PreinstalledRuntime {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RuntimeInstaller for PreinstalledRuntime {
    async fn ensure_installed(&self, runtime: &str, version: &str) -> Result<PathBuf, RuntimeError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(self.path.clone()),
            Ok(_) => Err(RuntimeError::Install {
                runtime: format!("{runtime}@{version}"),
                error: format!("{} is not a file", self.path.display()),
            }),
            Err(e) => Err(RuntimeError::Install {
                runtime: format!("{runtime}@{version}"),
                error: format!("{}: {e}", self.path.display()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preinstalled_runtime_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("zinniad");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();

        let found = PreinstalledRuntime::new(&exe)
            .ensure_installed("zinnia", "v0.22.2")
            .await
            .unwrap();
        assert_eq!(found, exe);

        let missing = PreinstalledRuntime::new(dir.path().join("nope"))
            .ensure_installed("zinnia", "v0.22.2")
            .await;
        assert!(matches!(missing, Err(RuntimeError::Install { .. })));

        let not_a_file = PreinstalledRuntime::new(dir.path())
            .ensure_installed("zinnia", "v0.22.2")
            .await;
        assert!(matches!(not_a_file, Err(RuntimeError::Install { .. })));
    }
}
