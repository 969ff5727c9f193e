//! Subnet source bundles: resolution, installation and retries.
//!
//! - [`NameResolver`] the external naming/download collaborator
//!   ([`MemoryResolver`] serves in-process bundles)
//! - [`SourceSync`] installs the latest version of one subnet
//! - [`RetryingFetcher`] retry policy and refresh passes over the catalog

mod fetcher;
mod resolver;
mod sync;

pub use fetcher::{RefreshScope, RetryingFetcher};
pub use resolver::{Manifest, ManifestFile, MemoryResolver, NameResolver, ResolveOptions};
pub use sync::SourceSync;
