//! Registry client trait - abstraction over the remote package index
//!
//! The resolver only talks to this trait, so the HTTP client can be
//! replaced by a test double or another index implementation.

use async_trait::async_trait;

use super::types::{FeedEntry, PackageReleases, ReleaseFile, SearchResult, SearchSpec};
use crate::error::Result;
use crate::metadata::Metadata;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Canonical name and versions, `None` if the registry has no such package
    async fn package_releases(&self, name: &str) -> Result<Option<PackageReleases>>;

    /// Metadata of one release, `None` if that version does not exist
    async fn release_data(&self, name: &str, version: &str) -> Result<Option<Metadata>>;

    /// Files uploaded for a release (empty when there are none)
    async fn release_urls(&self, name: &str, version: &str) -> Result<Vec<ReleaseFile>>;

    /// Names of every package on the registry
    async fn list_packages(&self) -> Result<Vec<String>>;

    /// Server-side search
    async fn search(&self, spec: &SearchSpec) -> Result<Vec<SearchResult>>;

    /// Recent-updates feed, newest first
    async fn recent_updates(&self) -> Result<Vec<FeedEntry>>;

    /// Client identifier for logging
    fn name(&self) -> &'static str;
}
